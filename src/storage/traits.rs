//! Persistence seam for creator indices.
//!
//! The sync core never decides when to persist; callers save the indices
//! returned by a plan only after its downloads have succeeded.

use async_trait::async_trait;

use crate::types::{CreatorIndex, CreatorIndices, CreatorKey};
use crate::Result;

#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Load one creator's index, `None` if it was never saved
    async fn load_index(&self, key: &CreatorKey) -> Result<Option<CreatorIndex>>;

    /// Replace one creator's index
    async fn save_index(&self, index: &CreatorIndex) -> Result<()>;

    /// Load the indices of several creators; unknown creators are skipped
    async fn load_indices(&self, keys: &[CreatorKey]) -> Result<CreatorIndices> {
        let mut indices = CreatorIndices::new();
        for key in keys {
            if let Some(index) = self.load_index(key).await? {
                indices.insert(index);
            }
        }
        Ok(indices)
    }

    /// Save every index in `indices`
    async fn save_indices(&self, indices: &CreatorIndices) -> Result<()> {
        for (_, index) in indices.iter() {
            self.save_index(index).await?;
        }
        Ok(())
    }
}
