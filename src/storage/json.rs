use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::IndexStore;
use crate::sync::naming::sanitize_dirname;
use crate::types::{AppError, CreatorIndex, CreatorKey};
use crate::Result;

pub const INDEX_FILE_NAME: &str = "creator-indices.json";

/// Stores each creator's index as pretty JSON at
/// `<root>/<service>/<creator_id>/creator-indices.json`.
#[derive(Debug, Clone)]
pub struct JsonIndexStore {
    root: PathBuf,
}

impl JsonIndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self, key: &CreatorKey) -> Result<PathBuf> {
        let service = sanitize_dirname(key.service());
        let creator = sanitize_dirname(key.creator_id());
        if service.is_empty() || creator.is_empty() {
            return Err(AppError::Configuration(format!(
                "creator key {} cannot be mapped to a directory",
                key
            )));
        }
        Ok(self.root.join(service).join(creator).join(INDEX_FILE_NAME))
    }
}

#[async_trait]
impl IndexStore for JsonIndexStore {
    async fn load_index(&self, key: &CreatorKey) -> Result<Option<CreatorIndex>> {
        let path = self.index_path(key)?;

        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(creator = %key, "No saved index");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let index: CreatorIndex = serde_json::from_str(&raw)?;
        if index.key() != *key {
            return Err(AppError::CorruptIndex(format!(
                "{} holds the index of {}",
                path.display(),
                index.key()
            )));
        }
        index.validate()?;

        debug!(creator = %key, posts = index.posts.len(), "Loaded index");
        Ok(Some(index))
    }

    async fn save_index(&self, index: &CreatorIndex) -> Result<()> {
        index.validate()?;
        let path = self.index_path(&index.key())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(index)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;

        info!(creator = %index.key(), posts = index.posts.len(), "Saved index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{post, post_by};
    use crate::types::CreatorIndices;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_index_is_none() {
        let dir = tempdir().unwrap();
        let store = JsonIndexStore::new(dir.path());
        let key = CreatorKey::new("patreon", "alice");
        assert!(store.load_index(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_index_persistence() {
        let dir = tempdir().unwrap();
        let store = JsonIndexStore::new(dir.path());

        let indices = CreatorIndices::new().with_posts(&[
            post("1", "2024-01-01"),
            post_by("bob", "9", "2024-02-01"),
        ]);
        store.save_indices(&indices).await.unwrap();

        assert!(dir
            .path()
            .join("patreon")
            .join("alice")
            .join(INDEX_FILE_NAME)
            .exists());

        drop(store);
        let store2 = JsonIndexStore::new(dir.path());
        let keys = [
            CreatorKey::new("patreon", "alice"),
            CreatorKey::new("patreon", "bob"),
            CreatorKey::new("patreon", "nobody"),
        ];
        let loaded = store2.load_indices(&keys).await.unwrap();
        assert_eq!(loaded, indices);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let store = JsonIndexStore::new(dir.path());
        let key = CreatorKey::new("patreon", "alice");

        let first = CreatorIndices::new().with_posts(&[post("1", "2024-01-01")]);
        store.save_indices(&first).await.unwrap();
        let second = first.with_posts(&[post("2", "2024-01-02")]);
        store.save_indices(&second).await.unwrap();

        let loaded = store.load_index(&key).await.unwrap().unwrap();
        assert_eq!(loaded.posts.len(), 2);
        assert!(!dir
            .path()
            .join("patreon/alice/creator-indices.json.tmp")
            .exists());
    }

    #[tokio::test]
    async fn test_misfiled_index_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = JsonIndexStore::new(dir.path());

        let bob = CreatorIndex::new(&CreatorKey::new("patreon", "bob"));
        let alice_key = CreatorKey::new("patreon", "alice");
        let path = store.index_path(&alice_key).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_string(&bob).unwrap()).unwrap();

        let err = store.load_index(&alice_key).await.unwrap_err();
        assert!(matches!(err, AppError::CorruptIndex(_)));
    }

    #[tokio::test]
    async fn test_invalid_json_is_serialization_error() {
        let dir = tempdir().unwrap();
        let store = JsonIndexStore::new(dir.path());
        let key = CreatorKey::new("patreon", "alice");
        let path = store.index_path(&key).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let err = store.load_index(&key).await.unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
    }

    #[test]
    fn test_index_path_is_sanitized() {
        let store = JsonIndexStore::new("/data");
        let path = store
            .index_path(&CreatorKey::new("fanbox", "a/b"))
            .unwrap();
        assert_eq!(path, PathBuf::from("/data/fanbox/ab/creator-indices.json"));
        assert_eq!(store.root(), Path::new("/data"));
        assert!(path.starts_with(store.root()));
        assert!(store.index_path(&CreatorKey::new("fanbox", "..")).is_err());
    }
}
