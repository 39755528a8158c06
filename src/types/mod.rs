pub mod content;
pub mod error;
pub mod indices;
pub mod post;
pub mod timestamp;

pub use content::{ContentValue, Scalar};
pub use error::{AppError, Result};
pub use indices::{CreatorIndex, CreatorIndices, CreatorKey};
pub use post::PostRecord;
