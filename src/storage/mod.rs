pub mod json;
pub mod traits;

pub use json::JsonIndexStore;
pub use traits::IndexStore;
