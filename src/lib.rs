pub mod config;
pub mod storage;
pub mod sync;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use config::{AppConfig, JobConfig};
pub use types::error::{AppError, Result};
