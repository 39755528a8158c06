use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("`post_dirname_format` contains invalid key `{key}` (template: {template:?})")]
    InvalidPlaceholder { key: String, template: String },

    #[error("`post_dirname_format` is malformed: {reason} (template: {template:?})")]
    MalformedTemplate { template: String, reason: String },

    #[error("Post {post_id} is missing required timestamp `{field}`")]
    MissingTimestamp { post_id: String, field: &'static str },

    #[error("Corrupt creator index: {0}")]
    CorruptIndex(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Configuration errors make the whole run meaningless and are never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Configuration(_)
                | AppError::InvalidPlaceholder { .. }
                | AppError::MalformedTemplate { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_fatal() {
        let err = AppError::InvalidPlaceholder {
            key: "name".to_string(),
            template: "{name}".to_string(),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("`name`"));
    }

    #[test]
    fn test_data_errors_are_not_fatal() {
        let err = AppError::MissingTimestamp {
            post_id: "7".to_string(),
            field: "edited",
        };
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Post 7 is missing required timestamp `edited`");
    }
}
