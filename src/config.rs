use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::sync::differ::ChangeRule;
use crate::sync::naming::NamingPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root under which per-creator indices are stored.
    pub data_dir: PathBuf,
    pub log_level: String,
    pub job: JobConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: "info".to_string(),
            job: JobConfig::default(),
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("post-sync")
}

/// Options of a sync job that the core consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Use the post id as directory name.
    pub post_id_as_path: bool,
    /// Directory name template, see [`crate::sync::naming::Placeholder`].
    pub post_dirname_format: String,
    /// Put every post's files directly in the creator directory.
    pub mix_posts: bool,
    /// Reject posts without an `edited` timestamp before diffing.
    pub require_edited: bool,
    pub change_rule: ChangeRule,
}

impl Default for JobConfig {
    fn default() -> Self {
        let naming = NamingPolicy::default();
        Self {
            post_id_as_path: naming.post_id_as_path,
            post_dirname_format: naming.post_dirname_format,
            mix_posts: false,
            require_edited: true,
            change_rule: ChangeRule::default(),
        }
    }
}

impl JobConfig {
    pub fn naming_policy(&self) -> NamingPolicy {
        NamingPolicy::new(self.post_id_as_path, self.post_dirname_format.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_job() {
        let job = JobConfig::default();
        assert!(!job.post_id_as_path);
        assert_eq!(job.post_dirname_format, "{title}");
        assert!(job.require_edited);
        assert_eq!(job.change_rule, ChangeRule::Edited);
    }

    #[test]
    fn test_job_partial_json() {
        let job: JobConfig =
            serde_json::from_str(r#"{"post_id_as_path": true, "change_rule": "content"}"#).unwrap();
        assert!(job.post_id_as_path);
        assert_eq!(job.post_dirname_format, "{title}");
        assert_eq!(job.change_rule, ChangeRule::Content);
        assert_eq!(job.naming_policy(), NamingPolicy::new(true, "{title}"));
    }

    #[test]
    fn test_default_data_dir() {
        assert!(AppConfig::default().data_dir.ends_with("post-sync"));
    }
}
