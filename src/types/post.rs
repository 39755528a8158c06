use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::{AppError, Result};
use super::indices::CreatorKey;
use super::timestamp;

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A post as listed by the remote source.
///
/// Fields the sync core does not interpret (`content`, `file`,
/// `attachments`, ...) are kept in `extra` so that persisted indices hold
/// the complete record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostRecord {
    pub id: String,
    pub user: String,
    pub service: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,

    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub added: Option<DateTime<Utc>>,

    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub published: Option<DateTime<Utc>>,

    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub edited: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PostRecord {
    pub fn new(
        id: impl Into<String>,
        user: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user: user.into(),
            service: service.into(),
            title: String::new(),
            added: None,
            published: None,
            edited: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn creator_key(&self) -> CreatorKey {
        CreatorKey::new(self.service.clone(), self.user.clone())
    }

    /// Returns `edited`, or a data contract violation when it is absent.
    pub fn require_edited(&self) -> Result<DateTime<Utc>> {
        self.edited.ok_or_else(|| AppError::MissingTimestamp {
            post_id: self.id.clone(),
            field: "edited",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_remote_shape() {
        let raw = r#"{
            "id": "42",
            "user": "alice",
            "service": "fanbox",
            "title": null,
            "added": "2024-01-01T10:00:00.123456",
            "published": "2024-01-01T09:00:00",
            "edited": null,
            "content": "<p>hi</p>",
            "attachments": [{"name": "1.png", "path": "/a/b.png"}]
        }"#;
        let post: PostRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(post.id, "42");
        assert_eq!(post.title, "");
        assert!(post.added.is_some());
        assert!(post.published.is_some());
        assert!(post.edited.is_none());
        assert_eq!(post.extra["content"], "<p>hi</p>");
        assert!(post.extra["attachments"].is_array());
    }

    #[test]
    fn test_extra_fields_survive_roundtrip() {
        let raw = r#"{"id":"1","user":"u","service":"s","file":{"name":"a.zip"}}"#;
        let post: PostRecord = serde_json::from_str(raw).unwrap();
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["file"]["name"], "a.zip");
        assert!(json.get("edited").is_none());
    }

    #[test]
    fn test_require_edited() {
        let post = PostRecord::new("9", "u", "s");
        match post.require_edited() {
            Err(AppError::MissingTimestamp { post_id, field }) => {
                assert_eq!(post_id, "9");
                assert_eq!(field, "edited");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
