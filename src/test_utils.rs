use chrono::{DateTime, Utc};

use crate::types::timestamp::parse_timestamp;
use crate::types::PostRecord;

/// `YYYY-MM-DD` at midnight UTC.
pub fn date(day: &str) -> DateTime<Utc> {
    parse_timestamp(day).expect("Invalid test date")
}

/// A post by `alice` on `patreon`, added, published and edited on `day`.
pub fn post(id: &str, day: &str) -> PostRecord {
    post_by("alice", id, day)
}

pub fn post_by(user: &str, id: &str, day: &str) -> PostRecord {
    let at = date(day);
    let mut post = PostRecord::new(id, user, "patreon");
    post.title = format!("Post {}", id);
    post.added = Some(at);
    post.published = Some(at);
    post.edited = Some(at);
    post
}
