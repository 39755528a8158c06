//! Computes which fetched posts are new or changed since the last sync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{CreatorIndices, PostRecord};
use crate::Result;

use super::hasher::ContentHasher;

/// How a post already present in the index is judged changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeRule {
    /// Only a strictly newer `edited` timestamp counts.
    #[default]
    Edited,
    /// A newer `edited`, or an unchanged `edited` with different content.
    Content,
}

impl std::str::FromStr for ChangeRule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "edited" => Ok(Self::Edited),
            "content" => Ok(Self::Content),
            _ => Err(format!("Unknown change rule: {}", s)),
        }
    }
}

impl std::fmt::Display for ChangeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Edited => write!(f, "edited"),
            Self::Content => write!(f, "content"),
        }
    }
}

/// `fetched > stored` under the order where an absent timestamp sorts
/// before every present one.
pub fn is_newer(fetched: Option<DateTime<Utc>>, stored: Option<DateTime<Utc>>) -> bool {
    fetched > stored
}

/// Rejects posts lacking the `edited` timestamp diffing relies on.
pub fn require_edited(posts: &[PostRecord]) -> Result<()> {
    posts.iter().try_for_each(|post| post.require_edited().map(|_| ()))
}

fn content_digest(post: &PostRecord) -> Result<String> {
    ContentHasher::hash_serialize(post, true)
}

pub fn is_changed(post: &PostRecord, stored: Option<&PostRecord>, rule: ChangeRule) -> Result<bool> {
    let Some(stored) = stored else {
        return Ok(true);
    };

    if is_newer(post.edited, stored.edited) {
        return Ok(true);
    }

    match rule {
        ChangeRule::Edited => Ok(false),
        ChangeRule::Content if post.edited == stored.edited => {
            Ok(content_digest(post)? != content_digest(stored)?)
        }
        ChangeRule::Content => Ok(false),
    }
}

/// Splits `posts` against `indices` by `edited` timestamp.
///
/// Returns the new-or-changed posts in input order, and a copy of
/// `indices` with exactly those posts recorded. Entries are never removed.
pub fn diff_indices(
    posts: &[PostRecord],
    indices: &CreatorIndices,
) -> (Vec<PostRecord>, CreatorIndices) {
    let changed: Vec<PostRecord> = posts
        .iter()
        .filter(|post| is_newer_than_stored(post, indices))
        .cloned()
        .collect();
    let updated = indices.with_posts(&changed);
    (changed, updated)
}

fn is_newer_than_stored(post: &PostRecord, indices: &CreatorIndices) -> bool {
    match indices.stored(post) {
        None => true,
        Some(stored) => is_newer(post.edited, stored.edited),
    }
}

/// Like [`diff_indices`] with an explicit change rule.
pub fn diff_indices_with(
    posts: &[PostRecord],
    indices: &CreatorIndices,
    rule: ChangeRule,
) -> Result<(Vec<PostRecord>, CreatorIndices)> {
    if rule == ChangeRule::Edited {
        return Ok(diff_indices(posts, indices));
    }

    let mut changed = Vec::new();
    for post in posts {
        if is_changed(post, indices.stored(post), rule)? {
            changed.push(post.clone());
        } else {
            debug!(post_id = %post.id, "Post unchanged since last sync");
        }
    }
    let updated = indices.with_posts(&changed);
    Ok((changed, updated))
}
