use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::PostRecord;

/// Inclusive publish-time bounds; an absent bound is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// A missing `published` fails every active bound.
    pub fn contains(&self, published: Option<DateTime<Utc>>) -> bool {
        let start_ok = match (self.start, published) {
            (None, _) => true,
            (Some(start), Some(p)) => p >= start,
            (Some(_), None) => false,
        };
        let end_ok = match (self.end, published) {
            (None, _) => true,
            (Some(end), Some(p)) => p <= end,
            (Some(_), None) => false,
        };
        start_ok && end_ok
    }
}

/// Lazily yields the posts published inside `window`, in input order.
pub fn filter_by_time<'a, I>(
    posts: I,
    window: TimeWindow,
) -> impl Iterator<Item = &'a PostRecord> + 'a
where
    I: IntoIterator<Item = &'a PostRecord>,
    I::IntoIter: 'a,
{
    posts
        .into_iter()
        .filter(move |post| window.contains(post.published))
}
