//! Persisted record of what has already been archived, per creator.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{AppError, Result};
use super::post::PostRecord;

/// Identifies a creator: a (service, creator id) pair.
///
/// Serialized as `service:creator_id` so it can key JSON objects. `%` and
/// `:` in the service are percent-escaped so the form parses back exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CreatorKey {
    service: String,
    creator_id: String,
}

impl CreatorKey {
    pub fn new(service: impl Into<String>, creator_id: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            creator_id: creator_id.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn creator_id(&self) -> &str {
        &self.creator_id
    }
}

impl fmt::Display for CreatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let service = self.service.replace('%', "%25").replace(':', "%3A");
        write!(f, "{}:{}", service, self.creator_id)
    }
}

impl std::str::FromStr for CreatorKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((service, creator_id)) if !service.is_empty() && !creator_id.is_empty() => {
                let service = service.replace("%3A", ":").replace("%25", "%");
                Ok(Self::new(service, creator_id))
            }
            _ => Err(format!(
                "Invalid creator key '{}': expected 'service:creator_id'",
                s
            )),
        }
    }
}

impl From<CreatorKey> for String {
    fn from(key: CreatorKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for CreatorKey {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Last-synced state of one creator's posts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatorIndex {
    pub service: String,
    pub creator_id: String,

    /// post id -> record as of the last successful archive
    #[serde(default)]
    pub posts: BTreeMap<String, PostRecord>,

    /// post id -> directory name the post was archived under
    #[serde(default)]
    pub posts_path: BTreeMap<String, String>,
}

impl CreatorIndex {
    pub fn new(key: &CreatorKey) -> Self {
        Self {
            service: key.service().to_string(),
            creator_id: key.creator_id().to_string(),
            posts: BTreeMap::new(),
            posts_path: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> CreatorKey {
        CreatorKey::new(self.service.clone(), self.creator_id.clone())
    }

    pub fn get(&self, post_id: &str) -> Option<&PostRecord> {
        self.posts.get(post_id)
    }

    /// Stores `post` under its own id, replacing any previous record.
    pub fn record(&mut self, post: PostRecord) {
        self.posts.insert(post.id.clone(), post);
    }

    pub fn record_path(&mut self, post_id: &str, dirname: impl Into<String>) {
        self.posts_path.insert(post_id.to_string(), dirname.into());
    }

    /// Checks that every entry is keyed by its own id.
    pub fn validate(&self) -> Result<()> {
        for (id, post) in &self.posts {
            if *id != post.id {
                return Err(AppError::CorruptIndex(format!(
                    "{}: entry '{}' holds post '{}'",
                    self.key(),
                    id,
                    post.id
                )));
            }
        }
        Ok(())
    }
}

/// Indices of every creator touched by a sync run.
///
/// Never mutated in place by the sync core: updates return a new value so
/// the caller decides when (and whether) to persist it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CreatorIndices(BTreeMap<CreatorKey, CreatorIndex>);

impl CreatorIndices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CreatorKey) -> Option<&CreatorIndex> {
        self.0.get(key)
    }

    /// Looks up the stored record for a post under its own creator.
    pub fn stored(&self, post: &PostRecord) -> Option<&PostRecord> {
        self.0
            .get(&post.creator_key())
            .and_then(|index| index.get(&post.id))
    }

    pub fn insert(&mut self, index: CreatorIndex) -> Option<CreatorIndex> {
        self.0.insert(index.key(), index)
    }

    pub fn entry(&mut self, key: &CreatorKey) -> &mut CreatorIndex {
        self.0
            .entry(key.clone())
            .or_insert_with(|| CreatorIndex::new(key))
    }

    /// Returns a copy with `posts` written into their creators' indices.
    pub fn with_posts<'a>(&self, posts: impl IntoIterator<Item = &'a PostRecord>) -> Self {
        let mut updated = self.clone();
        for post in posts {
            updated.entry(&post.creator_key()).record(post.clone());
        }
        updated
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CreatorKey, &CreatorIndex)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks per-creator invariants and that each index is filed under its own key.
    pub fn validate(&self) -> Result<()> {
        for (key, index) in &self.0 {
            if *key != index.key() {
                return Err(AppError::CorruptIndex(format!(
                    "index for {} filed under {}",
                    index.key(),
                    key
                )));
            }
            index.validate()?;
        }
        Ok(())
    }
}
