//! Directory names for archived posts.
//!
//! A naming template such as `{published} {title}` is parsed against a
//! fixed allow-list of placeholders, rendered per post, and sanitized into
//! a single legal path segment.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::types::{AppError, PostRecord};
use crate::Result;

/// Rendering of the `added`, `published` and `edited` placeholders.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Longest path segment, in bytes, accepted by common filesystems.
pub const MAX_SEGMENT_BYTES: usize = 255;
const ILLEGAL_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Id,
    User,
    Service,
    Title,
    Added,
    Published,
    Edited,
}

impl Placeholder {
    pub const ALL: [Placeholder; 7] = [
        Self::Id,
        Self::User,
        Self::Service,
        Self::Title,
        Self::Added,
        Self::Published,
        Self::Edited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::User => "user",
            Self::Service => "service",
            Self::Title => "title",
            Self::Added => "added",
            Self::Published => "published",
            Self::Edited => "edited",
        }
    }

    pub fn render(&self, post: &PostRecord) -> String {
        let date = |ts: Option<chrono::DateTime<chrono::Utc>>| {
            ts.map(|t| t.format(DATE_FORMAT).to_string())
                .unwrap_or_default()
        };
        match self {
            Self::Id => post.id.clone(),
            Self::User => post.user.clone(),
            Self::Service => post.service.clone(),
            Self::Title => post.title.clone(),
            Self::Added => date(post.added),
            Self::Published => date(post.published),
            Self::Edited => date(post.edited),
        }
    }
}

impl FromStr for Placeholder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// A parsed `post_dirname_format`. `{{` and `}}` escape literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirnameTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl DirnameTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let malformed = |reason: &str| AppError::MalformedTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut key = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => return Err(malformed("nested '{' in placeholder")),
                            Some(ch) => key.push(ch),
                            None => return Err(malformed("unclosed '{'")),
                        }
                    }
                    let field = key.parse::<Placeholder>().map_err(|key| {
                        AppError::InvalidPlaceholder {
                            key,
                            template: template.to_string(),
                        }
                    })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => return Err(malformed("single '}' outside a placeholder")),
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(p) => Some(*p),
            Segment::Literal(_) => None,
        })
    }

    /// Substitutes every placeholder; the result is not yet sanitized.
    pub fn render(&self, post: &PostRecord) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Field(p) => p.render(post),
            })
            .collect()
    }
}

impl FromStr for DirnameTemplate {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// How post directories are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPolicy {
    pub post_id_as_path: bool,
    pub post_dirname_format: String,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self {
            post_id_as_path: false,
            post_dirname_format: "{title}".to_string(),
        }
    }
}

impl NamingPolicy {
    pub fn new(post_id_as_path: bool, post_dirname_format: impl Into<String>) -> Self {
        Self {
            post_id_as_path,
            post_dirname_format: post_dirname_format.into(),
        }
    }

    /// Parses the template up front so a bad one is reported once, before
    /// any post is named. A template that can never be used is not checked.
    pub fn validate(&self) -> Result<Option<DirnameTemplate>> {
        if self.post_id_as_path {
            return Ok(None);
        }
        DirnameTemplate::parse(&self.post_dirname_format).map(Some)
    }

    pub fn name_for(&self, post: &PostRecord) -> Result<String> {
        if self.post_id_as_path || post.title.is_empty() {
            return Ok(post.id.clone());
        }
        let template = DirnameTemplate::parse(&self.post_dirname_format)?;
        Ok(name_with_template(post, &template))
    }
}

/// Names `post` with an already validated template.
pub fn name_with_template(post: &PostRecord, template: &DirnameTemplate) -> String {
    if post.title.is_empty() {
        return post.id.clone();
    }
    let name = sanitize_dirname(&template.render(post));
    if name.is_empty() {
        warn!(
            post_id = %post.id,
            template = template.as_str(),
            "Directory name is empty after sanitizing, using post id"
        );
        return post.id.clone();
    }
    name
}

/// Generates the directory name for `post` under `policy`.
pub fn name_for(post: &PostRecord, policy: &NamingPolicy) -> Result<String> {
    policy.name_for(post)
}

/// Turns arbitrary text into a single path segment legal on common
/// filesystems. May return an empty string.
pub fn sanitize_dirname(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() && !ILLEGAL_CHARS.contains(c))
        .collect();

    let mut name = trim_segment(&cleaned).to_string();

    if name.len() > MAX_SEGMENT_BYTES {
        name = trim_segment(truncate_on_boundary(&name, MAX_SEGMENT_BYTES)).to_string();
    }

    if is_reserved_name(&name) {
        name.push('_');
    }
    name
}

/// Appends `suffix` to `base`, shortening `base` so the result still fits
/// in one path segment.
pub fn fit_segment(base: &str, suffix: &str) -> String {
    let budget = MAX_SEGMENT_BYTES.saturating_sub(suffix.len());
    format!("{}{}", truncate_on_boundary(base, budget), suffix)
}

fn truncate_on_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut cut = max_bytes;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    &s[..cut]
}

fn trim_segment(s: &str) -> &str {
    s.trim().trim_end_matches(['.', ' '])
}

fn is_reserved_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).trim_end();
    RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}
