use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::JobConfig;
use crate::types::{CreatorIndices, CreatorKey, PostRecord};
use crate::Result;

use super::differ::{diff_indices_with, require_edited};
use super::naming::{fit_segment, name_with_template, MAX_SEGMENT_BYTES};
use super::window::{filter_by_time, TimeWindow};

/// A post to download and the directory it goes into.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlannedPost {
    pub post: PostRecord,
    /// `None` when posts are mixed into the creator root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dirname: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SyncPlan {
    pub entries: Vec<PlannedPost>,
    /// Indices to persist once every entry has been downloaded.
    pub indices: CreatorIndices,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Directory names already handed out, per creator.
struct NameRegistry {
    taken: HashMap<CreatorKey, HashMap<String, String>>,
}

impl NameRegistry {
    fn new(indices: &CreatorIndices) -> Self {
        let taken = indices
            .iter()
            .map(|(key, index)| {
                let names = index
                    .posts_path
                    .iter()
                    .map(|(id, name)| (name.clone(), id.clone()))
                    .collect();
                (key.clone(), names)
            })
            .collect();
        Self { taken }
    }

    /// Claims `name` for `post`. When another post of the same creator
    /// already owns it, `_<id>` (then `_<id>_<n>`) is appended until the
    /// name is free.
    fn claim(&mut self, post: &PostRecord, name: String) -> String {
        let names = self.taken.entry(post.creator_key()).or_default();
        let owned_by_other = |candidate: &str| {
            names
                .get(candidate)
                .is_some_and(|owner| *owner != post.id)
        };

        let mut candidate = name.clone();
        let mut attempt = 1;
        while owned_by_other(&candidate) {
            let suffix = if attempt == 1 {
                format!("_{}", post.id)
            } else {
                format!("_{}_{}", post.id, attempt)
            };
            candidate = fit_segment(&name, &suffix);
            attempt += 1;
        }
        if candidate != name {
            debug!(post_id = %post.id, name = %name, chosen = %candidate, "Directory name taken");
        }

        names.insert(candidate.clone(), post.id.clone());
        candidate
    }
}

/// Plans one sync run: diff against `indices`, narrow to `window`, name
/// the surviving posts.
///
/// Posts outside the window are left out of the returned indices so they
/// are picked up again by a later run with a wider window.
pub fn plan_sync(
    posts: &[PostRecord],
    indices: &CreatorIndices,
    window: TimeWindow,
    job: &JobConfig,
) -> Result<SyncPlan> {
    let template = if job.mix_posts {
        None
    } else {
        job.naming_policy().validate()?
    };

    if job.require_edited {
        require_edited(posts)?;
    }

    let (changed, _) = diff_indices_with(posts, indices, job.change_rule)?;
    let selected: Vec<PostRecord> = filter_by_time(&changed, window).cloned().collect();

    info!(
        fetched = posts.len(),
        changed = changed.len(),
        selected = selected.len(),
        "Planned sync"
    );

    if job.mix_posts {
        let entries = selected
            .into_iter()
            .map(|post| PlannedPost {
                post,
                dirname: None,
            })
            .collect();
        return Ok(SyncPlan {
            entries,
            indices: indices.clone(),
        });
    }

    let mut updated = indices.with_posts(&selected);
    let mut registry = NameRegistry::new(indices);
    let mut entries = Vec::with_capacity(selected.len());

    for post in selected {
        let name = match &template {
            Some(template) => name_with_template(&post, template),
            None => post.id.clone(),
        };
        let name = registry.claim(&post, name);
        updated
            .entry(&post.creator_key())
            .record_path(&post.id, name.clone());
        entries.push(PlannedPost {
            post,
            dirname: Some(name),
        });
    }

    Ok(SyncPlan {
        entries,
        indices: updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::differ::ChangeRule;
    use crate::test_utils::{date, post};
    use crate::types::AppError;

    fn titled(id: &str, day: &str, title: &str) -> PostRecord {
        let mut p = post(id, day);
        p.title = title.to_string();
        p
    }

    fn names(plan: &SyncPlan) -> Vec<Option<&str>> {
        plan.entries.iter().map(|e| e.dirname.as_deref()).collect()
    }

    #[test]
    fn test_full_pipeline() {
        let indices = CreatorIndices::new().with_posts(&[post("1", "2024-01-01")]);
        let posts = vec![
            titled("1", "2024-01-01", "Old"),
            titled("2", "2024-02-01", "Feb"),
            titled("3", "2024-03-01", "Mar"),
        ];
        let window = TimeWindow::new(None, Some(date("2024-02-15")));
        let job = JobConfig::default();

        let plan = plan_sync(&posts, &indices, window, &job).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.entries[0].post.id, "2");
        assert_eq!(names(&plan), vec![Some("Feb")]);

        let index = plan.indices.get(&CreatorKey::new("patreon", "alice")).unwrap();
        assert!(index.posts.contains_key("2"));
        assert!(!index.posts.contains_key("3"), "out of window must stay pending");
        assert_eq!(index.posts_path["2"], "Feb");
    }

    #[test]
    fn test_second_run_is_empty() {
        let posts = vec![titled("1", "2024-01-01", "A"), titled("2", "2024-01-02", "B")];
        let job = JobConfig::default();
        let first = plan_sync(&posts, &CreatorIndices::new(), TimeWindow::default(), &job).unwrap();
        assert_eq!(first.len(), 2);

        let second = plan_sync(&posts, &first.indices, TimeWindow::default(), &job).unwrap();
        assert!(second.is_empty());
        assert_eq!(second.indices, first.indices);
    }

    #[test]
    fn test_invalid_template_fails_before_any_work() {
        let job = JobConfig {
            post_dirname_format: "{nickname}".to_string(),
            ..JobConfig::default()
        };
        let err = plan_sync(&[], &CreatorIndices::new(), TimeWindow::default(), &job).unwrap_err();
        assert!(matches!(err, AppError::InvalidPlaceholder { .. }));
    }

    #[test]
    fn test_missing_edited_is_rejected() {
        let mut p = titled("1", "2024-01-01", "A");
        p.edited = None;
        let job = JobConfig::default();
        let err = plan_sync(&[p.clone()], &CreatorIndices::new(), TimeWindow::default(), &job)
            .unwrap_err();
        assert!(matches!(err, AppError::MissingTimestamp { .. }));

        let lenient = JobConfig {
            require_edited: false,
            ..JobConfig::default()
        };
        let plan = plan_sync(&[p], &CreatorIndices::new(), TimeWindow::default(), &lenient).unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_id_as_path() {
        let job = JobConfig {
            post_id_as_path: true,
            post_dirname_format: "{bogus}".to_string(),
            ..JobConfig::default()
        };
        let plan = plan_sync(
            &[titled("7", "2024-01-01", "Seven")],
            &CreatorIndices::new(),
            TimeWindow::default(),
            &job,
        )
        .unwrap();
        assert_eq!(names(&plan), vec![Some("7")]);
    }

    #[test]
    fn test_mix_posts_records_nothing() {
        let job = JobConfig {
            mix_posts: true,
            post_dirname_format: "{bogus}".to_string(),
            ..JobConfig::default()
        };
        let indices = CreatorIndices::new();
        let plan = plan_sync(
            &[titled("1", "2024-01-01", "A")],
            &indices,
            TimeWindow::default(),
            &job,
        )
        .unwrap();
        assert_eq!(names(&plan), vec![None]);
        assert_eq!(plan.indices, indices);
    }

    #[test]
    fn test_duplicate_titles_get_id_suffix() {
        let job = JobConfig::default();
        let first = plan_sync(
            &[titled("1", "2024-01-01", "Same"), titled("2", "2024-01-02", "Same")],
            &CreatorIndices::new(),
            TimeWindow::default(),
            &job,
        )
        .unwrap();
        assert_eq!(names(&first), vec![Some("Same"), Some("Same_2")]);

        // A later edit of the first post keeps its directory.
        let second = plan_sync(
            &[titled("1", "2024-05-01", "Same")],
            &first.indices,
            TimeWindow::default(),
            &job,
        )
        .unwrap();
        assert_eq!(names(&second), vec![Some("Same")]);

        // A new post colliding with an archived one is suffixed.
        let third = plan_sync(
            &[titled("3", "2024-06-01", "Same")],
            &second.indices,
            TimeWindow::default(),
            &job,
        )
        .unwrap();
        assert_eq!(names(&third), vec![Some("Same_3")]);
    }

    #[test]
    fn test_suffixed_name_never_reuses_a_taken_one() {
        let posts = vec![
            titled("a", "2024-01-01", "Same_b"),
            titled("c", "2024-01-02", "Same"),
            titled("b", "2024-01-03", "Same"),
        ];
        let plan = plan_sync(&posts, &CreatorIndices::new(), TimeWindow::default(), &JobConfig::default())
            .unwrap();

        assert_eq!(names(&plan), vec![Some("Same_b"), Some("Same"), Some("Same_b_2")]);
        let unique: std::collections::HashSet<_> = names(&plan).into_iter().collect();
        assert_eq!(unique.len(), posts.len());
    }

    #[test]
    fn test_suffixed_long_names_fit_segment() {
        let title = "a".repeat(MAX_SEGMENT_BYTES);
        let posts = vec![
            titled("1", "2024-01-01", &title),
            titled("2", "2024-01-02", &title),
        ];
        let plan = plan_sync(&posts, &CreatorIndices::new(), TimeWindow::default(), &JobConfig::default())
            .unwrap();

        let got = names(&plan);
        assert_ne!(got[0], got[1]);
        for name in got.into_iter().flatten() {
            assert!(name.len() <= MAX_SEGMENT_BYTES, "{} bytes", name.len());
        }
        assert!(plan.entries[1].dirname.as_deref().unwrap().ends_with("_2"));
    }

    #[test]
    fn test_content_rule_in_plan() {
        let stored = titled("1", "2024-01-01", "A");
        let indices = CreatorIndices::new().with_posts(&[stored.clone()]);
        let mut silent = stored;
        silent.title = "A (fixed)".to_string();

        let job = JobConfig {
            change_rule: ChangeRule::Content,
            ..JobConfig::default()
        };
        let plan = plan_sync(&[silent], &indices, TimeWindow::default(), &job).unwrap();
        assert_eq!(names(&plan), vec![Some("A (fixed)")]);
    }
}
