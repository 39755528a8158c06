pub mod differ;
pub mod hasher;
pub mod naming;
pub mod planner;
pub mod window;

pub use differ::{diff_indices, diff_indices_with, ChangeRule};
pub use hasher::ContentHasher;
pub use naming::{name_for, sanitize_dirname, DirnameTemplate, NamingPolicy, Placeholder};
pub use planner::{plan_sync, PlannedPost, SyncPlan};
pub use window::{filter_by_time, TimeWindow};
