//! Tree synchronization: shared types, progress events, and the
//! orchestrator.

pub mod engine;
mod progress;
mod types;

pub use engine::{fetch_repo_tree, sync_org_trees};
pub use progress::{ProgressCallback, SyncProgress, emit};
pub use types::{Repo, RepoTree, RepositoryRef};
