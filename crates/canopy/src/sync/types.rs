//! Shared value types for tree synchronization.

use serde::{Deserialize, Serialize};

/// A remote repository, identified by its `owner/name` full name and the
/// branch used when no explicit ref is requested.
///
/// This is also the stored shape of the listing-snapshot cache entries, so
/// the serde field names are part of the cache layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    pub full_name: String,
    pub default_branch: String,
}

impl Repo {
    pub fn new(full_name: impl Into<String>, default_branch: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            default_branch: default_branch.into(),
        }
    }

    /// The repository name without its owner prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        self.full_name
            .rsplit_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.full_name)
    }
}

/// A repository together with its flattened blob paths.
///
/// `files` is empty when the repository has no commits or its tree fetch
/// failed in a skip manner. A repository that is absent from a sync result
/// entirely was never reached before the run halted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTree {
    pub repo: Repo,
    pub files: Vec<String>,
}

impl RepoTree {
    pub fn new(repo: Repo, files: Vec<String>) -> Self {
        Self { repo, files }
    }

    /// A tree with no files, for empty and skipped repositories.
    pub fn empty(repo: Repo) -> Self {
        Self {
            repo,
            files: Vec::new(),
        }
    }
}

/// The `{identifier, name}` pair handed to search/browse consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Stable identifier: the repository full name.
    pub identifier: String,
    /// Short display name.
    pub name: String,
}
