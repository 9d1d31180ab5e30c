//! GitHub wire types.
//!
//! Only the fields the engine reads are modeled; everything else in the
//! payloads is ignored. Listing entries can be surprisingly sparse (an
//! archived stub may carry nothing but its `archived` flag), so every field
//! is defaulted rather than required.

use serde::Deserialize;

use crate::sync::Repo;

/// Branch assumed when a listing entry omits `default_branch`.
pub const DEFAULT_BRANCH_FALLBACK: &str = "master";

/// One page of `GET /installation/repositories`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationRepositoriesPage {
    #[serde(default)]
    pub repositories: Vec<RepositorySummary>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

/// A repository entry as returned by listing and search endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositorySummary {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

impl RepositorySummary {
    /// Convert to a [`Repo`], if the entry carries enough identity.
    ///
    /// Entries without a full name cannot be addressed by any later call
    /// and are dropped by the caller.
    #[must_use]
    pub fn into_repo(self) -> Option<Repo> {
        let full_name = self.full_name?;
        let default_branch = self
            .default_branch
            .unwrap_or_else(|| DEFAULT_BRANCH_FALLBACK.to_string());
        Some(Repo::new(full_name, default_branch))
    }
}

/// Response of `GET /search/repositories`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRepositoriesResponse {
    #[serde(default)]
    pub items: Vec<RepositorySummary>,
}

/// Response of `GET /repos/{full_name}/git/trees/{ref}?recursive=1`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitTreeResponse {
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub tree: Vec<GitTreeEntry>,
    /// Set by the remote when the listing exceeded its size limit and was
    /// cut short.
    #[serde(default)]
    pub truncated: bool,
}

/// One entry of a recursive tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct GitTreeEntry {
    pub path: String,
    /// `"blob"` for files, `"tree"` for directories, `"commit"` for
    /// submodules.
    #[serde(rename = "type")]
    pub kind: String,
}

impl GitTreeEntry {
    #[must_use]
    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }
}
