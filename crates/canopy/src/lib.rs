//! Canopy - repository tree synchronization for GitHub App installations.
//!
//! Given an installation credential, Canopy enumerates every repository the
//! installation can see and resolves each one's recursive source tree into
//! a flattened list of file paths, backed by a two-tier TTL cache so that
//! repeated runs stay off the API. Per-repository failures (missing repo,
//! empty repo) are skipped without aborting the batch; rate-limit
//! exhaustion halts the whole run while keeping everything already
//! gathered.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use canopy::cache::{MemoryStore, TreeCache};
//! use canopy::github::{GitHubClient, StaticTokenProvider};
//! use canopy::http::ReqwestTransport;
//! use canopy::sync::sync_org_trees;
//!
//! let transport = Arc::new(ReqwestTransport::new(reqwest::Client::new()));
//! let credentials = Arc::new(StaticTokenProvider::new(token));
//! let client = GitHubClient::new(transport, credentials);
//! let cache = TreeCache::new(Arc::new(MemoryStore::new()));
//!
//! let trees = sync_org_trees(&client, &cache, "Test-Organization", None).await?;
//! for (full_name, tree) in &trees {
//!     println!("{full_name}: {} files", tree.files.len());
//! }
//! ```

pub mod cache;
pub mod github;
pub mod http;
pub mod sync;

pub use cache::{CacheStore, MemoryStore, TreeCache};
pub use github::{GitHubClient, GitHubError, TreeFetch};
pub use sync::{Repo, RepoTree, RepositoryRef, sync_org_trees};
