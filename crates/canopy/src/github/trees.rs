//! Recursive tree fetching and outcome classification.

use crate::http::HttpMethod;
use crate::sync::Repo;

use super::client::GitHubClient;
use super::error::{GitHubError, is_rate_limit_response, rate_limit_reset, response_message};
use super::types::GitTreeResponse;

/// Outcome of fetching one repository's recursive tree.
///
/// The orchestrator's continue-or-stop decision is a plain match on this
/// enum rather than error-type inspection. Everything except `RateLimited`
/// lets the batch continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeFetch {
    /// The tree was fetched; `files` holds blob paths in remote order.
    Fetched { files: Vec<String> },
    /// The repository has no commits (409). Cached as an empty list.
    Empty,
    /// The repository or ref does not exist (404). Nothing is cached.
    NotFound,
    /// Any other failure on this repository: unexpected status, transport
    /// error, undecodable body. Nothing is cached.
    Failed { reason: String },
    /// The rate limit is exhausted. This is a batch-wide condition: the
    /// whole run must stop issuing remote calls.
    RateLimited,
}

impl TreeFetch {
    /// Whether the batch may proceed past this outcome.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        !matches!(self, TreeFetch::RateLimited)
    }
}

impl GitHubClient {
    /// Fetch the recursive tree for `repo` at `git_ref` (default branch
    /// when `None`) and flatten it to blob paths.
    ///
    /// Only a credential failure errors; everything the remote can say
    /// about one repository comes back as a [`TreeFetch`] outcome. This
    /// never caches; the cache-aware layer in [`crate::sync::engine`]
    /// decides what to persist per outcome.
    pub async fn get_tree(
        &self,
        repo: &Repo,
        git_ref: Option<&str>,
    ) -> Result<TreeFetch, GitHubError> {
        let git_ref = git_ref.unwrap_or(&repo.default_branch);
        let url = self.api_url(&format!(
            "/repos/{}/git/trees/{}?recursive=1",
            repo.full_name, git_ref
        ));

        let response = match self.request(HttpMethod::Get, url).await {
            Ok(response) => response,
            Err(e @ GitHubError::Credential(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(full_name = %repo.full_name, error = %e, "tree fetch failed");
                return Ok(TreeFetch::Failed {
                    reason: e.to_string(),
                });
            }
        };

        if response.is_success() {
            let tree: GitTreeResponse = match serde_json::from_slice(&response.body) {
                Ok(tree) => tree,
                Err(e) => {
                    tracing::warn!(full_name = %repo.full_name, error = %e, "undecodable tree body");
                    return Ok(TreeFetch::Failed {
                        reason: format!("malformed tree body: {e}"),
                    });
                }
            };

            if tree.truncated {
                tracing::warn!(
                    full_name = %repo.full_name,
                    git_ref,
                    "recursive tree listing was truncated by the remote"
                );
            }

            let files: Vec<String> = tree
                .tree
                .into_iter()
                .filter(|entry| entry.is_blob())
                .map(|entry| entry.path)
                .collect();

            return Ok(TreeFetch::Fetched { files });
        }

        let message = response_message(&response.body);

        if is_rate_limit_response(response.status, &message) {
            tracing::warn!(
                full_name = %repo.full_name,
                status = response.status,
                reset_at = ?rate_limit_reset(&response),
                "rate limit reached while fetching tree"
            );
            return Ok(TreeFetch::RateLimited);
        }

        Ok(match response.status {
            409 => TreeFetch::Empty,
            404 => TreeFetch::NotFound,
            status => {
                tracing::warn!(full_name = %repo.full_name, status, %message, "skipping repository");
                TreeFetch::Failed {
                    reason: format!("HTTP {status}"),
                }
            }
        })
    }
}
