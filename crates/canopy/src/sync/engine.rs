//! Tree synchronization orchestrator.
//!
//! One run resolves the flattened source tree of every repository visible
//! to an installation's organization, reusing the two-tier cache wherever
//! it can and stopping cold the moment the remote reports rate-limit
//! exhaustion.

use std::collections::BTreeMap;

use crate::cache::TreeCache;
use crate::github::{GitHubClient, GitHubError, TreeFetch};

use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{Repo, RepoTree};

/// Resolve one repository's tree, writing through to the cache on terminal
/// skip-or-success outcomes.
///
/// - `Fetched` and `Empty` cache their (possibly empty) file list, so later
///   runs inside the TTL window never re-fetch them.
/// - `NotFound` and `Failed` cache nothing: absence may be transient, and a
///   cached empty list would mask the repository reappearing.
/// - `RateLimited` caches nothing; the caller must stop the batch.
///
/// Errors only when the installation credential cannot be resolved, which
/// is fatal to the whole run.
pub async fn fetch_repo_tree(
    client: &GitHubClient,
    cache: &TreeCache,
    repo: &Repo,
    git_ref: Option<&str>,
) -> Result<TreeFetch, GitHubError> {
    let outcome = client.get_tree(repo, git_ref).await?;

    match &outcome {
        TreeFetch::Fetched { files } => cache.store_repo_files(&repo.full_name, files).await,
        TreeFetch::Empty => cache.store_repo_files(&repo.full_name, &[]).await,
        TreeFetch::NotFound | TreeFetch::Failed { .. } | TreeFetch::RateLimited => {}
    }

    Ok(outcome)
}

/// Resolve the source trees of every repository in `organization`.
///
/// The repository set comes from the listing snapshot when one is cached,
/// otherwise from a full (all-pages) listing that is snapshotted before any
/// tree is fetched. Repositories are then processed strictly sequentially,
/// in snapshot order: the halt decision for each one must observe the
/// outcome of the one before it.
///
/// Per-repository failures are isolated: an empty or missing repository
/// contributes an empty file list and the batch continues. Rate-limit
/// exhaustion is global: the run stops immediately and the mapping contains
/// only the repositories resolved before the halt. Callers must not infer
/// completeness from the mapping's shape; it is complete exactly when its
/// key count matches the listed repository count.
///
/// A second invocation inside the TTL window returns an equal mapping
/// without issuing any remote tree calls for already-resolved repositories.
#[tracing::instrument(skip(client, cache, on_progress), fields(organization = %organization))]
pub async fn sync_org_trees(
    client: &GitHubClient,
    cache: &TreeCache,
    organization: &str,
    on_progress: Option<&ProgressCallback>,
) -> Result<BTreeMap<String, RepoTree>, GitHubError> {
    let repos = match cache.listing_snapshot(organization).await {
        Some(repos) if !repos.is_empty() => {
            emit(
                on_progress,
                SyncProgress::ListingCacheHit {
                    organization: organization.to_string(),
                    count: repos.len(),
                },
            );
            repos
        }
        _ => {
            emit(
                on_progress,
                SyncProgress::FetchingRepos {
                    organization: organization.to_string(),
                },
            );
            let repos = client.list_repositories(true, on_progress).await?;
            cache.store_listing_snapshot(organization, &repos).await;
            repos
        }
    };

    let mut trees: BTreeMap<String, RepoTree> = BTreeMap::new();

    for repo in &repos {
        if let Some(files) = cache.repo_files(&repo.full_name).await {
            emit(
                on_progress,
                SyncProgress::TreeCacheHit {
                    full_name: repo.full_name.clone(),
                    files: files.len(),
                },
            );
            trees.insert(repo.full_name.clone(), RepoTree::new(repo.clone(), files));
            continue;
        }

        match fetch_repo_tree(client, cache, repo, None).await? {
            TreeFetch::Fetched { files } => {
                emit(
                    on_progress,
                    SyncProgress::TreeFetched {
                        full_name: repo.full_name.clone(),
                        files: files.len(),
                    },
                );
                trees.insert(repo.full_name.clone(), RepoTree::new(repo.clone(), files));
            }
            TreeFetch::Empty => {
                emit(
                    on_progress,
                    SyncProgress::TreeSkipped {
                        full_name: repo.full_name.clone(),
                        reason: "empty repository".to_string(),
                    },
                );
                trees.insert(repo.full_name.clone(), RepoTree::empty(repo.clone()));
            }
            TreeFetch::NotFound => {
                emit(
                    on_progress,
                    SyncProgress::TreeSkipped {
                        full_name: repo.full_name.clone(),
                        reason: "not found".to_string(),
                    },
                );
                trees.insert(repo.full_name.clone(), RepoTree::empty(repo.clone()));
            }
            TreeFetch::Failed { reason } => {
                emit(
                    on_progress,
                    SyncProgress::TreeSkipped {
                        full_name: repo.full_name.clone(),
                        reason,
                    },
                );
                trees.insert(repo.full_name.clone(), RepoTree::empty(repo.clone()));
            }
            TreeFetch::RateLimited => {
                tracing::warn!(
                    organization,
                    full_name = %repo.full_name,
                    resolved = trees.len(),
                    "rate limit reached, halting tree sync"
                );
                emit(
                    on_progress,
                    SyncProgress::RateLimitHalt {
                        full_name: repo.full_name.clone(),
                    },
                );
                break;
            }
        }
    }

    emit(
        on_progress,
        SyncProgress::SyncComplete {
            resolved: trees.len(),
            listed: repos.len(),
        },
    );

    Ok(trees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, TreeCache};
    use crate::github::StaticTokenProvider;
    use crate::http::{HttpMethod, MockTransport};
    use serde_json::json;
    use std::sync::Arc;

    const API: &str = "https://api.github.test";
    const ORG: &str = "Test-Organization";

    fn client(transport: &MockTransport) -> GitHubClient {
        GitHubClient::new(
            Arc::new(transport.clone()),
            Arc::new(StaticTokenProvider::new("ghs_test")),
        )
        .with_api_base(API)
    }

    fn cache() -> TreeCache {
        TreeCache::new(Arc::new(MemoryStore::new()))
    }

    fn tree_url(full_name: &str, git_ref: &str) -> String {
        format!("{API}/repos/{full_name}/git/trees/{git_ref}?recursive=1")
    }

    fn listing_url() -> String {
        format!("{API}/installation/repositories?per_page=100")
    }

    fn push_listing(transport: &MockTransport, repos: &[(&str, &str)]) {
        let entries: Vec<serde_json::Value> = repos
            .iter()
            .map(|(full_name, branch)| json!({"full_name": full_name, "default_branch": branch}))
            .collect();
        transport.push_json(
            HttpMethod::Get,
            listing_url(),
            &json!({"repositories": entries}),
            Vec::new(),
        );
    }

    fn push_tree(transport: &MockTransport, full_name: &str, branch: &str, files: &[&str]) {
        let entries: Vec<serde_json::Value> = files
            .iter()
            .map(|path| json!({"path": path, "type": "blob"}))
            .collect();
        transport.push_json(
            HttpMethod::Get,
            tree_url(full_name, branch),
            &json!({"tree": entries, "truncated": false}),
            Vec::new(),
        );
    }

    #[tokio::test]
    async fn resolves_every_repository_and_snapshots_the_listing() {
        let transport = MockTransport::new();
        let cache = cache();
        push_listing(
            &transport,
            &[
                ("Test-Organization/foo", "master"),
                ("Test-Organization/bar", "main"),
            ],
        );
        push_tree(
            &transport,
            "Test-Organization/foo",
            "master",
            &["src/api/auth_login.py"],
        );
        push_tree(&transport, "Test-Organization/bar", "main", &[]);

        let trees = sync_org_trees(&client(&transport), &cache, ORG, None)
            .await
            .expect("sync");

        assert_eq!(trees.len(), 2);
        assert_eq!(
            trees["Test-Organization/foo"].files,
            vec!["src/api/auth_login.py"]
        );
        assert!(trees["Test-Organization/bar"].files.is_empty());

        // Listing snapshot and both tree entries are now cached.
        assert_eq!(
            cache.listing_snapshot(ORG).await,
            Some(vec![
                Repo::new("Test-Organization/foo", "master"),
                Repo::new("Test-Organization/bar", "main"),
            ])
        );
        assert_eq!(
            cache.repo_files("Test-Organization/foo").await,
            Some(vec!["src/api/auth_login.py".to_string()])
        );
    }

    #[tokio::test]
    async fn skip_isolation_keeps_empty_and_missing_repos_in_the_result() {
        let transport = MockTransport::new();
        let cache = cache();
        push_listing(
            &transport,
            &[
                ("Test-Organization/a", "master"),
                ("Test-Organization/b", "main"),
                ("Test-Organization/c", "master"),
            ],
        );
        push_tree(&transport, "Test-Organization/a", "master", &["real.py"]);
        transport.push_status(
            HttpMethod::Get,
            tree_url("Test-Organization/b", "main"),
            409,
            r#"{"message": "Git Repository is empty."}"#,
        );
        transport.push_status(
            HttpMethod::Get,
            tree_url("Test-Organization/c", "master"),
            404,
            r#"{"message": "Not Found"}"#,
        );

        let trees = sync_org_trees(&client(&transport), &cache, ORG, None)
            .await
            .expect("sync");

        assert_eq!(trees.len(), 3);
        assert_eq!(trees["Test-Organization/a"].files, vec!["real.py"]);
        assert!(trees["Test-Organization/b"].files.is_empty());
        assert!(trees["Test-Organization/c"].files.is_empty());

        // The empty repo is cached as an explicit empty list; the missing
        // one is not cached at all.
        assert_eq!(
            cache.repo_files("Test-Organization/b").await,
            Some(Vec::new())
        );
        assert_eq!(cache.repo_files("Test-Organization/c").await, None);
    }

    #[tokio::test]
    async fn halt_keeps_prior_results_and_leaves_later_repos_untouched() {
        let transport = MockTransport::new();
        let cache = cache();

        // Listing snapshot pre-seeded so the order [bar, xyz, foo] is fixed
        // and xyz (rate limited) is hit before foo.
        cache
            .store_listing_snapshot(
                ORG,
                &[
                    Repo::new("Test-Organization/bar", "main"),
                    Repo::new("Test-Organization/xyz", "master"),
                    Repo::new("Test-Organization/foo", "master"),
                ],
            )
            .await;

        transport.push_status(
            HttpMethod::Get,
            tree_url("Test-Organization/bar", "main"),
            409,
            r#"{"message": "Git Repository is empty."}"#,
        );
        transport.push_status(
            HttpMethod::Get,
            tree_url("Test-Organization/xyz", "master"),
            403,
            r#"{"message": "API rate limit exceeded for installation ID 123456."}"#,
        );

        let trees = sync_org_trees(&client(&transport), &cache, ORG, None)
            .await
            .expect("sync");

        assert_eq!(trees.len(), 1);
        assert!(trees["Test-Organization/bar"].files.is_empty());
        assert!(!trees.contains_key("Test-Organization/xyz"));
        assert!(!trees.contains_key("Test-Organization/foo"));

        // bar was cached before the halt; xyz hit the limit, foo was never
        // tried.
        assert_eq!(
            cache.repo_files("Test-Organization/bar").await,
            Some(Vec::new())
        );
        assert_eq!(cache.repo_files("Test-Organization/xyz").await, None);
        assert_eq!(cache.repo_files("Test-Organization/foo").await, None);

        // No request was made for foo.
        let urls = transport.requested_urls();
        assert!(!urls.iter().any(|u| u.contains("/foo/")));
    }

    #[tokio::test]
    async fn second_run_is_idempotent_and_issues_no_tree_calls() {
        let transport = MockTransport::new();
        let cache = cache();
        push_listing(&transport, &[("Test-Organization/foo", "master")]);
        push_tree(&transport, "Test-Organization/foo", "master", &["a.py"]);

        let c = client(&transport);
        let first = sync_org_trees(&c, &cache, ORG, None).await.expect("first");
        let requests_after_first = transport.requests().len();

        let second = sync_org_trees(&c, &cache, ORG, None)
            .await
            .expect("second");

        assert_eq!(first, second);
        // Listing and tree both came from cache: zero new requests.
        assert_eq!(transport.requests().len(), requests_after_first);
    }

    #[tokio::test]
    async fn cached_empty_list_is_reused_without_a_remote_call() {
        let transport = MockTransport::new();
        let cache = cache();
        cache
            .store_listing_snapshot(ORG, &[Repo::new("Test-Organization/bar", "main")])
            .await;
        cache.store_repo_files("Test-Organization/bar", &[]).await;

        let trees = sync_org_trees(&client(&transport), &cache, ORG, None)
            .await
            .expect("sync");

        assert_eq!(trees.len(), 1);
        assert!(trees["Test-Organization/bar"].files.is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn listing_failure_aborts_before_any_tree_fetch() {
        let transport = MockTransport::new();
        let cache = cache();
        transport.push_status(
            HttpMethod::Get,
            listing_url(),
            401,
            r#"{"message": "Bad credentials"}"#,
        );

        let err = sync_org_trees(&client(&transport), &cache, ORG, None)
            .await
            .expect_err("listing failure should be fatal");
        assert!(matches!(err, GitHubError::AuthRequired));

        assert_eq!(cache.listing_snapshot(ORG).await, None);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn server_error_on_one_repo_does_not_stop_the_batch() {
        let transport = MockTransport::new();
        let cache = cache();
        push_listing(
            &transport,
            &[
                ("Test-Organization/flaky", "main"),
                ("Test-Organization/solid", "main"),
            ],
        );
        transport.push_status(
            HttpMethod::Get,
            tree_url("Test-Organization/flaky", "main"),
            500,
            "{}",
        );
        push_tree(&transport, "Test-Organization/solid", "main", &["ok.rs"]);

        let trees = sync_org_trees(&client(&transport), &cache, ORG, None)
            .await
            .expect("sync");

        assert_eq!(trees.len(), 2);
        assert!(trees["Test-Organization/flaky"].files.is_empty());
        assert_eq!(trees["Test-Organization/solid"].files, vec!["ok.rs"]);
        // The transient failure is not cached, so the next run retries it.
        assert_eq!(cache.repo_files("Test-Organization/flaky").await, None);
    }

    #[tokio::test]
    async fn credential_failure_is_fatal_even_mid_batch() {
        use crate::github::{AccessToken, CredentialError, CredentialProvider};
        use async_trait::async_trait;

        struct MissingInstallation;

        #[async_trait]
        impl CredentialProvider for MissingInstallation {
            async fn access_token(&self) -> Result<AccessToken, CredentialError> {
                Err(CredentialError::InstallationNotFound {
                    installation_id: "install_1".to_string(),
                })
            }
        }

        let transport = MockTransport::new();
        let cache = cache();
        // Listing comes from a seeded snapshot, so the first remote call is
        // a tree fetch whose token minting fails.
        cache
            .store_listing_snapshot(ORG, &[Repo::new("Test-Organization/foo", "master")])
            .await;

        let client = GitHubClient::new(Arc::new(transport), Arc::new(MissingInstallation))
            .with_api_base(API);

        let err = sync_org_trees(&client, &cache, ORG, None)
            .await
            .expect_err("credential failure should be fatal");
        assert!(matches!(err, GitHubError::Credential(_)));
    }

    #[tokio::test]
    async fn progress_events_trace_the_run() {
        use std::sync::Mutex;

        let transport = MockTransport::new();
        let cache = cache();
        push_listing(&transport, &[("Test-Organization/foo", "master")]);
        push_tree(&transport, "Test-Organization/foo", "master", &["a.py"]);

        let events: Arc<Mutex<Vec<SyncProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let events_capture = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            events_capture
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(event);
        });

        sync_org_trees(&client(&transport), &cache, ORG, Some(&callback))
            .await
            .expect("sync");

        let events = events.lock().unwrap_or_else(|e| e.into_inner());
        assert!(
            events
                .iter()
                .any(|e| matches!(e, SyncProgress::FetchingRepos { .. }))
        );
        assert!(
            events
                .iter()
                .any(|e| matches!(e, SyncProgress::TreeFetched { .. }))
        );
        assert!(events.iter().any(
            |e| matches!(e, SyncProgress::SyncComplete { resolved: 1, listed: 1 })
        ));
    }
}
