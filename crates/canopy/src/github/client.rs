//! GitHub API client for installation-scoped repository operations.

use std::sync::Arc;

use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::sync::{ProgressCallback, Repo, RepositoryRef, SyncProgress, emit};

use super::auth::CredentialProvider;
use super::error::{GitHubError, classify_response};
use super::pagination::parse_link_header;
use super::types::{InstallationRepositoriesPage, SearchRepositoriesResponse};

/// Default REST API base.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default web base, used to build browsable blob URLs.
pub const DEFAULT_WEB_BASE: &str = "https://github.com";

/// Default listing page size.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A client scoped to one app installation.
///
/// All I/O goes through the injected [`HttpTransport`]; the bearer token is
/// resolved through the injected [`CredentialProvider`] before each request,
/// so token refresh happens wherever the provider implements it.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialProvider>,
    api_base: String,
    web_base: String,
    page_size: u32,
}

impl GitHubClient {
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            transport,
            credentials,
            api_base: DEFAULT_API_BASE.to_string(),
            web_base: DEFAULT_WEB_BASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Point the client at a different API host (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = trim_trailing_slash(api_base.into());
        self
    }

    /// Point blob URLs at a different web host.
    #[must_use]
    pub fn with_web_base(mut self, web_base: impl Into<String>) -> Self {
        self.web_base = trim_trailing_slash(web_base.into());
        self
    }

    /// Change the listing page size (1..=100).
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 100);
        self
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Issue one authenticated request and return the raw response.
    ///
    /// Status classification is the caller's job; only credential and
    /// transport failures error here.
    pub(crate) async fn request(
        &self,
        method: HttpMethod,
        url: String,
    ) -> Result<HttpResponse, GitHubError> {
        let token = self.credentials.access_token().await?;

        let request = HttpRequest {
            method,
            url,
            headers: vec![
                (
                    "Accept".to_string(),
                    "application/vnd.github+json".to_string(),
                ),
                ("User-Agent".to_string(), "canopy".to_string()),
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", token.secret()),
                ),
            ],
        };

        Ok(self.transport.send(request).await?)
    }

    /// List the repositories visible to this installation.
    ///
    /// Always fetches at least one page. With `exhaust_all`, follows the
    /// `Link` header's `next` relation until no further page exists,
    /// concatenating pages in order; otherwise only the first page is
    /// returned. Archived repositories are filtered out before return.
    ///
    /// Any non-2xx page response fails the whole listing; there is no
    /// partial-success contract here, unlike tree fetching.
    pub async fn list_repositories(
        &self,
        exhaust_all: bool,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<Repo>, GitHubError> {
        let mut url = self.api_url(&format!(
            "/installation/repositories?per_page={}",
            self.page_size
        ));
        let mut repos: Vec<Repo> = Vec::new();
        let mut page = 1u32;

        loop {
            let response = self.request(HttpMethod::Get, url).await?;
            if !response.is_success() {
                return Err(classify_response(&response, "installation repositories"));
            }

            let parsed: InstallationRepositoriesPage = serde_json::from_slice(&response.body)
                .map_err(|e| GitHubError::MalformedResponse(e.to_string()))?;

            let before = repos.len();
            repos.extend(
                parsed
                    .repositories
                    .into_iter()
                    .filter(|r| !r.archived)
                    .filter_map(|r| r.into_repo()),
            );

            emit(
                on_progress,
                SyncProgress::FetchedPage {
                    page,
                    count: repos.len() - before,
                    total_so_far: repos.len(),
                },
            );

            if !exhaust_all {
                break;
            }

            let next = response
                .header("link")
                .map(parse_link_header)
                .and_then(|links| links.next().map(str::to_string));

            match next {
                Some(next_url) => {
                    url = next_url;
                    page += 1;
                }
                None => break,
            }
        }

        Ok(repos)
    }

    /// The listing as `{identifier, name}` pairs, for search/browse
    /// consumers.
    pub async fn get_repositories(
        &self,
        exhaust_all: bool,
    ) -> Result<Vec<RepositoryRef>, GitHubError> {
        let repos = self.list_repositories(exhaust_all, None).await?;
        Ok(repos
            .into_iter()
            .map(|r| RepositoryRef {
                name: r.name().to_string(),
                identifier: r.full_name,
            })
            .collect())
    }

    /// Search the organization's repositories by name fragment.
    pub async fn search_repositories(
        &self,
        organization: &str,
        query: &str,
    ) -> Result<Vec<RepositoryRef>, GitHubError> {
        let q = format!("org:{organization} {query}").replace(' ', "+");
        let url = self.api_url(&format!("/search/repositories?q={q}"));

        let response = self.request(HttpMethod::Get, url).await?;
        if !response.is_success() {
            return Err(classify_response(&response, "repository search"));
        }

        let parsed: SearchRepositoriesResponse = serde_json::from_slice(&response.body)
            .map_err(|e| GitHubError::MalformedResponse(e.to_string()))?;

        Ok(parsed
            .items
            .into_iter()
            .filter_map(|item| {
                let identifier = item.full_name?;
                let name = item.name.unwrap_or_else(|| {
                    identifier
                        .rsplit_once('/')
                        .map(|(_, n)| n.to_string())
                        .unwrap_or_else(|| identifier.clone())
                });
                Some(RepositoryRef { identifier, name })
            })
            .collect())
    }

    /// Resolve a browsable URL for a source file referenced by a stack
    /// trace.
    ///
    /// Probes `version_ref` first; if the file is missing there, falls back
    /// to `default_ref`. Returns a URL only when one of the probes
    /// succeeds.
    pub async fn get_stacktrace_link(
        &self,
        repo: &Repo,
        path: &str,
        default_ref: &str,
        version_ref: Option<&str>,
    ) -> Result<Option<String>, GitHubError> {
        let path = path.trim_start_matches('/');

        if let Some(version) = version_ref {
            if self.file_exists(repo, path, version).await? {
                return Ok(Some(self.blob_url(repo, version, path)));
            }
            if version == default_ref {
                return Ok(None);
            }
        }

        if self.file_exists(repo, path, default_ref).await? {
            return Ok(Some(self.blob_url(repo, default_ref, path)));
        }

        Ok(None)
    }

    /// `HEAD` probe for a file's existence at a ref.
    ///
    /// Any status other than success or 404 also reads as "not here"; the
    /// link resolver only promises a URL for a confirmed file.
    async fn file_exists(
        &self,
        repo: &Repo,
        path: &str,
        git_ref: &str,
    ) -> Result<bool, GitHubError> {
        let url = self.api_url(&format!(
            "/repos/{}/contents/{}?ref={}",
            repo.full_name, path, git_ref
        ));
        let response = self.request(HttpMethod::Head, url).await?;

        if response.is_success() {
            return Ok(true);
        }
        if response.status != 404 {
            tracing::debug!(
                full_name = %repo.full_name,
                git_ref,
                status = response.status,
                "file existence probe failed"
            );
        }
        Ok(false)
    }

    fn blob_url(&self, repo: &Repo, git_ref: &str, path: &str) -> String {
        format!("{}/{}/blob/{git_ref}/{path}", self.web_base, repo.full_name)
    }
}

fn trim_trailing_slash(mut s: String) -> String {
    while s.ends_with('/') {
        s.pop();
    }
    s
}
