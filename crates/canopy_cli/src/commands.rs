//! Command handlers.

use std::sync::Arc;
use std::time::Duration;

use canopy::cache::{MemoryStore, TreeCache};
use canopy::github::{GitHubClient, StaticTokenProvider, message_from_error};
use canopy::http::ReqwestTransport;
use canopy::sync::{ProgressCallback, Repo, SyncProgress, sync_org_trees};

use crate::config::Config;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a client from the loaded configuration.
pub fn build_client(config: &Config) -> Result<GitHubClient, Box<dyn std::error::Error>> {
    let token = config
        .github
        .token
        .clone()
        .ok_or("no GitHub token configured; set CANOPY_GITHUB_TOKEN or [github].token")?;

    let transport = Arc::new(ReqwestTransport::with_timeout(HTTP_TIMEOUT)?);
    let credentials = Arc::new(StaticTokenProvider::new(token));

    let mut client = GitHubClient::new(transport, credentials)
        .with_page_size(config.sync.page_size);
    if let Some(api_url) = &config.github.api_url {
        client = client.with_api_base(api_url.clone());
    }
    if let Some(web_url) = &config.github.web_url {
        client = client.with_web_base(web_url.clone());
    }
    Ok(client)
}

fn progress_logger() -> ProgressCallback {
    Box::new(|event| match event {
        SyncProgress::FetchingRepos { organization } => {
            tracing::info!(%organization, "listing repositories");
        }
        SyncProgress::FetchedPage {
            page,
            count,
            total_so_far,
        } => {
            tracing::info!(page, count, total_so_far, "fetched listing page");
        }
        SyncProgress::ListingCacheHit {
            organization,
            count,
        } => {
            tracing::info!(%organization, count, "listing served from cache");
        }
        SyncProgress::TreeFetched { full_name, files } => {
            tracing::info!(%full_name, files, "tree fetched");
        }
        SyncProgress::TreeCacheHit { full_name, files } => {
            tracing::debug!(%full_name, files, "tree served from cache");
        }
        SyncProgress::TreeSkipped { full_name, reason } => {
            tracing::warn!(%full_name, %reason, "repository skipped");
        }
        SyncProgress::RateLimitHalt { full_name } => {
            tracing::warn!(%full_name, "rate limit reached, halting");
        }
        SyncProgress::SyncComplete { resolved, listed } => {
            tracing::info!(resolved, listed, "sync complete");
        }
        _ => {}
    })
}

/// `canopy repos`: list the repositories visible to the installation.
pub async fn handle_repos(
    config: &Config,
    all: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_client(config)?;

    let repos = match client.get_repositories(all).await {
        Ok(repos) => repos,
        Err(e) => return Err(message_from_error(&e).into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&repos)?);
    } else {
        for repo in &repos {
            println!("{}", repo.identifier);
        }
    }
    Ok(())
}

/// `canopy trees <org>`: sync the organization's source trees.
pub async fn handle_trees(
    config: &Config,
    organization: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_client(config)?;
    let cache = TreeCache::new(Arc::new(MemoryStore::new()));
    let progress = progress_logger();

    let trees = match sync_org_trees(&client, &cache, organization, Some(&progress)).await {
        Ok(trees) => trees,
        Err(e) => return Err(message_from_error(&e).into()),
    };

    if json {
        let value: serde_json::Value = trees
            .iter()
            .map(|(full_name, tree)| (full_name.clone(), serde_json::json!(tree.files)))
            .collect::<serde_json::Map<String, serde_json::Value>>()
            .into();
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        for (full_name, tree) in &trees {
            println!("{full_name}: {} files", tree.files.len());
        }
    }
    Ok(())
}

/// `canopy search <org> <query>`: search the organization's repositories.
pub async fn handle_search(
    config: &Config,
    organization: &str,
    query: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_client(config)?;

    let refs = match client.search_repositories(organization, query).await {
        Ok(refs) => refs,
        Err(e) => return Err(message_from_error(&e).into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&refs)?);
    } else {
        for r in &refs {
            println!("{}", r.identifier);
        }
    }
    Ok(())
}

/// `canopy link <full_name> <path>`: resolve a browsable source link.
pub async fn handle_link(
    config: &Config,
    full_name: &str,
    path: &str,
    default_branch: &str,
    version: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_client(config)?;
    let repo = Repo::new(full_name, default_branch);

    let link = match client
        .get_stacktrace_link(&repo, path, default_branch, version)
        .await
    {
        Ok(link) => link,
        Err(e) => return Err(message_from_error(&e).into()),
    };

    match link {
        Some(url) => println!("{url}"),
        None => {
            tracing::warn!(full_name, path, "file not found on any probed ref");
            std::process::exit(1);
        }
    }
    Ok(())
}
