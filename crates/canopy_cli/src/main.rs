//! Canopy CLI - command-line interface for the tree synchronization engine.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "canopy")]
#[command(version)]
#[command(about = "Repository tree synchronization for GitHub App installations")]
#[command(
    long_about = "Canopy enumerates the repositories visible to a GitHub App installation and \
resolves each repository's source tree into a flattened list of file paths, \
with per-repository failures skipped and rate-limit exhaustion halting the \
batch."
)]
#[command(after_long_help = r#"EXAMPLES
    List the repositories visible to the installation:
        $ canopy repos --all

    Sync the source trees of an organization:
        $ canopy trees Test-Organization

    Resolve a browsable link for a stack-trace frame:
        $ canopy link Test-Organization/foo src/main.rs --version 1234567

CONFIGURATION
    Canopy reads configuration from:
      1. ~/.config/canopy/config.toml (or $XDG_CONFIG_HOME/canopy/config.toml)
      2. ./canopy.toml
      3. Environment variables (CANOPY_* prefix, e.g., CANOPY_GITHUB_TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    CANOPY_GITHUB_TOKEN     Installation access token
    CANOPY_GITHUB_API_URL   API base URL (default: https://api.github.com)
    CANOPY_GITHUB_WEB_URL   Web base URL (default: https://github.com)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List repositories visible to the installation
    Repos {
        /// Fetch all pages instead of only the first
        #[arg(short, long)]
        all: bool,

        /// Emit JSON instead of plain lines
        #[arg(long)]
        json: bool,
    },
    /// Sync the source trees of an organization's repositories
    Trees {
        /// Organization name
        organization: String,

        /// Emit JSON instead of plain lines
        #[arg(long)]
        json: bool,
    },
    /// Search the organization's repositories by name fragment
    Search {
        /// Organization name
        organization: String,

        /// Name fragment to search for
        query: String,

        /// Emit JSON instead of plain lines
        #[arg(long)]
        json: bool,
    },
    /// Resolve a browsable URL for a source file
    Link {
        /// Repository full name (owner/name)
        full_name: String,

        /// File path within the repository
        path: String,

        /// Default branch to fall back to
        #[arg(short, long, default_value = "master")]
        default_branch: String,

        /// Specific ref (commit SHA or branch) to probe first
        #[arg(short, long)]
        version: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("canopy=info,canopy_cli=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let config = config::Config::load();
    let cli = Cli::parse();

    match cli.command {
        Commands::Repos { all, json } => {
            commands::handle_repos(&config, all, json).await?;
        }
        Commands::Trees { organization, json } => {
            commands::handle_trees(&config, &organization, json).await?;
        }
        Commands::Search {
            organization,
            query,
            json,
        } => {
            commands::handle_search(&config, &organization, &query, json).await?;
        }
        Commands::Link {
            full_name,
            path,
            default_branch,
            version,
        } => {
            commands::handle_link(&config, &full_name, &path, &default_branch, version.as_deref())
                .await?;
        }
    }

    Ok(())
}
