//! Configuration file support for canopy.
//!
//! Configuration is loaded with the following precedence (highest to
//! lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `CANOPY_`, e.g.,
//!    `CANOPY_GITHUB_TOKEN`)
//! 3. Config file (~/.config/canopy/config.toml or ./canopy.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghs_..."  # or use CANOPY_GITHUB_TOKEN env var
//! api_url = "https://api.github.com"  # optional, for GitHub Enterprise
//! web_url = "https://github.com"      # optional
//!
//! [sync]
//! page_size = 100
//! ```

use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub configuration.
    pub github: GitHubConfig,
    /// Default sync options.
    pub sync: SyncConfig,
}

/// GitHub configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Installation access token.
    /// Can also be set via CANOPY_GITHUB_TOKEN environment variable.
    pub token: Option<String>,
    /// API base URL, for GitHub Enterprise instances.
    pub api_url: Option<String>,
    /// Web base URL used for browsable links.
    pub web_url: Option<String>,
}

/// Default sync options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Listing page size (1..=100).
    pub page_size: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/canopy/config.toml)
    /// 3. Local config file (./canopy.toml)
    /// 4. Environment variables with CANOPY_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(proj_dirs) = ProjectDirs::from("", "", "canopy") {
            let xdg_config = proj_dirs.config_dir().join("config.toml");
            if xdg_config.exists() {
                tracing::debug!("Loading config from {:?}", xdg_config);
                builder = builder.add_source(
                    File::from(xdg_config)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        let local_config = PathBuf::from("canopy.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./canopy.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("CANOPY")
                .separator("_")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert!(config.github.api_url.is_none());
        assert_eq!(config.sync.page_size, 100);
    }

    #[test]
    fn toml_values_are_parsed() {
        let toml_content = r#"
            [github]
            token = "ghs_test123"
            api_url = "https://github.example.com/api/v3"

            [sync]
            page_size = 25
        "#;

        let settings = ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml))
            .build()
            .unwrap();

        let config: Config = settings.try_deserialize().unwrap();

        assert_eq!(config.github.token, Some("ghs_test123".to_string()));
        assert_eq!(
            config.github.api_url,
            Some("https://github.example.com/api/v3".to_string())
        );
        assert_eq!(config.sync.page_size, 25);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_content = r#"
            [github]
            token = "ghs_only_token"
        "#;

        let settings = ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml))
            .build()
            .unwrap();

        let config: Config = settings.try_deserialize().unwrap();
        assert_eq!(config.github.token, Some("ghs_only_token".to_string()));
        assert_eq!(config.sync.page_size, 100);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let toml_content = r#"
            [sync]
            page_size = 50
            unknown_field = "ignored"
        "#;

        let settings = ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml))
            .build()
            .unwrap();

        let config: Config = settings.try_deserialize().unwrap();
        assert_eq!(config.sync.page_size, 50);
    }
}
