//! Installation credentials.
//!
//! Token minting, refresh, and expiry live outside this crate; the engine
//! only asks a [`CredentialProvider`] for a currently-valid bearer token
//! before each request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// A bearer credential for one installation.
#[derive(Debug, Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token has passed its expiry. Tokens without an expiry
    /// never expire from this crate's point of view.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    /// The installation the credential belongs to no longer exists.
    #[error("the installation could not be found: {installation_id}")]
    InstallationNotFound { installation_id: String },

    /// The provider failed to produce a token.
    #[error("credential provider error: {0}")]
    Provider(String),
}

/// Resolves an installation to a valid, non-expired bearer credential.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, CredentialError>;
}

/// A provider wrapping a fixed token. Suitable for tests and for tooling
/// that already holds a minted installation token.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<AccessToken, CredentialError> {
        Ok(AccessToken::new(self.token.clone(), None))
    }
}
