//! GitHub API error types and response classification.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::auth::CredentialError;
use crate::http::{HttpError, HttpResponse};

/// Errors that can occur when talking to the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The rate limit was exhausted (primary or secondary/abuse limiting).
    #[error("rate limit exceeded{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    /// The credential was rejected by the remote.
    #[error("authentication required")]
    AuthRequired,

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The installation credential could not be resolved.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Any other non-2xx response.
    #[error("GitHub API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The transport failed before a response was produced.
    #[error(transparent)]
    Transport(#[from] HttpError),

    /// A response could not be decoded.
    #[error("malformed response body: {0}")]
    MalformedResponse(String),
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(", resets at {at}"),
        None => String::new(),
    }
}

impl GitHubError {
    #[inline]
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Whether a response signals rate limiting.
///
/// 429 is unambiguous. GitHub reports secondary (abuse) limiting as a 403
/// whose body message mentions the rate limit, so a plain permission 403 on
/// one repository is not mistaken for a batch-wide condition.
#[must_use]
pub fn is_rate_limit_response(status: u16, message: &str) -> bool {
    status == 429 || (status == 403 && message.to_ascii_lowercase().contains("rate limit"))
}

/// Pull the `message` field out of a GitHub error body, if there is one.
#[must_use]
pub fn response_message(body: &[u8]) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        message: Option<String>,
    }

    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_default()
}

/// When the rate limit resets, from the `x-ratelimit-reset` epoch header.
#[must_use]
pub fn rate_limit_reset(response: &HttpResponse) -> Option<DateTime<Utc>> {
    response
        .header("x-ratelimit-reset")
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
}

/// Classify a non-2xx response into a [`GitHubError`].
///
/// `resource` names what was being fetched, for the not-found message.
#[must_use]
pub fn classify_response(response: &HttpResponse, resource: &str) -> GitHubError {
    let message = response_message(&response.body);

    if is_rate_limit_response(response.status, &message) {
        return GitHubError::RateLimited {
            reset_at: rate_limit_reset(response),
        };
    }

    match response.status {
        401 | 403 => GitHubError::AuthRequired,
        404 => GitHubError::NotFound(resource.to_string()),
        status => GitHubError::Api { status, message },
    }
}

/// A user-facing message for an error, with remediation hints where the
/// status has a well-known cause.
#[must_use]
pub fn message_from_error(error: &GitHubError) -> String {
    match error {
        GitHubError::NotFound(_) => {
            "Error Communicating with GitHub (HTTP 404): The repository or resource does not \
             exist, or the installation does not have access to it."
                .to_string()
        }
        GitHubError::AuthRequired => {
            "Error Communicating with GitHub (HTTP 401): The credential was rejected. \
             Reinstalling the app may be required."
                .to_string()
        }
        GitHubError::RateLimited { .. } => {
            "Error Communicating with GitHub: the API rate limit was exceeded. Further requests \
             will succeed once the limit resets."
                .to_string()
        }
        GitHubError::Credential(CredentialError::InstallationNotFound { .. }) => {
            "The GitHub installation could not be found.".to_string()
        }
        GitHubError::Api { status, message } if !message.is_empty() => {
            format!("Error Communicating with GitHub (HTTP {status}): {message}")
        }
        other => format!("Error Communicating with GitHub: {other}"),
    }
}
