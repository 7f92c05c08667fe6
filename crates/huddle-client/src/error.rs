//! Client error types.

use thiserror::Error;

/// Errors from the token endpoint.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Request never got a response.
    #[error("network error: {0}")]
    Network(String),

    /// Endpoint answered with a non-success status.
    #[error("HTTP error {status} for {url}")]
    Http {
        /// Response status.
        status: reqwest::StatusCode,
        /// Requested URL.
        url: String,
    },

    /// Body was not the expected JSON.
    #[error("parse error: {0}")]
    Parse(String),

    /// Body parsed but carried no usable token.
    #[error("response has no token")]
    MissingToken,
}

/// Check HTTP response status before processing body.
pub fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, CredentialError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(CredentialError::Http { status, url: resp.url().to_string() });
    }
    Ok(resp)
}

impl From<reqwest::Error> for CredentialError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for CredentialError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Errors reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required environment variable {var}")]
    Missing {
        /// Variable name.
        var: &'static str,
    },

    /// A variable is set to something unusable.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),
}

/// Errors reported by a media transport.
#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// Errors that stop the session driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The controller reported a driver bug.
    #[error("session error: {0}")]
    Session(#[from] huddle_core::SessionError),

    /// Startup configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Building the HTTP client failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}
