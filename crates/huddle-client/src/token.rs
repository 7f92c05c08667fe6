//! Token endpoint client.
//!
//! Exchanges a room name and identity for a join token:
//! `GET {endpoint}/api/get-participant-token?room=<room>&username=<identity>`
//! answered by `{"token": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use huddle_core::{Credential, Identity};
use reqwest::{
    Client,
    header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA},
};
use serde::Deserialize;

use crate::error::{CredentialError, check_response};

/// Path appended to the configured endpoint.
pub const TOKEN_PATH: &str = "/api/get-participant-token";

/// Issues join credentials.
#[async_trait]
pub trait TokenIssuer: Send + Sync + 'static {
    /// Fetch a credential for `identity` in `room`.
    async fn issue(&self, room: &str, identity: &Identity) -> Result<Credential, CredentialError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

/// [`TokenIssuer`] backed by the HTTP token endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenIssuer {
    endpoint: String,
    client: Client,
}

impl HttpTokenIssuer {
    /// Create an issuer for `endpoint` (scheme, host and optional port).
    ///
    /// Redirects are not followed and responses are never served from cache.
    ///
    /// # Errors
    ///
    /// `CredentialError::Network` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, CredentialError> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(headers)
            .build()?;

        Ok(Self { endpoint: endpoint.into().trim_end_matches('/').to_string(), client })
    }

    /// Base endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TokenIssuer for HttpTokenIssuer {
    async fn issue(&self, room: &str, identity: &Identity) -> Result<Credential, CredentialError> {
        let url = format!("{}{TOKEN_PATH}", self.endpoint);
        let username = identity.rendered();
        tracing::debug!("requesting token for {} in {}", username, room);

        let resp = self.client.get(&url).query(&[("room", room), ("username", username.as_str())]).send().await?;
        let body = check_response(resp)?.bytes().await?;
        let parsed: TokenResponse = serde_json::from_slice(&body)?;

        match parsed.token {
            Some(token) if !token.is_empty() => Ok(Credential::new(token)),
            _ => Err(CredentialError::MissingToken),
        }
    }
}
