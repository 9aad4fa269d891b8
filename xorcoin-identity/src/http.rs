//! HTTP client for identity documents.
//!
//! Documents are JSON bodies served at their URL. Reads are plain GETs;
//! commits are PUTs carrying a bearer token once one has been obtained.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use xorcoin_core::error::{CoinError, Result};
use xorcoin_core::traits::{Authorizer, IdentityDocuments};
use xorcoin_core::types::IdentityDocument;

use crate::resolver::document_url;

/// HTTP identity document client configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct HttpDocumentsConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Bearer token sent with commits from the start
    pub bearer_token: Option<String>,
    /// User agent header
    pub user_agent: String,
}

impl Default for HttpDocumentsConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            bearer_token: None,
            user_agent: concat!("xorcoin/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl HttpDocumentsConfig {
    /// Sets the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the initial bearer token.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

impl std::fmt::Debug for HttpDocumentsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDocumentsConfig")
            .field("timeout_seconds", &self.timeout_seconds)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[REDACTED]"))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Shared holder of the bearer token used for commits.
///
/// The client reads it on every commit; an authorizer fills it in.
#[derive(Clone, Default)]
pub struct TokenSlot(Arc<RwLock<Option<String>>>);

impl TokenSlot {
    /// Stores a token.
    pub fn set(&self, token: impl Into<String>) {
        *self.0.write() = Some(token.into());
    }

    /// Returns the current token.
    pub fn get(&self) -> Option<String> {
        self.0.read().clone()
    }

    /// Forgets the token.
    pub fn clear(&self) {
        *self.0.write() = None;
    }
}

impl std::fmt::Debug for TokenSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.0.read().is_some() { "[REDACTED]" } else { "empty" };
        write!(f, "TokenSlot({})", state)
    }
}

/// Identity documents over HTTP.
pub struct HttpDocuments {
    config: HttpDocumentsConfig,
    http_client: reqwest::Client,
    token: TokenSlot,
}

impl HttpDocuments {
    /// Creates a client with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(HttpDocumentsConfig::default())
    }

    /// Creates a client with custom configuration.
    pub fn with_config(config: HttpDocumentsConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| CoinError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        let token = TokenSlot::default();
        if let Some(initial) = &config.bearer_token {
            token.set(initial.clone());
        }

        Ok(Self {
            config,
            http_client,
            token,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HttpDocumentsConfig {
        &self.config
    }

    /// Returns the token slot commits read from.
    pub fn token_slot(&self) -> TokenSlot {
        self.token.clone()
    }
}

fn transport_error(url: &Url, e: reqwest::Error) -> CoinError {
    if e.is_timeout() {
        CoinError::ConnectionTimeout(format!("{}: {}", url, e))
    } else if e.is_connect() || e.is_request() {
        CoinError::Unreachable {
            url: url.to_string(),
            reason: e.to_string(),
        }
    } else {
        CoinError::HttpError(e.to_string())
    }
}

fn status_error(url: &Url, status: StatusCode) -> CoinError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CoinError::PermissionDenied(format!("{} answered {}", url, status))
        }
        StatusCode::NOT_FOUND => CoinError::NotFound(format!("identity document {}", url)),
        _ => CoinError::HttpError(format!("{} answered {}", url, status)),
    }
}

#[async_trait]
impl IdentityDocuments for HttpDocuments {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<IdentityDocument> {
        let target = document_url(url);

        let response = self
            .http_client
            .get(target.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error(&target, e))?;

        if !response.status().is_success() {
            return Err(status_error(&target, response.status()));
        }

        let body = response.bytes().await.map_err(|e| transport_error(&target, e))?;
        let document: IdentityDocument = serde_json::from_slice(&body)?;

        debug!(subjects = document.graph.len(), "Fetched identity document");
        Ok(document)
    }

    #[instrument(skip(self, document), fields(url = %url))]
    async fn commit(&self, url: &Url, document: &IdentityDocument) -> Result<()> {
        let target = document_url(url);

        let mut request = self.http_client.put(target.clone()).json(document);
        if let Some(token) = self.token.get() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| transport_error(&target, e))?;

        if !response.status().is_success() {
            return Err(status_error(&target, response.status()));
        }

        info!("Committed identity document");
        Ok(())
    }
}

/// Authorizer that installs a pre-issued token into an [`HttpDocuments`] client.
///
/// Stands in for an interactive exchange when the token is already known,
/// e.g. from `XORCOIN_IDENTITY_TOKEN`.
#[derive(Debug)]
pub struct StaticTokenAuthorizer {
    slot: TokenSlot,
    token: String,
}

impl StaticTokenAuthorizer {
    /// Creates an authorizer filling `slot` with `token`.
    pub fn new(slot: TokenSlot, token: impl Into<String>) -> Self {
        Self {
            slot,
            token: token.into(),
        }
    }
}

#[async_trait]
impl Authorizer for StaticTokenAuthorizer {
    async fn authorize_write(&self, url: &Url) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(CoinError::ConfigError("identity token is empty".into()));
        }
        self.slot.set(self.token.clone());
        debug!(url = %url, "Installed identity token");
        Ok(())
    }
}
