//! CLI configuration: environment (and `.env`), then command-line overrides.

use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_STORE_PATH: &str = "xorcoin.store";
const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

#[derive(Clone)]
pub struct CliConfig {
    /// File-backed container store
    pub store_path: PathBuf,
    /// Bearer token for identity document writes
    pub identity_token: Option<String>,
    /// Identity document request timeout
    pub http_timeout_seconds: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store_path: DEFAULT_STORE_PATH.into(),
            identity_token: None,
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
        }
    }
}

impl CliConfig {
    /// Reads `XORCOIN_*` variables, loading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("XORCOIN_STORE").filter(|p| !p.trim().is_empty()) {
            config.store_path = path.into();
        }
        config.identity_token = lookup("XORCOIN_IDENTITY_TOKEN").filter(|t| !t.trim().is_empty());
        if let Some(timeout) = lookup("XORCOIN_HTTP_TIMEOUT") {
            config.http_timeout_seconds = timeout
                .trim()
                .parse()
                .with_context(|| format!("XORCOIN_HTTP_TIMEOUT is not a number of seconds: {:?}", timeout))?;
        }

        Ok(config)
    }

    pub fn with_store_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.store_path = path;
        }
        self
    }

    pub fn with_identity_token(mut self, token: Option<String>) -> Self {
        if token.is_some() {
            self.identity_token = token;
        }
        self
    }

    pub fn with_http_timeout(mut self, seconds: Option<u64>) -> Self {
        if let Some(seconds) = seconds {
            self.http_timeout_seconds = seconds;
        }
        self
    }
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("store_path", &self.store_path)
            .field("identity_token", &self.identity_token.as_ref().map(|_| "[REDACTED]"))
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .finish()
    }
}
