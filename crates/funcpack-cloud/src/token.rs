//! Bearer token acquisition and reuse.

use std::path::{Path, PathBuf};
use std::time::Duration;

use funcpack_core::DeployConfig;
use secrecy::SecretString;
use serde::Deserialize;

/// Where tokens come from.
#[allow(async_fn_in_trait)]
pub trait TokenSource: Send + Sync {
    async fn acquire(&self) -> Result<SecretString, TokenError>;
}

/// Token reuse state owned by one deploy client.
///
/// A token is acquired on first use and reacquired once it has been handed
/// out `reuse_limit` times.
#[derive(Debug)]
pub struct TokenCache {
    token: Option<SecretString>,
    uses: u32,
    reuse_limit: u32,
}

impl TokenCache {
    pub fn new(reuse_limit: u32) -> Self {
        Self {
            token: None,
            uses: 0,
            reuse_limit: reuse_limit.max(1),
        }
    }

    pub async fn get<S: TokenSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<SecretString, TokenError> {
        let token = match &self.token {
            Some(token) if self.uses < self.reuse_limit => token.clone(),
            _ => {
                tracing::debug!(uses = self.uses, limit = self.reuse_limit, "acquiring deploy token");
                let token = source.acquire().await?;
                self.token = Some(token.clone());
                self.uses = 0;
                token
            }
        };
        self.uses += 1;
        Ok(token)
    }

    /// Drop the cached token so the next [`get`](Self::get) reacquires.
    pub fn invalidate(&mut self) {
        self.token = None;
        self.uses = 0;
    }

    pub fn uses(&self) -> u32 {
        self.uses
    }
}

#[derive(Deserialize)]
struct TokenBody {
    token: String,
}

/// Explicit token, then the token endpoint, then the credentials file.
pub struct ConfiguredTokenSource {
    explicit: Option<SecretString>,
    endpoint: Option<String>,
    credentials_file: Option<PathBuf>,
    retries: u32,
    retry_delay: Duration,
    http: reqwest::Client,
}

impl ConfiguredTokenSource {
    pub fn from_config(config: &DeployConfig) -> Self {
        Self {
            explicit: config.token.clone().map(SecretString::from),
            endpoint: config.token_endpoint.clone(),
            credentials_file: config.resolved_credentials_file(),
            retries: config.token_fetch_retries.max(1),
            retry_delay: Duration::from_millis(config.token_retry_delay_ms),
            http: reqwest::Client::new(),
        }
    }

    /// Override the explicit token (e.g. from a command-line flag).
    pub fn with_explicit(mut self, token: Option<String>) -> Self {
        if let Some(token) = token {
            self.explicit = Some(SecretString::from(token));
        }
        self
    }

    async fn fetch(&self, endpoint: &str) -> Result<SecretString, reqwest::Error> {
        let body: TokenBody = self
            .http
            .get(endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(SecretString::from(body.token))
    }

    /// Fixed number of attempts with a fixed delay in between.
    async fn fetch_with_retry(&self, endpoint: &str) -> Option<SecretString> {
        for attempt in 1..=self.retries {
            match self.fetch(endpoint).await {
                Ok(token) => {
                    tracing::info!(endpoint, attempt, "fetched deploy token");
                    return Some(token);
                }
                Err(e) => {
                    tracing::warn!(endpoint, attempt, retries = self.retries, error = %e, "token fetch failed");
                    if attempt < self.retries {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        None
    }
}

impl TokenSource for ConfiguredTokenSource {
    async fn acquire(&self) -> Result<SecretString, TokenError> {
        let mut tried = Vec::new();

        if let Some(token) = &self.explicit {
            tracing::debug!("using explicit deploy token");
            return Ok(token.clone());
        }
        tried.push("explicit token".to_owned());

        if let Some(endpoint) = &self.endpoint {
            if let Some(token) = self.fetch_with_retry(endpoint).await {
                return Ok(token);
            }
            tried.push(format!("endpoint {endpoint} ({} attempts)", self.retries));
        }

        if let Some(path) = &self.credentials_file {
            if let Some(token) = read_credentials(path)? {
                tracing::info!(path = %path.display(), "using deploy token from credentials file");
                return Ok(token);
            }
            tried.push(format!("credentials file {}", path.display()));
        }

        Err(TokenError::Unavailable { tried })
    }
}

/// `Ok(None)` when the file does not exist; a malformed file is an error.
pub fn read_credentials(path: &Path) -> Result<Option<SecretString>, TokenError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(TokenError::CredentialsRead {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let body: TokenBody =
        serde_json::from_str(&content).map_err(|e| TokenError::CredentialsFormat {
            path: path.to_path_buf(),
            source: e,
        })?;
    if body.token.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(SecretString::from(body.token)))
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("no deploy token available; tried {}", tried.join(", "))]
    Unavailable { tried: Vec<String> },

    #[error("failed to read credentials file {path}")]
    CredentialsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("credentials file {path} must contain {{\"token\": \"...\"}}")]
    CredentialsFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
}
