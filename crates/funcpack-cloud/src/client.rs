use std::path::Path;

use funcpack_core::DeployConfig;
use tokio::sync::Mutex;

use crate::event::DeployEvent;
use crate::executor::{CommandExecutor, DeployExecutor, ExecutorError};
use crate::token::{ConfiguredTokenSource, TokenCache, TokenError, TokenSource};

/// A live deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub id: String,
    pub url: String,
}

/// Deploys build output directories, parameterized over the executor and
/// token source for testability.
pub struct DeployClient<E: DeployExecutor = CommandExecutor, S: TokenSource = ConfiguredTokenSource>
{
    executor: E,
    tokens: S,
    cache: Mutex<TokenCache>,
}

impl DeployClient<CommandExecutor, ConfiguredTokenSource> {
    pub fn from_config(config: &DeployConfig) -> Self {
        Self::new(
            CommandExecutor::new(config.command.clone()),
            ConfiguredTokenSource::from_config(config),
            config.token_reuse_limit,
        )
    }
}

impl<E: DeployExecutor, S: TokenSource> DeployClient<E, S> {
    pub fn new(executor: E, tokens: S, token_reuse_limit: u32) -> Self {
        Self {
            executor,
            tokens,
            cache: Mutex::new(TokenCache::new(token_reuse_limit)),
        }
    }

    /// Deploy `dir` and wait for the first terminal event.
    ///
    /// Progress events are logged. The event stream ending without `ready`
    /// or `error` is [`RemoteError::UnexpectedEnd`].
    pub async fn deploy(&self, dir: &Path) -> Result<Deployment, RemoteError> {
        let token = self.cache.lock().await.get(&self.tokens).await?;
        let mut events = self.executor.open(dir, &token).await?;

        while let Some(event) = events.recv().await {
            match event {
                DeployEvent::Ready { id, url } => {
                    tracing::info!(id = %id, url = %url, "deployment ready");
                    return Ok(Deployment { id, url });
                }
                DeployEvent::Error { message } => {
                    tracing::error!(message = %message, "deployment failed");
                    return Err(RemoteError::Failed { message });
                }
                DeployEvent::Progress { kind } => {
                    tracing::info!(event = %kind, "deploy progress");
                }
            }
        }

        Err(RemoteError::UnexpectedEnd)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("deployment failed: {message}")]
    Failed { message: String },

    #[error("deploy event stream ended before the deployment was ready")]
    UnexpectedEnd,

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Token(#[from] TokenError),
}
