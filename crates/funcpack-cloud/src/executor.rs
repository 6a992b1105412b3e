use std::path::Path;
use std::process::Stdio;

use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::event::DeployEvent;

/// Environment variable carrying the bearer token to the deploy command.
pub const TOKEN_ENV: &str = "FUNCPACK_TOKEN";

const EVENT_BUFFER: usize = 32;

/// Abstraction over the platform upload for testability.
///
/// Production code uses [`CommandExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait DeployExecutor: Send + Sync {
    /// Start deploying `dir` and return its event sequence.
    ///
    /// The receiver closes when the remote side stops sending events.
    async fn open(
        &self,
        dir: &Path,
        token: &SecretString,
    ) -> Result<mpsc::Receiver<DeployEvent>, ExecutorError>;
}

/// Runs the configured platform CLI with the output directory as its last
/// argument and reads JSON event lines from its stdout.
pub struct CommandExecutor {
    command: Vec<String>,
}

impl CommandExecutor {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl DeployExecutor for CommandExecutor {
    async fn open(
        &self,
        dir: &Path,
        token: &SecretString,
    ) -> Result<mpsc::Receiver<DeployEvent>, ExecutorError> {
        let (program, args) = self.command.split_first().ok_or(ExecutorError::EmptyCommand)?;

        tracing::info!(program = %program, dir = %dir.display(), "starting deploy command");
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .arg(dir)
            .env(TOKEN_ENV, token.expose_secret())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutorError::Spawn {
                program: program.clone(),
                source: e,
            })?;

        let stdout = child.stdout.take().ok_or(ExecutorError::NoStdout)?;
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let program = program.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(program = %program, error = %e, "deploy output unreadable");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let event = match DeployEvent::parse(&line) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(target: "funcpack::tool", error = %e, "{line}");
                        continue;
                    }
                };
                if tx.send(event).await.is_err() {
                    tracing::debug!("deploy event receiver closed");
                    return;
                }
            }

            match child.wait().await {
                Ok(status) if status.success() => {
                    tracing::debug!(program = %program, "deploy command exited");
                }
                Ok(status) => {
                    let event = DeployEvent::Error {
                        message: format!("`{program}` exited with {status}"),
                    };
                    if tx.send(event).await.is_err() {
                        tracing::debug!("deploy event receiver closed");
                    }
                }
                Err(e) => tracing::warn!(program = %program, error = %e, "failed to wait for deploy command"),
            }
        });

        Ok(rx)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("deploy command is empty; set [deploy] command in funcpack.toml")]
    EmptyCommand,

    #[error("deploy command `{program}` could not be started")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("deploy command stdout was not captured")]
    NoStdout,
}
