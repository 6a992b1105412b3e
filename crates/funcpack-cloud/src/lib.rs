pub mod client;
pub mod event;
pub mod executor;
pub mod token;

pub use client::{DeployClient, Deployment, RemoteError};
pub use event::DeployEvent;
pub use executor::{CommandExecutor, DeployExecutor, ExecutorError, TOKEN_ENV};
pub use token::{ConfiguredTokenSource, TokenCache, TokenError, TokenSource};
