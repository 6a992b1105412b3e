#![cfg(unix)]

use std::path::Path;

use funcpack_cloud::client::{DeployClient, RemoteError};
use funcpack_cloud::executor::{CommandExecutor, DeployExecutor, ExecutorError};
use funcpack_cloud::token::{TokenError, TokenSource};
use funcpack_cloud::DeployEvent;
use secrecy::SecretString;

struct Fixed;

impl TokenSource for Fixed {
    async fn acquire(&self) -> Result<SecretString, TokenError> {
        Ok(SecretString::from("s3cret".to_owned()))
    }
}

/// `sh -c <script> sh <dir>`: the output directory arrives as `$1`.
fn script(body: &str) -> CommandExecutor {
    CommandExecutor::new(vec![
        "sh".to_owned(),
        "-c".to_owned(),
        body.to_owned(),
        "sh".to_owned(),
    ])
}

#[tokio::test]
async fn command_receives_dir_and_token_and_emits_events() {
    let executor = script(
        r#"echo "Uploading $1"; echo '{"type":"building"}'; printf '{"type":"ready","id":"%s","url":"https://x.example.app"}\n' "$FUNCPACK_TOKEN""#,
    );

    let mut events = executor
        .open(Path::new("/tmp/out"), &SecretString::from("s3cret".to_owned()))
        .await
        .unwrap();

    assert_eq!(
        events.recv().await,
        Some(DeployEvent::Progress {
            kind: "building".to_owned()
        })
    );
    assert_eq!(
        events.recv().await,
        Some(DeployEvent::Ready {
            id: "s3cret".to_owned(),
            url: "https://x.example.app".to_owned(),
        })
    );
    assert_eq!(events.recv().await, None);
}

#[tokio::test]
async fn non_zero_exit_becomes_error_event() {
    let client = DeployClient::new(script("echo '{\"type\":\"uploading\"}'; exit 3"), Fixed, 10);

    let result = client.deploy(Path::new("/tmp/out")).await;

    match result {
        Err(RemoteError::Failed { message }) => assert!(message.contains("exit")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn clean_exit_without_ready_is_unexpected_end() {
    let client = DeployClient::new(script("echo '{\"type\":\"uploading\"}'"), Fixed, 10);

    let result = client.deploy(Path::new("/tmp/out")).await;

    assert!(matches!(result, Err(RemoteError::UnexpectedEnd)));
}

#[tokio::test]
async fn missing_program_and_empty_command() {
    let token = SecretString::from("t".to_owned());

    let missing = CommandExecutor::new(vec!["funcpack-no-such-deployer".to_owned()]);
    assert!(matches!(
        missing.open(Path::new("/tmp"), &token).await,
        Err(ExecutorError::Spawn { .. })
    ));

    let empty = CommandExecutor::new(Vec::new());
    assert!(matches!(
        empty.open(Path::new("/tmp"), &token).await,
        Err(ExecutorError::EmptyCommand)
    ));
}
