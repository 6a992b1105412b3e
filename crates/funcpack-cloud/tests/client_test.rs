use std::path::{Path, PathBuf};

use funcpack_cloud::client::{DeployClient, Deployment, RemoteError};
use funcpack_cloud::event::DeployEvent;
use funcpack_cloud::executor::{DeployExecutor, ExecutorError};
use funcpack_cloud::token::{ConfiguredTokenSource, TokenError, TokenSource};
use funcpack_core::DeployConfig;
use mockall::mock;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;

mock! {
    Executor {}

    impl DeployExecutor for Executor {
        async fn open(
            &self,
            dir: &Path,
            token: &SecretString,
        ) -> Result<mpsc::Receiver<DeployEvent>, ExecutorError>;
    }
}

mock! {
    Tokens {}

    impl TokenSource for Tokens {
        async fn acquire(&self) -> Result<SecretString, TokenError>;
    }
}

fn stream(events: Vec<DeployEvent>) -> mpsc::Receiver<DeployEvent> {
    let (tx, rx) = mpsc::channel(events.len().max(1));
    for event in events {
        tx.try_send(event).unwrap();
    }
    rx
}

fn tokens(times: usize) -> MockTokens {
    let mut mock = MockTokens::new();
    let mut n = 0;
    mock.expect_acquire().times(times).returning(move || {
        n += 1;
        Ok(SecretString::from(format!("tok-{n}")))
    });
    mock
}

fn progress(kind: &str) -> DeployEvent {
    DeployEvent::Progress {
        kind: kind.to_owned(),
    }
}

// ── Event stream ──

#[tokio::test]
async fn deploy_returns_ready_deployment() {
    let mut executor = MockExecutor::new();
    executor
        .expect_open()
        .withf(|dir, token| dir == Path::new("/out") && token.expose_secret() == "tok-1")
        .times(1)
        .returning(|_, _| {
            Ok(stream(vec![
                progress("uploading"),
                progress("building"),
                DeployEvent::Ready {
                    id: "dpl_42".to_owned(),
                    url: "https://site-42.example.app".to_owned(),
                },
            ]))
        });

    let client = DeployClient::new(executor, tokens(1), 10);
    let deployment = client.deploy(Path::new("/out")).await.unwrap();

    assert_eq!(
        deployment,
        Deployment {
            id: "dpl_42".to_owned(),
            url: "https://site-42.example.app".to_owned(),
        }
    );
}

#[tokio::test]
async fn error_event_fails_the_deploy() {
    let mut executor = MockExecutor::new();
    executor.expect_open().returning(|_, _| {
        Ok(stream(vec![
            progress("building"),
            DeployEvent::Error {
                message: "function exceeds size limit".to_owned(),
            },
            DeployEvent::Ready {
                id: "late".to_owned(),
                url: "https://late.example.app".to_owned(),
            },
        ]))
    });

    let client = DeployClient::new(executor, tokens(1), 10);
    let result = client.deploy(Path::new("/out")).await;

    match result {
        Err(RemoteError::Failed { message }) => assert_eq!(message, "function exceeds size limit"),
        other => panic!("expected remote failure, got {other:?}"),
    }
}

#[tokio::test]
async fn stream_end_without_terminal_event_is_unexpected() {
    let mut executor = MockExecutor::new();
    executor
        .expect_open()
        .returning(|_, _| Ok(stream(vec![progress("uploading")])));

    let client = DeployClient::new(executor, tokens(1), 10);
    let result = client.deploy(Path::new("/out")).await;

    assert!(matches!(result, Err(RemoteError::UnexpectedEnd)));
}

#[tokio::test]
async fn executor_failure_is_surfaced() {
    let mut executor = MockExecutor::new();
    executor
        .expect_open()
        .returning(|_, _| Err(ExecutorError::EmptyCommand));

    let client = DeployClient::new(executor, tokens(1), 10);
    let result = client.deploy(Path::new("/out")).await;

    assert!(matches!(
        result,
        Err(RemoteError::Executor(ExecutorError::EmptyCommand))
    ));
}

// ── Token reuse ──

#[tokio::test]
async fn token_is_reacquired_every_limit_deploys() {
    let mut executor = MockExecutor::new();
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let record = seen.clone();
    executor.expect_open().times(5).returning(move |_, token| {
        record.lock().unwrap().push(token.expose_secret().to_owned());
        Ok(stream(vec![DeployEvent::Ready {
            id: "d".to_owned(),
            url: "https://d.example.app".to_owned(),
        }]))
    });

    let client = DeployClient::new(executor, tokens(3), 2);
    for _ in 0..5 {
        client.deploy(Path::new("/out")).await.unwrap();
    }

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["tok-1", "tok-1", "tok-2", "tok-2", "tok-3"]
    );
}

#[tokio::test]
async fn token_failure_stops_before_upload() {
    let mut executor = MockExecutor::new();
    executor.expect_open().never();
    let mut source = MockTokens::new();
    source.expect_acquire().returning(|| {
        Err(TokenError::Unavailable {
            tried: vec!["explicit token".to_owned()],
        })
    });

    let client = DeployClient::new(executor, source, 10);
    let result = client.deploy(Path::new("/out")).await;

    assert!(matches!(
        result,
        Err(RemoteError::Token(TokenError::Unavailable { .. }))
    ));
}

// ── Token sources ──

fn config(credentials: Option<PathBuf>) -> DeployConfig {
    DeployConfig {
        credentials_file: credentials,
        token_fetch_retries: 2,
        token_retry_delay_ms: 1,
        ..DeployConfig::default()
    }
}

#[tokio::test]
async fn explicit_token_wins() {
    let tmp = tempfile::TempDir::new().unwrap();
    let creds = tmp.path().join("auth.json");
    std::fs::write(&creds, r#"{"token":"from-file"}"#).unwrap();

    let source = ConfiguredTokenSource::from_config(&config(Some(creds)))
        .with_explicit(Some("from-flag".to_owned()));

    assert_eq!(source.acquire().await.unwrap().expose_secret(), "from-flag");
}

#[tokio::test]
async fn unreachable_endpoint_falls_back_to_credentials_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let creds = tmp.path().join("auth.json");
    std::fs::write(&creds, r#"{"token":"from-file"}"#).unwrap();

    let mut cfg = config(Some(creds));
    cfg.token_endpoint = Some("http://127.0.0.1:9/token".to_owned());
    let source = ConfiguredTokenSource::from_config(&cfg);

    assert_eq!(source.acquire().await.unwrap().expose_secret(), "from-file");
}

#[tokio::test]
async fn no_source_yields_unavailable() {
    let tmp = tempfile::TempDir::new().unwrap();
    let source = ConfiguredTokenSource::from_config(&config(Some(tmp.path().join("absent.json"))));

    match source.acquire().await {
        Err(TokenError::Unavailable { tried }) => {
            assert_eq!(tried.len(), 2);
            assert!(tried[1].contains("absent.json"));
        }
        other => panic!("expected unavailable, got {:?}", other.map(|_| ())),
    }
}
