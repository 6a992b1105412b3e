use serde::Deserialize;

/// One line of the platform's deploy event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployEvent {
    /// Deployment is live.
    Ready { id: String, url: String },
    /// Deployment failed remotely.
    Error { message: String },
    /// Anything else (`building`, `uploading`, ...); informational only.
    Progress { kind: String },
}

impl DeployEvent {
    /// Parse one JSON event line, e.g. `{"type":"ready","id":"dpl_1","url":"https://..."}`.
    pub fn parse(line: &str) -> Result<Self, EventParseError> {
        let raw: RawEvent = serde_json::from_str(line).map_err(|e| EventParseError::Json {
            line: line.to_owned(),
            source: e,
        })?;

        match raw.kind.as_str() {
            "ready" => {
                let url = raw.url.ok_or(EventParseError::MissingField {
                    kind: "ready",
                    field: "url",
                })?;
                Ok(Self::Ready {
                    id: raw.id.unwrap_or_default(),
                    url,
                })
            }
            "error" => Ok(Self::Error {
                message: raw
                    .message
                    .unwrap_or_else(|| "deployment failed without a message".to_owned()),
            }),
            _ => Ok(Self::Progress { kind: raw.kind }),
        }
    }

    /// `ready` and `error` end the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    id: Option<String>,
    url: Option<String>,
    message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EventParseError {
    #[error("deploy event is not valid JSON: {line}")]
    Json {
        line: String,
        source: serde_json::Error,
    },

    #[error("'{kind}' event has no '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}
