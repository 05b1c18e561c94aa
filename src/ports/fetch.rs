use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Per-request options passed to a [`FetchClient`].
#[derive(Debug, Clone, Default)]
pub struct RequestInit {
    pub headers: Vec<(String, String)>,
    pub cancel: CancellationToken,
}

impl RequestInit {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            headers: Vec::new(),
            cancel,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("Request was cancelled")]
    Aborted,
    #[error("Request failed with HTTP {status}")]
    Status { status: u16, body: Option<Value> },
    #[error("Failed to send http request: {0}")]
    Transport(String),
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

/// Port trait for the JSON-over-HTTP transport used by provider adapters.
///
/// Implementations live in `services::fetch_client` (production) or test doubles.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FetchClient: Send + Sync {
    async fn get_json(&self, url: &str, init: RequestInit) -> Result<Value, FetchError>;
}
