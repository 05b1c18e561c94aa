use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Provider;
use crate::ports::fetch::FetchError;

/// Symbolic failure codes surfaced to callers of the import flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportErrorCode {
    #[serde(rename = "ERR_UNSUPPORTED_URL")]
    UnsupportedUrl,
    #[serde(rename = "ERR_PRIVATE_PLAYLIST")]
    PrivatePlaylist,
    #[serde(rename = "ERR_NOT_FOUND")]
    NotFound,
    #[serde(rename = "ERR_RATE_LIMITED")]
    RateLimited,
    #[serde(rename = "ERR_INVALID_RESPONSE")]
    InvalidResponse,
    #[serde(rename = "ERR_NETWORK")]
    Network,
    #[serde(rename = "ERR_EPISODE_UNAVAILABLE")]
    EpisodeUnavailable,
    #[serde(rename = "ERR_SHOW_EMPTY")]
    ShowEmpty,
    #[serde(rename = "ERR_PODCAST_CONTENT")]
    PodcastContent,
    #[serde(rename = "ERR_ABORTED")]
    Aborted,
    #[serde(rename = "ERR_UNKNOWN")]
    Unknown,
}

impl ImportErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportErrorCode::UnsupportedUrl => "ERR_UNSUPPORTED_URL",
            ImportErrorCode::PrivatePlaylist => "ERR_PRIVATE_PLAYLIST",
            ImportErrorCode::NotFound => "ERR_NOT_FOUND",
            ImportErrorCode::RateLimited => "ERR_RATE_LIMITED",
            ImportErrorCode::InvalidResponse => "ERR_INVALID_RESPONSE",
            ImportErrorCode::Network => "ERR_NETWORK",
            ImportErrorCode::EpisodeUnavailable => "ERR_EPISODE_UNAVAILABLE",
            ImportErrorCode::ShowEmpty => "ERR_SHOW_EMPTY",
            ImportErrorCode::PodcastContent => "ERR_PODCAST_CONTENT",
            ImportErrorCode::Aborted => "ERR_ABORTED",
            ImportErrorCode::Unknown => "ERR_UNKNOWN",
        }
    }

    /// Maps an upstream HTTP status onto the taxonomy.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ImportErrorCode::PrivatePlaylist,
            404 => ImportErrorCode::NotFound,
            429 => ImportErrorCode::RateLimited,
            500..=599 => ImportErrorCode::Network,
            _ => ImportErrorCode::Unknown,
        }
    }
}

impl fmt::Display for ImportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of an import was running when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Detect,
    Cursor,
    Token,
    Metadata,
    Tracks,
    Episodes,
    Episode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ImportError {
    pub code: ImportErrorCode,
    pub message: String,
    #[serde(default)]
    pub details: ErrorDetails,
}

impl ImportError {
    pub fn new(code: ImportErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: ErrorDetails::default(),
        }
    }

    pub fn aborted() -> Self {
        Self::new(ImportErrorCode::Aborted, "Import was cancelled")
    }

    pub fn unsupported_url(input: &str) -> Self {
        Self::new(
            ImportErrorCode::UnsupportedUrl,
            format!("Unsupported playlist link: {input}"),
        )
        .with_stage(Stage::Detect)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ImportErrorCode::InvalidResponse, message)
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.details.stage = Some(stage);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.details.status = Some(status);
        self
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.details.provider = Some(provider);
        self
    }

    pub fn is_aborted(&self) -> bool {
        self.code == ImportErrorCode::Aborted
    }

    /// True for an upstream 401, which earns one credential refresh.
    pub fn is_unauthorized(&self) -> bool {
        self.code == ImportErrorCode::PrivatePlaylist && self.details.status == Some(401)
    }

    /// Classifies a transport failure from an upstream call.
    pub fn from_fetch(error: FetchError, stage: Stage) -> Self {
        let error = match error {
            FetchError::Aborted => Self::aborted(),
            FetchError::Status { status, body } => Self::new(
                ImportErrorCode::from_status(status),
                status_message(
                    format!("Upstream request failed with HTTP {status}"),
                    body.as_ref(),
                ),
            )
            .with_status(status),
            FetchError::Transport(reason) => Self::new(ImportErrorCode::Network, reason),
            FetchError::Decode(reason) => Self::invalid_response(reason),
        };
        error.with_stage(stage)
    }
}

/// Appends the upstream's own explanation, when its error body carries one.
pub(crate) fn status_message(summary: String, body: Option<&Value>) -> String {
    let detail = body.and_then(|body| {
        ["/error/message", "/error_description", "/error", "/message"]
            .into_iter()
            .filter_map(|pointer| body.pointer(pointer)?.as_str())
            .map(str::trim)
            .find(|detail| !detail.is_empty())
    });
    match detail {
        Some(detail) => format!("{summary}: {detail}"),
        None => summary,
    }
}

/// Returned by the import flow when the caller's own token cancelled the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("import was cancelled")]
pub struct Cancelled;
