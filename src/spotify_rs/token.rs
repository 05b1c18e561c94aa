use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ImportError, ImportErrorCode, Stage, status_message};
use crate::ports::fetch::{FetchClient, FetchError, RequestInit};
use crate::spotify_rs::types::SpotifyTokenResponse;

/// Subtracted from a relative `expires_in` lifetime.
const EXPIRY_SAFETY_MARGIN: TimeDelta = TimeDelta::seconds(5);
/// A memo this close to expiry is treated as stale.
const REFRESH_BUFFER: TimeDelta = TimeDelta::seconds(30);
const DEFAULT_LIFETIME_SECS: i64 = 3600;
/// Numbers above this are epoch milliseconds rather than seconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// A bearer credential and the instant it stops being usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMemo {
    pub value: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenMemo {
    pub fn from_response(body: &Value, now: DateTime<Utc>) -> Result<Self, ImportError> {
        let response: SpotifyTokenResponse = serde_json::from_value(body.clone()).map_err(|e| {
            ImportError::invalid_response(format!("Malformed credential response: {e}"))
                .with_stage(Stage::Token)
        })?;

        let value = response
            .access_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ImportError::invalid_response("Credential response is missing access_token")
                    .with_stage(Stage::Token)
            })?;

        let token_type = response
            .token_type
            .map(|kind| kind.trim().to_string())
            .filter(|kind| !kind.is_empty())
            .unwrap_or_else(|| "Bearer".to_string());

        let expires_at = response
            .expires_at
            .as_ref()
            .and_then(parse_expires_at)
            .unwrap_or_else(|| {
                let lifetime = response
                    .expires_in
                    .as_ref()
                    .and_then(parse_seconds)
                    .unwrap_or(DEFAULT_LIFETIME_SECS);
                now + TimeDelta::seconds(lifetime) - EXPIRY_SAFETY_MARGIN
            });

        Ok(Self {
            value,
            token_type,
            expires_at,
        })
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + REFRESH_BUFFER < self.expires_at
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.value)
    }
}

fn parse_expires_at(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let n = n.as_f64()?;
            if !n.is_finite() || n <= 0.0 {
                return None;
            }
            if n < EPOCH_MILLIS_THRESHOLD {
                DateTime::from_timestamp(n as i64, 0)
            } else {
                DateTime::from_timestamp_millis(n as i64)
            }
        }
        _ => None,
    }
}

fn parse_seconds(value: &Value) -> Option<i64> {
    let seconds = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    // Lifetimes are capped at one day
    (seconds.is_finite() && seconds > 0.0).then_some(seconds.min(86_400.0) as i64)
}

type TokenFuture = Shared<BoxFuture<'static, Result<TokenMemo, ImportError>>>;

#[derive(Default)]
struct TokenState {
    memo: Option<TokenMemo>,
    in_flight: Option<TokenFuture>,
}

/// Memoizes the credential for one adapter and coalesces concurrent fetches.
#[derive(Clone)]
pub struct TokenCache {
    token_url: String,
    state: Arc<Mutex<TokenState>>,
}

impl TokenCache {
    pub fn new(token_url: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            state: Arc::new(Mutex::new(TokenState::default())),
        }
    }

    /// Returns a usable credential, fetching one if the memo is absent or stale.
    ///
    /// Every caller waiting at the same time shares a single request. A caller
    /// whose `cancel` fires stops waiting without cancelling that request.
    pub async fn acquire(
        &self,
        fetch: &Arc<dyn FetchClient>,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<TokenMemo, ImportError> {
        if cancel.is_cancelled() {
            return Err(ImportError::aborted().with_stage(Stage::Token));
        }

        let pending = {
            let mut state = self.state.lock();
            if force_refresh {
                state.memo = None;
            }
            if let Some(memo) = state.memo.as_ref().filter(|memo| memo.is_fresh(Utc::now())) {
                return Ok(memo.clone());
            }
            match &state.in_flight {
                Some(pending) => pending.clone(),
                None => {
                    let pending = self.start_fetch(Arc::clone(fetch));
                    state.in_flight = Some(pending.clone());
                    pending
                }
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(ImportError::aborted().with_stage(Stage::Token)),
            result = pending => result,
        }
    }

    /// Drops the memo so the next `acquire` fetches again.
    pub fn invalidate(&self) {
        self.state.lock().memo = None;
    }

    /// Runs the request on its own task so it finishes even when every
    /// waiter has gone away; the outcome lands in the memo either way.
    fn start_fetch(&self, fetch: Arc<dyn FetchClient>) -> TokenFuture {
        let state = Arc::clone(&self.state);
        let on_panic = Arc::clone(&self.state);
        let token_url = self.token_url.clone();
        let handle = tokio::spawn(async move {
            debug!("Requesting Spotify credential from {}", token_url);
            let result = request_token(fetch.as_ref(), &token_url).await;
            let mut state = state.lock();
            state.in_flight = None;
            state.memo = result.as_ref().ok().cloned();
            result
        });

        handle
            .map(move |joined| {
                joined.unwrap_or_else(|e| {
                    on_panic.lock().in_flight = None;
                    Err(ImportError::new(
                        ImportErrorCode::Network,
                        format!("Credential request task failed: {e}"),
                    )
                    .with_stage(Stage::Token))
                })
            })
            .boxed()
            .shared()
    }
}

async fn request_token(fetch: &dyn FetchClient, token_url: &str) -> Result<TokenMemo, ImportError> {
    let body = fetch
        .get_json(token_url, RequestInit::default())
        .await
        .map_err(|error| {
            let error = match error {
                FetchError::Aborted => ImportError::aborted(),
                FetchError::Status { status, body } => ImportError::new(
                    ImportErrorCode::Network,
                    status_message(
                        format!("Credential endpoint returned HTTP {status}"),
                        body.as_ref(),
                    ),
                )
                .with_status(status),
                FetchError::Transport(reason) => ImportError::new(ImportErrorCode::Network, reason),
                FetchError::Decode(reason) => ImportError::invalid_response(reason),
            };
            error.with_stage(Stage::Token)
        })?;

    TokenMemo::from_response(&body, Utc::now())
}
