use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Cancelled, ImportError, ImportErrorCode};
use crate::models::ImportSnapshot;
use crate::services::import_session::ImportSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowStatus {
    #[default]
    Idle,
    Importing,
    Reimporting,
    LoadingMore,
}

/// Identifies one call; only the most recent ticket may touch visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum FlowResult {
    Ok { data: ImportSnapshot },
    Failed { code: ImportErrorCode, error: String },
    /// A newer call started before this one finished.
    Stale,
}

impl FlowResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, FlowResult::Ok { .. })
    }
}

impl Serialize for FlowResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FlowResult::Ok { data } => {
                let mut state = serializer.serialize_struct("FlowResult", 2)?;
                state.serialize_field("ok", &true)?;
                state.serialize_field("data", data)?;
                state.end()
            }
            FlowResult::Failed { code, error } => {
                let mut state = serializer.serialize_struct("FlowResult", 3)?;
                state.serialize_field("ok", &false)?;
                state.serialize_field("code", code)?;
                state.serialize_field("error", error)?;
                state.end()
            }
            FlowResult::Stale => {
                let mut state = serializer.serialize_struct("FlowResult", 2)?;
                state.serialize_field("ok", &false)?;
                state.serialize_field("stale", &true)?;
                state.end()
            }
        }
    }
}

#[derive(Default)]
struct FlowState {
    request_id: u64,
    status: FlowStatus,
    error_code: Option<ImportErrorCode>,
    data: Option<ImportSnapshot>,
}

/// Front door for UI-driven imports.
///
/// Every call takes a ticket from one shared counter; a result is only made
/// visible if its ticket is still the latest when it completes.
pub struct ImportFlow {
    session: Arc<ImportSession>,
    state: Mutex<FlowState>,
}

impl ImportFlow {
    pub fn new(session: Arc<ImportSession>) -> Self {
        Self {
            session,
            state: Mutex::new(FlowState::default()),
        }
    }

    fn take_ticket(&self, status: FlowStatus) -> RequestTicket {
        let mut state = self.state.lock();
        state.request_id += 1;
        state.status = status;
        RequestTicket(state.request_id)
    }

    pub async fn import_initial(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<FlowResult, Cancelled> {
        let ticket = self.take_ticket(FlowStatus::Importing);
        let result = self.session.import_playlist(url, cancel).await;
        self.complete(ticket, result)
    }

    /// Imports the session's current source again from the first page.
    pub async fn reimport(&self, cancel: &CancellationToken) -> Result<FlowResult, Cancelled> {
        let ticket = self.take_ticket(FlowStatus::Reimporting);
        let result = match self.session.source_url() {
            Some(url) => self.session.import_playlist(&url, cancel).await,
            None => Err(ImportError::new(
                ImportErrorCode::UnsupportedUrl,
                "Nothing has been imported yet",
            )),
        };
        self.complete(ticket, result)
    }

    /// Appends the next page. While another call is running this returns the
    /// current data without starting anything.
    pub async fn load_more(&self, cancel: &CancellationToken) -> Result<FlowResult, Cancelled> {
        let ticket = {
            let mut state = self.state.lock();
            if state.status != FlowStatus::Idle {
                debug!("Load more ignored while {:?}", state.status);
                return Ok(FlowResult::Ok {
                    data: self.session.snapshot(),
                });
            }
            state.request_id += 1;
            state.status = FlowStatus::LoadingMore;
            RequestTicket(state.request_id)
        };

        let result = self
            .session
            .import_next(cancel)
            .await
            .map(|snapshot| snapshot.unwrap_or_else(|| self.session.snapshot()));
        self.complete(ticket, result)
    }

    fn complete(
        &self,
        ticket: RequestTicket,
        result: Result<ImportSnapshot, ImportError>,
    ) -> Result<FlowResult, Cancelled> {
        let mut state = self.state.lock();
        if RequestTicket(state.request_id) != ticket {
            debug!("Discarding stale result for request {}", ticket.0);
            return Ok(FlowResult::Stale);
        }

        state.status = FlowStatus::Idle;
        match result {
            Ok(data) => {
                state.error_code = data.error_code;
                state.data = Some(data.clone());
                Ok(FlowResult::Ok { data })
            }
            Err(error) if error.is_aborted() => Err(Cancelled),
            Err(error) => {
                state.error_code = Some(error.code);
                Ok(FlowResult::Failed {
                    code: error.code,
                    error: error.message,
                })
            }
        }
    }

    pub fn status(&self) -> FlowStatus {
        self.state.lock().status
    }

    pub fn error_code(&self) -> Option<ImportErrorCode> {
        self.state.lock().error_code
    }

    pub fn data(&self) -> Option<ImportSnapshot> {
        self.state.lock().data.clone()
    }
}
