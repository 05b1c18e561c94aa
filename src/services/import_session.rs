use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::{AdapterRegistry, ImportRequest};
use crate::detect::{DetectOptions, detect_provider};
use crate::error::{ImportError, ImportErrorCode};
use crate::models::{
    ImportMeta, ImportPage, ImportSnapshot, NormalizedTrack, PageInfo, Provider,
};
use crate::services::demo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Merge {
    Replace,
    Append,
}

struct InFlight {
    generation: u64,
    cancel: CancellationToken,
}

/// Where the next page comes from.
#[derive(Debug, Clone)]
struct ResumePoint {
    provider: Provider,
    url: String,
}

#[derive(Default)]
struct SessionState {
    generation: u64,
    in_flight: Option<InFlight>,
    tracks: Vec<NormalizedTrack>,
    seen: HashSet<String>,
    meta: Option<ImportMeta>,
    resume: Option<ResumePoint>,
    page_info: PageInfo,
    title: Option<String>,
    cover_url: Option<String>,
    total: Option<u32>,
    imported_at: Option<DateTime<Utc>>,
    error_code: Option<ImportErrorCode>,
    fallback: bool,
}

impl SessionState {
    fn snapshot(&self) -> ImportSnapshot {
        ImportSnapshot {
            tracks: self.tracks.clone(),
            meta: self.meta.clone(),
            title: self.title.clone(),
            imported_at: self.imported_at,
            cover_url: self.cover_url.clone(),
            total: self.total,
            error_code: self.error_code,
            fallback: self.fallback,
        }
    }

    /// Cancels whatever is running and starts a new generation.
    fn supersede(&mut self) -> u64 {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel.cancel();
        }
        self.generation += 1;
        self.generation
    }
}

/// Releases the busy flag when an operation finishes or its future is dropped.
struct OperationGuard<'a> {
    state: &'a Mutex<SessionState>,
    generation: u64,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == self.generation)
        {
            state.in_flight = None;
        }
    }
}

/// Accumulates the pages of one playlist import.
pub struct ImportSession {
    adapters: Arc<AdapterRegistry>,
    detect: DetectOptions,
    state: Mutex<SessionState>,
}

impl ImportSession {
    pub fn new(adapters: Arc<AdapterRegistry>, detect: DetectOptions) -> Self {
        Self {
            adapters,
            detect,
            state: Mutex::new(SessionState::default()),
        }
    }

    fn begin(
        &self,
        state: &mut SessionState,
        cancel: &CancellationToken,
    ) -> (OperationGuard<'_>, CancellationToken) {
        let generation = state.supersede();
        let operation = cancel.child_token();
        state.in_flight = Some(InFlight {
            generation,
            cancel: operation.clone(),
        });
        (
            OperationGuard {
                state: &self.state,
                generation,
            },
            operation,
        )
    }

    /// Imports the first page of `url`, replacing whatever the session held.
    ///
    /// Any operation already running is cancelled. Provider failures other
    /// than cancellation are answered with the demo dataset.
    pub async fn import_playlist(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ImportSnapshot, ImportError> {
        let url = url.trim();
        let (guard, operation) = {
            let mut state = self.state.lock();
            self.begin(&mut state, cancel)
        };

        let Some(detection) = detect_provider(url, &self.detect) else {
            return Err(ImportError::unsupported_url(url));
        };
        let provider = detection.provider;
        debug!("Importing {} playlist {}", provider, detection.id);

        let request = ImportRequest::first_page(url, operation.clone());
        let page = match self.adapters.import_page(provider, &request).await {
            Ok(page) => page,
            Err(error) if error.is_aborted() || operation.is_cancelled() => {
                return Err(ImportError::aborted());
            }
            Err(error) => {
                warn!(
                    "Import of {} failed with {}, serving demo data: {}",
                    url, error.code, error.message
                );
                demo::fallback_page(provider, url, &error)
            }
        };

        let snapshot =
            self.apply(guard.generation, &operation, provider, url, page, Merge::Replace)?;
        info!(
            "Imported {} tracks from {} ({})",
            snapshot.tracks.len(),
            provider,
            snapshot.title.as_deref().unwrap_or_default()
        );
        Ok(snapshot)
    }

    /// Appends the next page of the current playlist.
    ///
    /// Returns `Ok(None)` when there is nothing further to fetch or another
    /// operation is still running.
    pub async fn import_next(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<ImportSnapshot>, ImportError> {
        let (guard, operation, resume, cursor) = {
            let mut state = self.state.lock();
            if state.in_flight.is_some() {
                debug!("Load more ignored, an import is still running");
                return Ok(None);
            }
            let (Some(resume), Some(cursor)) = (state.resume.clone(), state.page_info.cursor())
            else {
                return Ok(None);
            };
            let cursor = cursor.to_string();
            let (guard, operation) = self.begin(&mut state, cancel);
            (guard, operation, resume, cursor)
        };

        debug!("Loading next {} page at {}", resume.provider, cursor);
        let request = ImportRequest::next_page(Some(resume.url.clone()), cursor, operation.clone());
        let page = self
            .adapters
            .import_page(resume.provider, &request)
            .await
            .map_err(|error| {
                if operation.is_cancelled() {
                    ImportError::aborted()
                } else {
                    error
                }
            })?;

        self.apply(
            guard.generation,
            &operation,
            resume.provider,
            &resume.url,
            page,
            Merge::Append,
        )
        .map(Some)
    }

    fn apply(
        &self,
        generation: u64,
        cancel: &CancellationToken,
        provider: Provider,
        url: &str,
        page: ImportPage,
        merge: Merge,
    ) -> Result<ImportSnapshot, ImportError> {
        let mut state = self.state.lock();
        if cancel.is_cancelled() || state.generation != generation {
            return Err(ImportError::aborted());
        }

        let meta = ImportMeta::from_page(&page);
        if merge == Merge::Replace {
            state.tracks.clear();
            state.seen.clear();
            state.cover_url = None;
            state.total = None;
            state.imported_at = Some(Utc::now());
        }

        let before = state.tracks.len();
        let SessionState { tracks, seen, .. } = &mut *state;
        for track in page.tracks {
            if seen.insert(track.dedup_key()) {
                tracks.push(track);
            }
        }
        debug!(
            "Merged {} new tracks ({} total)",
            state.tracks.len() - before,
            state.tracks.len()
        );

        state.meta = Some(meta);
        state.resume = Some(ResumePoint {
            provider,
            url: url.to_string(),
        });
        state.page_info = page.page_info;
        state.title = Some(page.title);
        state.cover_url = page.cover_url.or(state.cover_url.take());
        state.total = page.total.or(state.total);
        state.imported_at = state.imported_at.or(Some(Utc::now()));
        state.error_code = page.debug.error_code;
        state.fallback = page.debug.fallback;

        Ok(state.snapshot())
    }

    /// Cancels in-flight work and forgets the current playlist.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let generation = state.supersede();
        *state = SessionState {
            generation,
            ..Default::default()
        };
    }

    pub fn snapshot(&self) -> ImportSnapshot {
        self.state.lock().snapshot()
    }

    /// URL the current playlist was imported from.
    pub fn source_url(&self) -> Option<String> {
        self.state
            .lock()
            .resume
            .as_ref()
            .map(|resume| resume.url.clone())
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }
}
