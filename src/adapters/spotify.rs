use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapters::ImportRequest;
use crate::config::SpotifyConfig;
use crate::detect::{DetectOptions, Resource, detect_provider};
use crate::error::{ImportError, ImportErrorCode, Stage};
use crate::models::{DataSource, ImportDebug, ImportPage, PageInfo, Provider};
use crate::normalize::normalize_track;
use crate::ports::fetch::{FetchClient, RequestInit};
use crate::spotify_rs::client::{CursorTarget, SpotifyApi};
use crate::spotify_rs::token::{TokenCache, TokenMemo};
use crate::spotify_rs::types::{SpotifyPage, SpotifyPlaylist, SpotifyShow, first_image};

/// What a single request resolves to before anything is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Playlist { id: String, tracks_url: String },
    Show { id: String, episodes_url: String },
    Episode { id: String },
}

/// Live adapter for Spotify playlists, and shows/episodes when enabled.
pub struct SpotifyAdapter {
    fetch: Arc<dyn FetchClient>,
    api: SpotifyApi,
    tokens: TokenCache,
    page_limit: u32,
    episode_page_limit: u32,
    market: String,
    detect: DetectOptions,
}

impl SpotifyAdapter {
    pub fn new(
        fetch: Arc<dyn FetchClient>,
        config: &SpotifyConfig,
        token_url: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            fetch,
            api: SpotifyApi::new(&config.api_base_url)?,
            tokens: TokenCache::new(token_url),
            page_limit: config.page_limit.max(1),
            episode_page_limit: config.episode_page_limit.max(1),
            market: config.market.clone(),
            detect: DetectOptions {
                podcasts_enabled: config.podcasts_enabled,
            },
        })
    }

    pub async fn import_playlist(&self, request: &ImportRequest) -> Result<ImportPage, ImportError> {
        self.import(request)
            .await
            .map_err(|error| error.with_provider(Provider::Spotify))
    }

    async fn import(&self, request: &ImportRequest) -> Result<ImportPage, ImportError> {
        let target = self.resolve_target(request)?;
        let fetch = request
            .fetch_client
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.fetch));
        let cancel = &request.cancel;
        if cancel.is_cancelled() {
            return Err(ImportError::aborted());
        }

        let source_url = request
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| canonical_url(&target));

        let token = self.tokens.acquire(&fetch, false, cancel).await?;
        match self
            .fetch_target(&fetch, &target, &source_url, &token, cancel)
            .await
        {
            Err(error) if error.is_unauthorized() => {
                warn!(
                    "Spotify rejected the credential at stage {:?}, refreshing once",
                    error.details.stage
                );
                self.tokens.invalidate();
                let token = self.tokens.acquire(&fetch, true, cancel).await?;
                let mut page = self
                    .fetch_target(&fetch, &target, &source_url, &token, cancel)
                    .await?;
                page.debug.token_refreshed = true;
                Ok(page)
            }
            result => result,
        }
    }

    fn resolve_target(&self, request: &ImportRequest) -> Result<Target, ImportError> {
        if let Some(cursor) = request.cursor.as_deref() {
            return match self.api.resolve_cursor(cursor) {
                Some(CursorTarget::PlaylistTracks(id)) => Ok(Target::Playlist {
                    id,
                    tracks_url: cursor.trim().to_string(),
                }),
                Some(CursorTarget::ShowEpisodes(id)) if self.detect.podcasts_enabled => {
                    Ok(Target::Show {
                        id,
                        episodes_url: cursor.trim().to_string(),
                    })
                }
                _ => {
                    warn!("Refusing Spotify cursor outside the API: {}", cursor);
                    Err(
                        ImportError::invalid_response("Pagination cursor is not a Spotify API page")
                            .with_stage(Stage::Cursor),
                    )
                }
            };
        }

        let url = request.url.as_deref().unwrap_or_default();
        let detection = detect_provider(url, &self.detect)
            .filter(|detection| detection.provider == Provider::Spotify)
            .ok_or_else(|| ImportError::unsupported_url(url))?;

        Ok(match detection.resource {
            Resource::Playlist => Target::Playlist {
                tracks_url: self.api.playlist_tracks_url(&detection.id, self.page_limit),
                id: detection.id,
            },
            Resource::Show => Target::Show {
                episodes_url: self.api.show_episodes_url(
                    &detection.id,
                    self.episode_page_limit,
                    &self.market,
                ),
                id: detection.id,
            },
            Resource::Episode => Target::Episode { id: detection.id },
        })
    }

    async fn fetch_target(
        &self,
        fetch: &Arc<dyn FetchClient>,
        target: &Target,
        source_url: &str,
        token: &TokenMemo,
        cancel: &CancellationToken,
    ) -> Result<ImportPage, ImportError> {
        match target {
            Target::Playlist { id, tracks_url } => {
                self.fetch_playlist(fetch, id, tracks_url, source_url, token, cancel)
                    .await
            }
            Target::Show { id, episodes_url } => {
                self.fetch_show(fetch, id, episodes_url, source_url, token, cancel)
                    .await
            }
            Target::Episode { id } => {
                self.fetch_episode(fetch, id, source_url, token, cancel)
                    .await
            }
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        fetch: &Arc<dyn FetchClient>,
        url: &str,
        token: &TokenMemo,
        cancel: &CancellationToken,
        stage: Stage,
    ) -> Result<T, ImportError> {
        let init = RequestInit::new(cancel.clone()).header("Authorization", token.authorization());
        let body = fetch
            .get_json(url, init)
            .await
            .map_err(|error| ImportError::from_fetch(error, stage))?;

        serde_json::from_value(body).map_err(|error| {
            ImportError::invalid_response(format!("Unexpected Spotify payload: {error}"))
                .with_stage(stage)
        })
    }

    async fn fetch_playlist(
        &self,
        fetch: &Arc<dyn FetchClient>,
        playlist_id: &str,
        tracks_url: &str,
        source_url: &str,
        token: &TokenMemo,
        cancel: &CancellationToken,
    ) -> Result<ImportPage, ImportError> {
        let metadata_url = self.api.playlist_url(playlist_id);
        let (playlist, page): (SpotifyPlaylist, SpotifyPage) = futures::try_join!(
            self.get(fetch, &metadata_url, token, cancel, Stage::Metadata),
            self.get(fetch, tracks_url, token, cancel, Stage::Tracks),
        )?;

        let offset = page.offset.unwrap_or(0);
        let tracks = page
            .items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                let mut track = item.get("track").filter(|track| track.is_object())?.clone();
                if let (Some(fields), Some(added_at)) = (track.as_object_mut(), item.get("added_at")) {
                    fields
                        .entry("added_at")
                        .or_insert_with(|| added_at.clone());
                }
                Some(normalize_track(&track, offset as usize + i, Provider::Spotify))
            })
            .collect::<Vec<_>>();

        let limit = page.limit.unwrap_or(self.page_limit).max(1);
        let page_info = self.next_page_info(page.next.as_deref());
        debug!(
            "Fetched Spotify playlist {} page at offset {} ({} tracks, more: {})",
            playlist_id,
            offset,
            tracks.len(),
            page_info.has_more()
        );

        Ok(ImportPage {
            provider: Provider::Spotify,
            playlist_id: playlist.id,
            title: non_blank_or(&playlist.name, "Spotify playlist"),
            snapshot_id: playlist.snapshot_id,
            source_url: source_url.to_string(),
            cover_url: first_image(&playlist.images),
            total: page.total.or(playlist.tracks.and_then(|tracks| tracks.total)),
            tracks,
            page_info,
            debug: ImportDebug {
                source: DataSource::Live,
                page_index: Some(offset / limit),
                ..Default::default()
            },
        })
    }

    async fn fetch_show(
        &self,
        fetch: &Arc<dyn FetchClient>,
        show_id: &str,
        episodes_url: &str,
        source_url: &str,
        token: &TokenMemo,
        cancel: &CancellationToken,
    ) -> Result<ImportPage, ImportError> {
        let show_url = self.api.show_url(show_id, &self.market);
        let (show, page): (SpotifyShow, SpotifyPage) = futures::try_join!(
            self.get(fetch, &show_url, token, cancel, Stage::Metadata),
            self.get(fetch, episodes_url, token, cancel, Stage::Episodes),
        )?;

        let offset = page.offset.unwrap_or(0);
        if offset == 0 && page.items.iter().all(Value::is_null) {
            return Err(ImportError::new(
                ImportErrorCode::ShowEmpty,
                format!("Show \"{}\" has no episodes", show.name),
            )
            .with_stage(Stage::Episodes));
        }

        let show_context = json!({
            "id": show.id,
            "name": show.name,
            "publisher": show.publisher,
        });
        let mut tracks = Vec::with_capacity(page.items.len());
        for (i, item) in page.items.iter().enumerate() {
            if item.is_null() {
                continue;
            }
            let mut episode = require_episode_fields(item, Stage::Episodes)?;
            episode
                .entry("show")
                .or_insert_with(|| show_context.clone());
            tracks.push(normalize_track(
                &Value::Object(episode),
                offset as usize + i,
                Provider::Spotify,
            ));
        }

        let limit = page.limit.unwrap_or(self.episode_page_limit).max(1);
        let page_info = self.next_page_info(page.next.as_deref());
        debug!(
            "Fetched Spotify show {} page at offset {} ({} episodes, more: {})",
            show_id,
            offset,
            tracks.len(),
            page_info.has_more()
        );

        Ok(ImportPage {
            provider: Provider::Spotify,
            playlist_id: show.id,
            title: non_blank_or(&show.name, "Spotify show"),
            snapshot_id: None,
            source_url: source_url.to_string(),
            cover_url: first_image(&show.images),
            total: page.total.or(show.total_episodes),
            tracks,
            page_info,
            debug: ImportDebug {
                source: DataSource::Live,
                page_index: Some(offset / limit),
                ..Default::default()
            },
        })
    }

    async fn fetch_episode(
        &self,
        fetch: &Arc<dyn FetchClient>,
        episode_id: &str,
        source_url: &str,
        token: &TokenMemo,
        cancel: &CancellationToken,
    ) -> Result<ImportPage, ImportError> {
        let episode: Value = self
            .get(
                fetch,
                &self.api.episode_url(episode_id, &self.market),
                token,
                cancel,
                Stage::Episode,
            )
            .await?;

        let restricted = episode
            .get("restrictions")
            .is_some_and(|restrictions| !restrictions.is_null());
        if episode.get("is_playable") == Some(&Value::Bool(false)) || restricted {
            return Err(ImportError::new(
                ImportErrorCode::EpisodeUnavailable,
                format!("Episode {episode_id} is not playable in market {}", self.market),
            )
            .with_stage(Stage::Episode));
        }

        let fields = require_episode_fields(&episode, Stage::Episode)?;
        let show = fields
            .get("show")
            .filter(|show| show.get("id").and_then(Value::as_str).is_some())
            .cloned()
            .ok_or_else(|| {
                ImportError::new(
                    ImportErrorCode::PodcastContent,
                    format!("Episode {episode_id} does not reference its show"),
                )
                .with_stage(Stage::Episode)
            })?;

        let track = normalize_track(&Value::Object(fields), 0, Provider::Spotify);
        Ok(ImportPage {
            provider: Provider::Spotify,
            playlist_id: track.id.clone(),
            title: track.title.clone(),
            snapshot_id: None,
            source_url: source_url.to_string(),
            cover_url: track
                .thumbnail_url
                .clone()
                .or_else(|| show.pointer("/images/0/url").and_then(Value::as_str).map(str::to_string)),
            total: Some(1),
            tracks: vec![track],
            page_info: PageInfo::end(),
            debug: ImportDebug {
                source: DataSource::Live,
                page_index: Some(0),
                ..Default::default()
            },
        })
    }

    /// Keeps an upstream `next` link only if it is itself a valid cursor.
    fn next_page_info(&self, next: Option<&str>) -> PageInfo {
        match next {
            Some(next) if self.api.resolve_cursor(next).is_some() => {
                PageInfo::new(Some(next.to_string()), true)
            }
            Some(next) => {
                warn!("Dropping Spotify next link outside the API: {}", next);
                PageInfo::end()
            }
            None => PageInfo::end(),
        }
    }
}

/// Episodes must carry an id and a name to be imported.
fn require_episode_fields(item: &Value, stage: Stage) -> Result<Map<String, Value>, ImportError> {
    let has_text = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .is_some_and(|text| !text.trim().is_empty())
    };
    match item {
        Value::Object(fields) if has_text("id") && has_text("name") => Ok(fields.clone()),
        _ => Err(ImportError::new(
            ImportErrorCode::PodcastContent,
            "Episode is missing its id or name",
        )
        .with_stage(stage)),
    }
}

fn non_blank_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn canonical_url(target: &Target) -> String {
    match target {
        Target::Playlist { id, .. } => format!("https://open.spotify.com/playlist/{id}"),
        Target::Show { id, .. } => format!("https://open.spotify.com/show/{id}"),
        Target::Episode { id } => format!("https://open.spotify.com/episode/{id}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::config::SpotifyConfig;
    use crate::ports::fetch::{FetchError, MockFetchClient};
    use crate::test_utils::{
        FakeFetchClient, SPOTIFY_API, SPOTIFY_ID, TOKEN_URL, spotify_adapter, spotify_playlist_body,
        spotify_tracks_body, spotify_url_router, token_body,
    };

    fn playlist_request() -> ImportRequest {
        ImportRequest::first_page(
            format!("https://open.spotify.com/playlist/{SPOTIFY_ID}"),
            CancellationToken::new(),
        )
    }

    fn podcast_config() -> SpotifyConfig {
        SpotifyConfig {
            api_base_url: SPOTIFY_API.to_string(),
            podcasts_enabled: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_imports_first_page_with_metadata() {
        let fake = FakeFetchClient::new(spotify_url_router(
            spotify_tracks_body(0, 2, 3, true),
        ));
        let adapter = spotify_adapter(fake.clone());

        let page = adapter.import_playlist(&playlist_request()).await.unwrap();

        assert_eq!(page.provider, Provider::Spotify);
        assert_eq!(page.playlist_id, SPOTIFY_ID);
        assert_eq!(page.title, "Road Trip");
        assert_eq!(page.snapshot_id.as_deref(), Some("snap-1"));
        assert_eq!(page.cover_url.as_deref(), Some("https://i.scdn.co/image/cover"));
        assert_eq!(page.total, Some(3));
        assert_eq!(page.tracks.len(), 2);
        assert_eq!(page.tracks[0].id, "track0");
        assert_eq!(page.tracks[0].artist, "Artist 0");
        assert!(page.tracks[0].date_added.is_some());
        assert!(page.page_info.has_more());
        assert_eq!(page.debug.source, DataSource::Live);
        assert_eq!(page.debug.page_index, Some(0));
        assert!(!page.debug.token_refreshed);

        let calls = fake.calls();
        let tracks_call = calls
            .iter()
            .find(|call| call.url.contains("/tracks"))
            .unwrap();
        assert_eq!(tracks_call.authorization.as_deref(), Some("Bearer token-1"));
    }

    #[tokio::test]
    async fn test_skips_unavailable_items_but_keeps_absolute_index() {
        let mut body = spotify_tracks_body(0, 3, 3, false);
        body["items"][1]["track"] = Value::Null;
        body["items"][2]["track"]["id"] = Value::Null;
        let fake = FakeFetchClient::new(spotify_url_router(body));
        let adapter = spotify_adapter(fake);

        let page = adapter.import_playlist(&playlist_request()).await.unwrap();

        assert_eq!(page.tracks.len(), 2);
        assert_eq!(page.tracks[1].id, "spotify-3");
        assert!(!page.page_info.has_more());
    }

    #[tokio::test]
    async fn test_unauthorized_once_refreshes_credential() {
        let tracks_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&tracks_calls);
        let tokens = Arc::new(AtomicUsize::new(0));
        let token_counter = Arc::clone(&tokens);
        let fake = FakeFetchClient::new(move |url, _| {
            if url == TOKEN_URL {
                let n = token_counter.fetch_add(1, Ordering::SeqCst) + 1;
                return Ok(token_body(&format!("token-{n}"), 3600));
            }
            if url.contains("/tracks") && counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(FetchError::Status {
                    status: 401,
                    body: None,
                });
            }
            if url.contains("/tracks") {
                Ok(spotify_tracks_body(0, 2, 2, false))
            } else {
                Ok(spotify_playlist_body())
            }
        });
        let adapter = spotify_adapter(fake.clone());

        let page = adapter.import_playlist(&playlist_request()).await.unwrap();

        assert!(page.debug.token_refreshed);
        assert_eq!(fake.count_calls(TOKEN_URL), 2);
        let last_tracks_call = fake
            .calls()
            .into_iter()
            .filter(|call| call.url.contains("/tracks"))
            .last()
            .unwrap();
        assert_eq!(last_tracks_call.authorization.as_deref(), Some("Bearer token-2"));
    }

    #[tokio::test]
    async fn test_unauthorized_twice_is_private() {
        let fake = FakeFetchClient::new(|url, _| {
            if url == TOKEN_URL {
                Ok(token_body("token", 3600))
            } else {
                Err(FetchError::Status {
                    status: 401,
                    body: None,
                })
            }
        });
        let adapter = spotify_adapter(fake.clone());

        let err = adapter.import_playlist(&playlist_request()).await.unwrap_err();

        assert_eq!(err.code, ImportErrorCode::PrivatePlaylist);
        assert_eq!(err.details.status, Some(401));
        assert_eq!(err.details.provider, Some(Provider::Spotify));
        assert_eq!(fake.count_calls(TOKEN_URL), 2);
    }

    #[tokio::test]
    async fn test_upstream_statuses_are_classified() {
        for (status, code) in [
            (403, ImportErrorCode::PrivatePlaylist),
            (404, ImportErrorCode::NotFound),
            (429, ImportErrorCode::RateLimited),
            (502, ImportErrorCode::Network),
        ] {
            let fake = FakeFetchClient::new(move |url, _| {
                if url == TOKEN_URL {
                    Ok(token_body("token", 3600))
                } else {
                    Err(FetchError::Status { status, body: None })
                }
            });
            let adapter = spotify_adapter(fake);

            let err = adapter.import_playlist(&playlist_request()).await.unwrap_err();
            assert_eq!(err.code, code, "HTTP {status}");
            assert_eq!(err.details.status, Some(status));
        }
    }

    #[tokio::test]
    async fn test_credential_endpoint_failure_is_network() {
        let fake = FakeFetchClient::new(|_, _| {
            Err(FetchError::Status {
                status: 401,
                body: None,
            })
        });
        let adapter = spotify_adapter(fake.clone());

        let err = adapter.import_playlist(&playlist_request()).await.unwrap_err();

        assert_eq!(err.code, ImportErrorCode::Network);
        assert_eq!(err.details.stage, Some(Stage::Token));
        // No retry: the credential endpoint's own 401 is not an upstream rejection
        assert_eq!(fake.count_calls(TOKEN_URL), 1);
        assert_eq!(fake.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_cursor_rejected_without_network() {
        // No expectations: any call would panic
        let mock = MockFetchClient::new();
        let adapter = SpotifyAdapter::new(Arc::new(mock), &SpotifyConfig::default(), TOKEN_URL).unwrap();

        for cursor in [
            format!("https://evil.example.com/v1/playlists/{SPOTIFY_ID}/tracks?offset=100"),
            format!("{SPOTIFY_API}/me/tracks"),
            "page:1".to_string(),
        ] {
            let request = ImportRequest::next_page(None, cursor, CancellationToken::new());
            let err = adapter.import_playlist(&request).await.unwrap_err();
            assert_eq!(err.code, ImportErrorCode::InvalidResponse);
            assert_eq!(err.details.stage, Some(Stage::Cursor));
        }
    }

    #[tokio::test]
    async fn test_cursor_page_fetches_the_cursor() {
        let fake = FakeFetchClient::new(spotify_url_router(spotify_tracks_body(100, 2, 102, false)));
        let adapter = spotify_adapter(fake.clone());
        let cursor = format!("{SPOTIFY_API}/playlists/{SPOTIFY_ID}/tracks?offset=100&limit=100");

        let request = ImportRequest::next_page(None, cursor.clone(), CancellationToken::new());
        let page = adapter.import_playlist(&request).await.unwrap();

        assert_eq!(page.debug.page_index, Some(1));
        assert_eq!(page.tracks[0].id, "track100");
        assert_eq!(
            page.source_url,
            format!("https://open.spotify.com/playlist/{SPOTIFY_ID}")
        );
        assert_eq!(fake.count_calls(&cursor), 1);
    }

    #[tokio::test]
    async fn test_untrusted_next_link_is_dropped() {
        let mut body = spotify_tracks_body(0, 2, 10, true);
        body["next"] = json!("https://evil.example.com/steal");
        let fake = FakeFetchClient::new(spotify_url_router(body));
        let adapter = spotify_adapter(fake);

        let page = adapter.import_playlist(&playlist_request()).await.unwrap();

        assert!(!page.page_info.has_more());
        assert_eq!(page.page_info.cursor(), None);
    }

    #[tokio::test]
    async fn test_cancelled_request_is_aborted() {
        let fake = FakeFetchClient::new(spotify_url_router(spotify_tracks_body(0, 1, 1, false)));
        let adapter = spotify_adapter(fake.clone());
        let request = playlist_request();
        request.cancel.cancel();

        let err = adapter.import_playlist(&request).await.unwrap_err();

        assert!(err.is_aborted());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_and_tracks_requests_overlap_and_abort_together() {
        let fake = FakeFetchClient::new(spotify_url_router(spotify_tracks_body(0, 2, 2, false)))
            .with_latency(Duration::from_millis(100));
        let adapter = spotify_adapter(fake.clone());
        let request = playlist_request();
        let metadata = format!("/playlists/{SPOTIFY_ID}?");

        // Credential lands at 100ms, both upstream requests would land at 200ms
        let (result, _) = tokio::join!(adapter.import_playlist(&request), async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            assert_eq!(fake.count_calls(&metadata), 1);
            assert_eq!(fake.count_calls("/tracks"), 1);
            request.cancel.cancel();
        });

        assert!(result.unwrap_err().is_aborted());
        assert_eq!(fake.calls().len(), 3);
        assert_eq!(fake.completed(), vec![TOKEN_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_request_transport_overrides_adapter_transport() {
        let built_in = FakeFetchClient::new(|_, _| Ok(Value::Null));
        let adapter = spotify_adapter(built_in.clone());
        let override_fake =
            FakeFetchClient::new(spotify_url_router(spotify_tracks_body(0, 2, 2, false)));
        let mut request = playlist_request();
        request.fetch_client = Some(override_fake.clone());

        let page = adapter.import_playlist(&request).await.unwrap();

        assert_eq!(page.tracks.len(), 2);
        assert!(built_in.calls().is_empty());
        assert_eq!(override_fake.count_calls(TOKEN_URL), 1);
        assert_eq!(override_fake.count_calls(&format!("/playlists/{SPOTIFY_ID}?")), 1);
        assert_eq!(override_fake.count_calls("/tracks"), 1);
    }

    #[tokio::test]
    async fn test_non_spotify_url_is_unsupported() {
        let fake = FakeFetchClient::new(|_, _| Ok(Value::Null));
        let adapter = spotify_adapter(fake.clone());
        let request = ImportRequest::first_page(
            format!("https://open.spotify.com/show/{SPOTIFY_ID}"),
            CancellationToken::new(),
        );

        let err = adapter.import_playlist(&request).await.unwrap_err();

        assert_eq!(err.code, ImportErrorCode::UnsupportedUrl);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_show_pages_episodes() {
        let fake = FakeFetchClient::new(|url, _| {
            if url == TOKEN_URL {
                Ok(token_body("token", 3600))
            } else if url.contains("/episodes") {
                Ok(json!({
                    "items": [
                        { "id": "ep1", "name": "Pilot", "type": "episode", "duration_ms": 1800000 },
                        { "id": "ep2", "name": "Second", "type": "episode" }
                    ],
                    "next": format!("{SPOTIFY_API}/shows/{SPOTIFY_ID}/episodes?offset=2&limit=2"),
                    "offset": 0,
                    "limit": 2,
                    "total": 4
                }))
            } else {
                Ok(json!({ "id": SPOTIFY_ID, "name": "Deep Dive", "publisher": "Studio" }))
            }
        });
        let adapter = SpotifyAdapter::new(fake, &podcast_config(), TOKEN_URL).unwrap();
        let request = ImportRequest::first_page(
            format!("https://open.spotify.com/show/{SPOTIFY_ID}"),
            CancellationToken::new(),
        );

        let page = adapter.import_playlist(&request).await.unwrap();

        assert_eq!(page.title, "Deep Dive");
        assert_eq!(page.tracks.len(), 2);
        assert_eq!(page.tracks[0].artist, "Studio");
        assert_eq!(page.tracks[0].show_id.as_deref(), Some(SPOTIFY_ID));
        assert_eq!(page.tracks[0].kind, crate::models::ContentKind::Podcast);
        assert!(page.page_info.has_more());
    }

    #[tokio::test]
    async fn test_podcast_error_codes() {
        let cases = [
            (
                "show",
                json!({ "items": [], "offset": 0, "limit": 50, "total": 0 }),
                ImportErrorCode::ShowEmpty,
            ),
            (
                "show",
                json!({ "items": [{ "id": "ep1", "name": " " }], "offset": 0 }),
                ImportErrorCode::PodcastContent,
            ),
            (
                "episode",
                json!({ "id": "ep1", "name": "Pilot", "is_playable": false, "show": { "id": "s" } }),
                ImportErrorCode::EpisodeUnavailable,
            ),
            (
                "episode",
                json!({ "id": "ep1", "name": "Pilot", "restrictions": { "reason": "market" }, "show": { "id": "s" } }),
                ImportErrorCode::EpisodeUnavailable,
            ),
            (
                "episode",
                json!({ "id": "ep1", "name": "Pilot" }),
                ImportErrorCode::PodcastContent,
            ),
        ];

        for (resource, payload, code) in cases {
            let fake = FakeFetchClient::new(move |url, _| {
                if url == TOKEN_URL {
                    Ok(token_body("token", 3600))
                } else if url.contains("/episodes") {
                    Ok(payload.clone())
                } else {
                    Ok(json!({ "id": SPOTIFY_ID, "name": "Deep Dive" }))
                }
            });
            let adapter = SpotifyAdapter::new(fake, &podcast_config(), TOKEN_URL).unwrap();
            let request = ImportRequest::first_page(
                format!("https://open.spotify.com/{resource}/{SPOTIFY_ID}"),
                CancellationToken::new(),
            );

            let err = adapter.import_playlist(&request).await.unwrap_err();
            assert_eq!(err.code, code, "{resource}");
        }
    }

    #[tokio::test]
    async fn test_single_episode_import() {
        let fake = FakeFetchClient::new(|url, _| {
            if url == TOKEN_URL {
                Ok(token_body("token", 3600))
            } else {
                Ok(json!({
                    "id": "ep1",
                    "name": "Pilot",
                    "type": "episode",
                    "is_playable": true,
                    "show": { "id": SPOTIFY_ID, "name": "Deep Dive", "publisher": "Studio" }
                }))
            }
        });
        let adapter = SpotifyAdapter::new(fake, &podcast_config(), TOKEN_URL).unwrap();
        let request = ImportRequest::first_page(
            format!("spotify:episode:{SPOTIFY_ID}"),
            CancellationToken::new(),
        );

        let page = adapter.import_playlist(&request).await.unwrap();

        assert_eq!(page.tracks.len(), 1);
        assert_eq!(page.tracks[0].show_name.as_deref(), Some("Deep Dive"));
        assert_eq!(page.total, Some(1));
        assert!(!page.page_info.has_more());
    }
}
