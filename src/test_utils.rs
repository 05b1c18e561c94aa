use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::adapters::AdapterRegistry;
use crate::adapters::paged_mock::PagedMockAdapter;
use crate::adapters::spotify::SpotifyAdapter;
use crate::config::{MockConfig, SpotifyConfig};
use crate::ports::fetch::{FetchClient, FetchError, RequestInit};

pub const SPOTIFY_API: &str = "https://api.spotify.com/v1";
pub const TOKEN_URL: &str = "http://localhost:3000/api/spotify/token";
pub const SPOTIFY_ID: &str = "37i9dQZF1DXcBWIGoYBM5M";

type Handler = dyn Fn(&str, &RequestInit) -> Result<Value, FetchError> + Send + Sync;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub authorization: Option<String>,
}

/// Scripted transport: answers every request with `handler` and records it.
pub struct FakeFetchClient {
    handler: Box<Handler>,
    latency: Mutex<Option<Duration>>,
    calls: Mutex<Vec<RecordedCall>>,
    completed: Mutex<Vec<String>>,
}

impl FakeFetchClient {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&str, &RequestInit) -> Result<Value, FetchError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            latency: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        })
    }

    pub fn with_latency(self: Arc<Self>, latency: Duration) -> Arc<Self> {
        *self.latency.lock() = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn count_calls(&self, fragment: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.url.contains(fragment))
            .count()
    }

    /// URLs of requests that ran to the handler without being cancelled.
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().clone()
    }
}

#[async_trait::async_trait]
impl FetchClient for FakeFetchClient {
    async fn get_json(&self, url: &str, init: RequestInit) -> Result<Value, FetchError> {
        if init.cancel.is_cancelled() {
            return Err(FetchError::Aborted);
        }
        self.calls.lock().push(RecordedCall {
            url: url.to_string(),
            authorization: init.header_value("Authorization").map(str::to_string),
        });

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::select! {
                _ = init.cancel.cancelled() => return Err(FetchError::Aborted),
                _ = tokio::time::sleep(latency) => {}
            }
        }
        self.completed.lock().push(url.to_string());
        (self.handler)(url, &init)
    }
}

pub fn token_body(access_token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in,
    })
}

pub fn spotify_playlist_body() -> Value {
    json!({
        "id": SPOTIFY_ID,
        "name": "Road Trip",
        "snapshot_id": "snap-1",
        "images": [{ "url": "https://i.scdn.co/image/cover" }],
        "external_urls": { "spotify": format!("https://open.spotify.com/playlist/{SPOTIFY_ID}") },
        "tracks": { "total": 3 }
    })
}

/// A playlist-tracks page holding `track{offset}..track{offset + count}`.
pub fn spotify_tracks_body(offset: usize, count: usize, total: usize, has_next: bool) -> Value {
    let items: Vec<Value> = (offset..offset + count)
        .map(|n| {
            json!({
                "added_at": "2024-03-01T12:00:00Z",
                "track": {
                    "id": format!("track{n}"),
                    "name": format!("Song {n}"),
                    "artists": [{ "name": format!("Artist {n}") }],
                    "album": { "name": "Album", "images": [{ "url": "https://i.scdn.co/image/album" }] },
                    "duration_ms": 200_000,
                    "uri": format!("spotify:track:track{n}"),
                    "external_urls": { "spotify": format!("https://open.spotify.com/track/track{n}") }
                }
            })
        })
        .collect();
    let next = has_next.then(|| {
        format!(
            "{SPOTIFY_API}/playlists/{SPOTIFY_ID}/tracks?offset={}&limit=100",
            offset + count
        )
    });

    json!({
        "items": items,
        "next": next,
        "offset": offset,
        "limit": 100,
        "total": total,
    })
}

/// Serves credentials, playlist metadata, and `tracks` for every tracks page.
pub fn spotify_url_router(
    tracks: Value,
) -> impl Fn(&str, &RequestInit) -> Result<Value, FetchError> + Send + Sync + 'static {
    move |url, _| {
        if url == TOKEN_URL {
            Ok(token_body("token-1", 3600))
        } else if url.contains("/tracks") {
            Ok(tracks.clone())
        } else {
            Ok(spotify_playlist_body())
        }
    }
}

pub fn spotify_adapter(fetch: Arc<FakeFetchClient>) -> SpotifyAdapter {
    let config = SpotifyConfig {
        api_base_url: SPOTIFY_API.to_string(),
        ..Default::default()
    };
    SpotifyAdapter::new(fetch, &config, TOKEN_URL).unwrap()
}

pub fn registry_with_mock(fetch: Arc<FakeFetchClient>, mock: MockConfig) -> Arc<AdapterRegistry> {
    Arc::new(AdapterRegistry::new(
        spotify_adapter(fetch),
        PagedMockAdapter::youtube(&mock),
        PagedMockAdapter::soundcloud(&mock),
    ))
}

pub fn registry(fetch: Arc<FakeFetchClient>) -> Arc<AdapterRegistry> {
    registry_with_mock(fetch, MockConfig::default())
}
