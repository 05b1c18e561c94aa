use std::time::Duration;

use chrono::{DateTime, SecondsFormat};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::adapters::ImportRequest;
use crate::config::MockConfig;
use crate::detect::{DetectOptions, playlist_id_for};
use crate::error::{ImportError, Stage};
use crate::models::{DataSource, ImportDebug, ImportPage, PageInfo, Provider};
use crate::normalize::{normalize_track, normalize_tracks};

const CURSOR_PREFIX: &str = "page:";
/// 2024-01-01T00:00:00Z; catalog item `n` was added `n` hours later.
const CATALOG_EPOCH: i64 = 1_704_067_200;
const VIDEO_ID_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

const ADJECTIVES: [&str; 8] = [
    "Midnight", "Golden", "Electric", "Quiet", "Neon", "Paper", "Velvet", "Distant",
];
const NOUNS: [&str; 8] = [
    "Highway", "Harbor", "Signal", "Garden", "Echo", "Skyline", "Current", "Lantern",
];
const ARTISTS: [&str; 6] = [
    "The Lowlands",
    "Mira Vale",
    "Static Bloom",
    "Juno & the Tides",
    "Harbor Lights",
    "Ossian Gray",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFlavor {
    YouTube,
    SoundCloud,
}

impl MockFlavor {
    pub fn provider(&self) -> Provider {
        match self {
            MockFlavor::YouTube => Provider::YouTube,
            MockFlavor::SoundCloud => Provider::SoundCloud,
        }
    }

    /// Catalog item `n` of `playlist_id`, in the provider's own record shape.
    fn raw_item(&self, playlist_id: &str, n: usize) -> Value {
        let digest = Sha256::digest(format!("{}:{}:{}", self.provider().tag(), playlist_id, n));
        let title = format!(
            "{} {}",
            ADJECTIVES[digest[0] as usize % ADJECTIVES.len()],
            NOUNS[digest[1] as usize % NOUNS.len()]
        );
        let artist = ARTISTS[digest[2] as usize % ARTISTS.len()];
        let duration_ms = 120_000 + u64::from(u32::from_be_bytes([digest[3], digest[4], digest[5], digest[6]])) % 240_000;
        let added_at = DateTime::from_timestamp(CATALOG_EPOCH + n as i64 * 3600, 0).unwrap_or_default();

        match self {
            MockFlavor::YouTube => {
                let video_id: String = digest[7..18]
                    .iter()
                    .map(|byte| VIDEO_ID_ALPHABET[*byte as usize % 64] as char)
                    .collect();
                json!({
                    "videoId": video_id,
                    "title": title,
                    "channelTitle": artist,
                    "thumbnail": format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg"),
                    "url": format!("https://www.youtube.com/watch?v={video_id}&list={playlist_id}"),
                    "durationMs": duration_ms,
                    "addedAt": added_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                })
            }
            MockFlavor::SoundCloud => {
                let mut id_bytes = [0u8; 8];
                id_bytes.copy_from_slice(&digest[8..16]);
                let id = 100_000 + u64::from_be_bytes(id_bytes) % 1_000_000_000;
                json!({
                    "id": id,
                    "title": title,
                    "user": { "username": artist },
                    "artwork_url": format!("https://i1.sndcdn.com/artworks-{id}-large.jpg"),
                    "permalink_url": format!("https://soundcloud.com/{}/{}", slug(artist), slug(&title)),
                    "duration": duration_ms,
                    "created_at": added_at.format("%Y/%m/%d %H:%M:%S %z").to_string(),
                    "urn": format!("soundcloud:tracks:{id}"),
                })
            }
        }
    }

    fn title(&self, playlist_id: &str) -> String {
        match self {
            MockFlavor::YouTube => format!("YouTube playlist {playlist_id}"),
            MockFlavor::SoundCloud => {
                let set = playlist_id.rsplit('/').next().unwrap_or(playlist_id);
                let words: Vec<String> = set
                    .split(['-', '_'])
                    .filter(|word| !word.is_empty())
                    .map(|word| {
                        let mut chars = word.chars();
                        match chars.next() {
                            Some(first) => first.to_uppercase().chain(chars).collect(),
                            None => String::new(),
                        }
                    })
                    .collect();
                if words.is_empty() {
                    "SoundCloud set".to_string()
                } else {
                    words.join(" ")
                }
            }
        }
    }
}

fn slug(text: &str) -> String {
    text.to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Serves a deterministic, fixed-size catalog in `page:<n>` pages.
pub struct PagedMockAdapter {
    flavor: MockFlavor,
    catalog_size: usize,
    page_size: usize,
    latency: Option<Duration>,
}

impl PagedMockAdapter {
    pub fn new(flavor: MockFlavor, config: &MockConfig) -> Self {
        Self {
            flavor,
            catalog_size: config.catalog_size,
            page_size: config.page_size.max(1),
            latency: (config.latency_ms > 0).then(|| Duration::from_millis(config.latency_ms)),
        }
    }

    pub fn youtube(config: &MockConfig) -> Self {
        Self::new(MockFlavor::YouTube, config)
    }

    pub fn soundcloud(config: &MockConfig) -> Self {
        Self::new(MockFlavor::SoundCloud, config)
    }

    pub fn provider(&self) -> Provider {
        self.flavor.provider()
    }

    fn page_count(&self) -> usize {
        self.catalog_size.div_ceil(self.page_size).max(1)
    }

    fn parse_cursor(&self, cursor: &str) -> Result<usize, ImportError> {
        cursor
            .trim()
            .strip_prefix(CURSOR_PREFIX)
            .and_then(|page| page.parse::<usize>().ok())
            .filter(|page| *page < self.page_count())
            .ok_or_else(|| {
                tracing::warn!("Refusing {} cursor {:?}", self.provider(), cursor);
                ImportError::invalid_response(format!("Invalid pagination cursor: {cursor}"))
                    .with_stage(Stage::Cursor)
            })
    }

    pub async fn import_playlist(&self, request: &ImportRequest) -> Result<ImportPage, ImportError> {
        self.import(request)
            .await
            .map_err(|error| error.with_provider(self.provider()))
    }

    async fn import(&self, request: &ImportRequest) -> Result<ImportPage, ImportError> {
        let provider = self.provider();
        let source_url = request.url.as_deref().map(str::trim).unwrap_or_default();
        let playlist_id = playlist_id_for(provider, source_url, &DetectOptions::default())
            .ok_or_else(|| ImportError::unsupported_url(source_url))?;

        let page = match request.cursor.as_deref() {
            Some(cursor) => self.parse_cursor(cursor)?,
            None => 0,
        };

        if request.cancel.is_cancelled() {
            return Err(ImportError::aborted());
        }
        if let Some(latency) = self.latency {
            tokio::select! {
                _ = request.cancel.cancelled() => return Err(ImportError::aborted()),
                _ = tokio::time::sleep(latency) => {}
            }
        }

        let start = (page * self.page_size).min(self.catalog_size);
        let end = (start + self.page_size).min(self.catalog_size);
        let raw: Vec<Value> = (start..end)
            .map(|n| self.flavor.raw_item(&playlist_id, n))
            .collect();
        let tracks = normalize_tracks(&raw, start, provider);

        let has_more = page + 1 < self.page_count();
        let page_info = PageInfo::new(
            has_more.then(|| format!("{CURSOR_PREFIX}{}", page + 1)),
            has_more,
        );
        tracing::debug!(
            "Served {} mock page {} of {} for {} ({} tracks)",
            provider,
            page,
            self.page_count(),
            playlist_id,
            tracks.len()
        );

        let cover_url = (self.catalog_size > 0)
            .then(|| normalize_track(&self.flavor.raw_item(&playlist_id, 0), 0, provider))
            .and_then(|track| track.thumbnail_url);
        let snapshot = Sha256::digest(format!("{}:{}", provider.tag(), playlist_id));

        Ok(ImportPage {
            provider,
            title: self.flavor.title(&playlist_id),
            snapshot_id: Some(format!("{:x}", snapshot)[..16].to_string()),
            source_url: source_url.to_string(),
            cover_url,
            total: u32::try_from(self.catalog_size).ok(),
            tracks,
            page_info,
            debug: ImportDebug {
                source: DataSource::Mock,
                page_index: u32::try_from(page).ok(),
                ..Default::default()
            },
            playlist_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::error::ImportErrorCode;

    const YOUTUBE_URL: &str = "https://www.youtube.com/playlist?list=PLrAXtmErZgOeiKm4sgNOknGvNjby9efdf";
    const SOUNDCLOUD_URL: &str = "https://soundcloud.com/some-artist/sets/summer-mix";

    fn request(url: &str, cursor: Option<&str>) -> ImportRequest {
        match cursor {
            Some(cursor) => ImportRequest::next_page(
                Some(url.to_string()),
                cursor.to_string(),
                CancellationToken::new(),
            ),
            None => ImportRequest::first_page(url, CancellationToken::new()),
        }
    }

    #[tokio::test]
    async fn test_youtube_pages_until_catalog_end() {
        let adapter = PagedMockAdapter::youtube(&MockConfig::default());
        let mut cursor: Option<String> = None;
        let mut ids = HashSet::new();
        let mut pages = 0;

        loop {
            let page = adapter
                .import_playlist(&request(YOUTUBE_URL, cursor.as_deref()))
                .await
                .unwrap();
            assert_eq!(page.debug.source, DataSource::Mock);
            assert_eq!(page.debug.page_index, Some(pages));
            assert_eq!(page.total, Some(60));
            ids.extend(page.tracks.iter().map(|track| track.id.clone()));
            pages += 1;

            if !page.page_info.has_more() {
                break;
            }
            cursor = page.page_info.cursor().map(str::to_string);
        }

        assert_eq!(pages, 3);
        assert_eq!(ids.len(), 60);
    }

    #[tokio::test]
    async fn test_catalog_is_deterministic() {
        let adapter = PagedMockAdapter::youtube(&MockConfig::default());

        let first = adapter.import_playlist(&request(YOUTUBE_URL, None)).await.unwrap();
        let second = adapter.import_playlist(&request(YOUTUBE_URL, None)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.page_info.cursor(), Some("page:1"));
        assert_eq!(first.playlist_id, "PLrAXtmErZgOeiKm4sgNOknGvNjby9efdf");
        assert_eq!(first.tracks[0].id.len(), 11);
        assert!(first.tracks[0].date_added.is_some());
    }

    #[tokio::test]
    async fn test_soundcloud_records_normalize() {
        let config = MockConfig {
            catalog_size: 45,
            ..Default::default()
        };
        let adapter = PagedMockAdapter::soundcloud(&config);

        let page = adapter.import_playlist(&request(SOUNDCLOUD_URL, None)).await.unwrap();
        let track = &page.tracks[0];
        assert_eq!(page.title, "Summer Mix");
        assert_eq!(track.provider, Provider::SoundCloud);
        assert!(track.id.parse::<u64>().is_ok());
        assert!(ARTISTS.contains(&track.artist.as_str()));
        assert_eq!(
            track.date_added.unwrap().to_rfc3339(),
            "2024-01-01T00:00:00+00:00"
        );
        assert!(track.provider_track_id.as_deref().unwrap().starts_with("soundcloud:tracks:"));

        let last = adapter
            .import_playlist(&request(SOUNDCLOUD_URL, Some("page:2")))
            .await
            .unwrap();
        assert_eq!(last.tracks.len(), 5);
        assert!(!last.page_info.has_more());
    }

    #[tokio::test]
    async fn test_invalid_cursor_rejected() {
        let adapter = PagedMockAdapter::youtube(&MockConfig::default());

        for cursor in ["page:3", "page:-1", "page:x", "page:", "3", "https://www.youtube.com/"] {
            let err = adapter
                .import_playlist(&request(YOUTUBE_URL, Some(cursor)))
                .await
                .unwrap_err();
            assert_eq!(err.code, ImportErrorCode::InvalidResponse, "{cursor}");
            assert_eq!(err.details.stage, Some(Stage::Cursor));
            assert_eq!(err.details.provider, Some(Provider::YouTube));
        }
    }

    #[tokio::test]
    async fn test_foreign_url_unsupported() {
        let adapter = PagedMockAdapter::youtube(&MockConfig::default());

        let err = adapter
            .import_playlist(&request(SOUNDCLOUD_URL, None))
            .await
            .unwrap_err();
        assert_eq!(err.code, ImportErrorCode::UnsupportedUrl);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_honours_cancellation() {
        let config = MockConfig {
            latency_ms: 500,
            ..Default::default()
        };
        let adapter = PagedMockAdapter::youtube(&config);
        let request = request(YOUTUBE_URL, None);
        let cancel = request.cancel.clone();

        let (result, _) = tokio::join!(adapter.import_playlist(&request), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });

        assert!(result.unwrap_err().is_aborted());
    }
}
