use serde_json::json;

use crate::error::ImportError;
use crate::models::{DataSource, ImportDebug, ImportPage, PageInfo, Provider};
use crate::normalize::normalize_tracks;

pub const DEMO_TRACK_COUNT: usize = 8;

const DEMO_TRACKS: [(&str, &str, u64); DEMO_TRACK_COUNT] = [
    ("Gymnopedie No. 1", "Erik Satie", 185_000),
    ("Clair de Lune", "Claude Debussy", 300_000),
    ("Canon in D", "Johann Pachelbel", 330_000),
    ("The Four Seasons: Spring", "Antonio Vivaldi", 210_000),
    ("Moonlight Sonata", "Ludwig van Beethoven", 360_000),
    ("Nocturne Op. 9 No. 2", "Frederic Chopin", 270_000),
    ("Air on the G String", "Johann Sebastian Bach", 320_000),
    ("The Blue Danube", "Johann Strauss II", 600_000),
];

/// Bounded offline dataset served when a live import fails.
///
/// The page carries `fallback` and the original failure code so callers can
/// tell it apart from real data.
pub fn fallback_page(provider: Provider, source_url: &str, error: &ImportError) -> ImportPage {
    let raw: Vec<_> = DEMO_TRACKS
        .iter()
        .enumerate()
        .map(|(i, (title, artist, duration_ms))| {
            json!({
                "id": format!("{}-demo-{}", provider.tag(), i + 1),
                "title": title,
                "artist": artist,
                "durationMs": duration_ms,
            })
        })
        .collect();

    ImportPage {
        provider,
        playlist_id: format!("{}-demo", provider.tag()),
        title: format!("{} demo playlist (offline fallback)", provider.display_name()),
        snapshot_id: None,
        source_url: source_url.to_string(),
        cover_url: None,
        total: Some(DEMO_TRACK_COUNT as u32),
        tracks: normalize_tracks(&raw, 0, provider),
        page_info: PageInfo::end(),
        debug: ImportDebug {
            source: DataSource::Demo,
            token_refreshed: false,
            fallback: true,
            error_code: Some(error.code),
            page_index: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportErrorCode;

    #[test]
    fn test_fallback_page_is_marked() {
        let error = ImportError::new(ImportErrorCode::RateLimited, "slow down");
        let page = fallback_page(Provider::SoundCloud, "https://soundcloud.com/a/sets/b", &error);

        assert_eq!(page.title, "SoundCloud demo playlist (offline fallback)");
        assert_eq!(page.tracks.len(), DEMO_TRACK_COUNT);
        assert_eq!(page.tracks[0].id, "soundcloud-demo-1");
        assert!(page.debug.fallback);
        assert_eq!(page.debug.source, DataSource::Demo);
        assert_eq!(page.debug.error_code, Some(ImportErrorCode::RateLimited));
        assert!(!page.page_info.has_more());
    }
}
