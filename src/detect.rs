use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::models::{ContentKind, Provider};

static SPOTIFY_WEB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?open\.spotify\.com/(?:intl-[a-z]{2}(?:-[a-z]{2})?/)?(?:embed/)?(?:user/[^/?#]+/)?([a-z]+)/([^/?#]+)/?(?:[?#].*)?$",
    )
    .expect("valid spotify web regex")
});

static SPOTIFY_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^spotify:(?:user:[^:]+:)?([a-z]+):([^:?#]+)$").expect("valid spotify uri regex")
});

static SPOTIFY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{22}$").expect("valid spotify id regex"));

static YOUTUBE_LIST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{10,}$").expect("valid youtube list regex"));

const YOUTUBE_HOSTS: [&str; 4] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

const SOUNDCLOUD_HOSTS: [&str; 3] = ["soundcloud.com", "www.soundcloud.com", "m.soundcloud.com"];

#[derive(Debug, Clone, Copy, Default)]
pub struct DetectOptions {
    /// Accept Spotify show and episode links.
    pub podcasts_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Playlist,
    Show,
    Episode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub provider: Provider,
    pub kind: ContentKind,
    pub resource: Resource,
    pub id: String,
}

/// Classifies a pasted link, returning `None` when no supported provider matches.
pub fn detect_provider(input: &str, options: &DetectOptions) -> Option<Detection> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    detect_spotify(input, options)
        .or_else(|| detect_youtube(input))
        .or_else(|| detect_soundcloud(input))
}

fn detect_spotify(input: &str, options: &DetectOptions) -> Option<Detection> {
    let captures = SPOTIFY_WEB
        .captures(input)
        .or_else(|| SPOTIFY_URI.captures(input))?;
    let segment = captures.get(1)?.as_str().to_ascii_lowercase();
    let id = captures.get(2)?.as_str();

    if !is_spotify_id(id) {
        return None;
    }

    let (resource, kind) = match segment.as_str() {
        "playlist" => (Resource::Playlist, ContentKind::Music),
        "show" if options.podcasts_enabled => (Resource::Show, ContentKind::Podcast),
        "episode" if options.podcasts_enabled => (Resource::Episode, ContentKind::Podcast),
        _ => return None,
    };

    Some(Detection {
        provider: Provider::Spotify,
        kind,
        resource,
        id: id.to_string(),
    })
}

fn detect_youtube(input: &str) -> Option<Detection> {
    let url = parse_web_url(input)?;
    let host = url.host_str()?;
    if !YOUTUBE_HOSTS.contains(&host) {
        return None;
    }

    let path = url.path().trim_end_matches('/').to_ascii_lowercase();
    if path != "/playlist" && path != "/watch" {
        return None;
    }

    let list = url
        .query_pairs()
        .find(|(key, _)| key == "list")
        .map(|(_, value)| value.to_string())?;
    if !YOUTUBE_LIST_ID.is_match(&list) {
        return None;
    }

    Some(Detection {
        provider: Provider::YouTube,
        kind: ContentKind::Music,
        resource: Resource::Playlist,
        id: list,
    })
}

fn detect_soundcloud(input: &str) -> Option<Detection> {
    let url = parse_web_url(input)?;
    let host = url.host_str()?;
    if !SOUNDCLOUD_HOSTS.contains(&host) {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [user, sets, slug] if sets.eq_ignore_ascii_case("sets") => Some(Detection {
            provider: Provider::SoundCloud,
            kind: ContentKind::Music,
            resource: Resource::Playlist,
            id: format!("{}/{}", user.to_ascii_lowercase(), slug.to_ascii_lowercase()),
        }),
        _ => None,
    }
}

/// Parses an http(s) URL, tolerating a missing scheme.
fn parse_web_url(input: &str) -> Option<Url> {
    let lower = input.to_ascii_lowercase();
    let url = if lower.starts_with("http://") || lower.starts_with("https://") {
        Url::parse(input).ok()?
    } else if lower.contains("://") || (lower.contains(':') && !lower.contains('/')) {
        return None;
    } else {
        Url::parse(&format!("https://{input}")).ok()?
    };

    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// True for a well-formed 22-character base-62 Spotify id.
pub fn is_spotify_id(id: &str) -> bool {
    SPOTIFY_ID.is_match(id)
}

/// Extracts the playlist id the mock adapters key their catalog on.
pub fn playlist_id_for(provider: Provider, url: &str, options: &DetectOptions) -> Option<String> {
    detect_provider(url, options)
        .filter(|detection| detection.provider == provider)
        .map(|detection| detection.id)
}
