//! Conversion of raw provider records into [`NormalizedTrack`]s.
//!
//! Raw records arrive as loosely-shaped JSON: Spotify track objects, YouTube
//! playlist items, SoundCloud tracks, Spotify episodes, or tracks that were
//! already normalized and persisted. Every accessor below tolerates missing or
//! mistyped fields, so normalization never fails.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::models::{ContentKind, NormalizedTrack, Provider};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

const ID_FIELDS: [&str; 3] = ["/id", "/trackId", "/videoId"];
const TITLE_FIELDS: [&str; 2] = ["/title", "/name"];
const ADDED_FIELDS: [&str; 5] = ["dateAdded", "addedAt", "added_at", "createdAt", "created_at"];
const THUMBNAIL_FIELDS: [&str; 5] = [
    "/thumbnailUrl",
    "/thumbnail",
    "/artwork_url",
    "/album/images/0/url",
    "/images/0/url",
];
const SOURCE_URL_FIELDS: [&str; 4] = [
    "/sourceUrl",
    "/permalink_url",
    "/external_urls/spotify",
    "/url",
];
const DURATION_FIELDS: [&str; 3] = ["/durationMs", "/duration_ms", "/duration"];
const PROVIDER_TRACK_ID_FIELDS: [&str; 4] = ["/providerTrackId", "/uri", "/urn", "/videoId"];

/// Normalizes one raw record. `index` is the record's position in the playlist
/// and only matters when the source supplies no id.
pub fn normalize_track(raw: &Value, index: usize, provider: Provider) -> NormalizedTrack {
    let show_id = text_at(raw, &["/showId", "/show/id"]);
    let kind = if string_at(raw, "/kind") == Some("podcast")
        || string_at(raw, "/type") == Some("episode")
        || show_id.is_some()
    {
        ContentKind::Podcast
    } else {
        ContentKind::Music
    };

    NormalizedTrack {
        id: id_at(raw).unwrap_or_else(|| format!("{}-{}", provider.tag(), index + 1)),
        title: text_at(raw, &TITLE_FIELDS)
            .unwrap_or_else(|| format!("Untitled Track {}", index + 1)),
        artist: artist_of(raw).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        provider,
        kind,
        album: text_at(raw, &["/album", "/album/name"]),
        thumbnail_url: text_at(raw, &THUMBNAIL_FIELDS),
        source_url: text_at(raw, &SOURCE_URL_FIELDS),
        duration_ms: duration_of(raw),
        date_added: date_added_of(raw),
        provider_track_id: text_at(raw, &PROVIDER_TRACK_ID_FIELDS),
        show_id,
        show_name: text_at(raw, &["/showName", "/show/name"]),
        publisher: text_at(raw, &["/publisher", "/show/publisher"]),
        description: text_at(raw, &["/description"]),
    }
}

/// Normalizes a page of raw records whose first element sits at `offset`.
pub fn normalize_tracks(raw: &[Value], offset: usize, provider: Provider) -> Vec<NormalizedTrack> {
    raw.iter()
        .enumerate()
        .map(|(i, item)| normalize_track(item, offset + i, provider))
        .collect()
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn string_at<'a>(raw: &'a Value, pointer: &str) -> Option<&'a str> {
    raw.pointer(pointer).and_then(Value::as_str)
}

/// First non-blank string found at any of `pointers`.
fn text_at(raw: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .find_map(|pointer| string_at(raw, pointer).and_then(non_blank))
}

fn id_at(raw: &Value) -> Option<String> {
    ID_FIELDS.iter().find_map(|pointer| match raw.pointer(pointer)? {
        Value::String(id) => non_blank(id),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    })
}

fn artist_of(raw: &Value) -> Option<String> {
    if let Some(artist) = text_at(raw, &["/artist"]) {
        return Some(artist);
    }

    if let Some(Value::Array(artists)) = raw.get("artists") {
        let names: Vec<String> = artists
            .iter()
            .filter_map(|artist| match artist {
                Value::String(name) => non_blank(name),
                Value::Object(_) => string_at(artist, "/name").and_then(non_blank),
                _ => None,
            })
            .collect();
        if !names.is_empty() {
            return Some(names.join(", "));
        }
    }

    text_at(
        raw,
        &["/user/username", "/channelTitle", "/publisher", "/show/publisher"],
    )
}

fn duration_of(raw: &Value) -> Option<u64> {
    DURATION_FIELDS.iter().find_map(|pointer| {
        let number = raw.pointer(pointer)?;
        number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|ms| ms.is_finite() && *ms >= 0.0)
                .map(|ms| ms.round() as u64)
        })
    })
}

fn date_added_of(raw: &Value) -> Option<DateTime<Utc>> {
    ADDED_FIELDS
        .iter()
        .filter_map(|key| raw.get(key))
        .find_map(parse_date)
}

/// Accepts RFC 3339 strings, plain dates, SoundCloud's `YYYY/MM/DD HH:MM:SS +0000`
/// format, and epoch-millisecond numbers.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_date_str(text.trim()),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|ms| ms.is_finite())
                    .map(|ms| ms as i64)
            })
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn parse_date_str(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, "%Y/%m/%d %H:%M:%S %z"))
        .map(|date| date.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|date| date.and_utc())
        })
}
