use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ImportErrorCode;

/// The fixed set of media services an import can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Spotify,
    #[serde(rename = "youtube")]
    YouTube,
    #[serde(rename = "soundcloud")]
    SoundCloud,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Spotify, Provider::YouTube, Provider::SoundCloud];

    /// Lowercase tag used in synthesized ids and dedup keys.
    pub fn tag(&self) -> &'static str {
        match self {
            Provider::Spotify => "spotify",
            Provider::YouTube => "youtube",
            Provider::SoundCloud => "soundcloud",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Spotify => "Spotify",
            Provider::YouTube => "YouTube",
            Provider::SoundCloud => "SoundCloud",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Music,
    Podcast,
}

/// Canonical track shape handed to the annotation layer, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub provider: Provider,
    pub kind: ContentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_track_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NormalizedTrack {
    /// Identity used to deduplicate tracks across pages.
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.provider.tag(), self.id)
    }
}

/// Pagination state of a single page.
///
/// `has_more` can only be true while a cursor is present.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "PageInfoRepr")]
pub struct PageInfo {
    cursor: Option<String>,
    has_more: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfoRepr {
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

impl From<PageInfoRepr> for PageInfo {
    fn from(repr: PageInfoRepr) -> Self {
        PageInfo::new(repr.cursor, repr.has_more)
    }
}

impl PageInfo {
    pub fn new(cursor: Option<String>, has_more: bool) -> Self {
        let has_more = has_more && cursor.is_some();
        Self {
            cursor: if has_more { cursor } else { None },
            has_more,
        }
    }

    /// A page after which nothing more can be fetched.
    pub fn end() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }
}

/// Where the data in a page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Live,
    Mock,
    Demo,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDebug {
    pub source: DataSource,
    #[serde(default)]
    pub token_refreshed: bool,
    #[serde(default)]
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ImportErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_index: Option<u32>,
}

/// One normalized page returned by a provider adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPage {
    pub provider: Provider,
    pub playlist_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    pub tracks: Vec<NormalizedTrack>,
    pub page_info: PageInfo,
    #[serde(default)]
    pub debug: ImportDebug,
}

/// Session-level import metadata, persisted next to the tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportMeta {
    pub provider: Provider,
    pub playlist_id: String,
    pub snapshot_id: Option<String>,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub source_url: String,
    #[serde(default)]
    pub debug: ImportDebug,
}

impl ImportMeta {
    pub fn from_page(page: &ImportPage) -> Self {
        Self {
            provider: page.provider,
            playlist_id: page.playlist_id.clone(),
            snapshot_id: page.snapshot_id.clone(),
            cursor: page.page_info.cursor().map(str::to_string),
            has_more: page.page_info.has_more(),
            source_url: page.source_url.clone(),
            debug: page.debug.clone(),
        }
    }
}

/// Everything the session has accumulated for the current playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSnapshot {
    pub tracks: Vec<NormalizedTrack>,
    pub meta: Option<ImportMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    /// Original failure code when `tracks` hold the demo fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ImportErrorCode>,
    #[serde(default)]
    pub fallback: bool,
}
