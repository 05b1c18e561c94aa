use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body returned by the backend credential endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Relative lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<Value>,
    /// Absolute expiry; RFC 3339 or epoch seconds/millis
    #[serde(default)]
    pub expires_at: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpotifyExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTotal {
    pub total: Option<u32>,
}

/// Spotify playlist metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<SpotifyImage>>,
    #[serde(default)]
    pub external_urls: Option<SpotifyExternalUrls>,
    #[serde(default)]
    pub tracks: Option<SpotifyTotal>,
}

/// Spotify show (podcast) metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyShow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<SpotifyImage>>,
    #[serde(default)]
    pub external_urls: Option<SpotifyExternalUrls>,
    #[serde(default)]
    pub total_episodes: Option<u32>,
}

/// Paging envelope shared by playlist tracks and show episodes.
///
/// Items stay untyped; they are handed to the normalizer as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyPage {
    pub items: Vec<Value>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

pub fn first_image(images: &Option<Vec<SpotifyImage>>) -> Option<String> {
    images
        .as_ref()
        .and_then(|images| images.first())
        .map(|image| image.url.clone())
}
