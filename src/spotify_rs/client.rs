use url::Url;

use crate::detect::is_spotify_id;

/// Collection a validated pagination cursor points into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorTarget {
    PlaylistTracks(String),
    ShowEpisodes(String),
}

/// URL builder for the Spotify Web API rooted at a configurable base.
#[derive(Debug, Clone)]
pub struct SpotifyApi {
    base: Url,
}

impl SpotifyApi {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(base_url.trim_end_matches('/'))?;
        Ok(Self { base })
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut url = self.base.clone();
        url.set_path(&format!("{}/{}", self.base_path(), path));
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(key, value)| (*key, value.as_str())));
        }
        url.to_string()
    }

    fn base_path(&self) -> &str {
        self.base.path().trim_end_matches('/')
    }

    pub fn playlist_url(&self, playlist_id: &str) -> String {
        self.endpoint(
            &format!("playlists/{playlist_id}"),
            &[(
                "fields",
                "id,name,snapshot_id,images,external_urls,tracks.total".to_string(),
            )],
        )
    }

    pub fn playlist_tracks_url(&self, playlist_id: &str, limit: u32) -> String {
        self.endpoint(
            &format!("playlists/{playlist_id}/tracks"),
            &[("limit", limit.to_string()), ("offset", "0".to_string())],
        )
    }

    pub fn show_url(&self, show_id: &str, market: &str) -> String {
        self.endpoint(&format!("shows/{show_id}"), &[("market", market.to_string())])
    }

    pub fn show_episodes_url(&self, show_id: &str, limit: u32, market: &str) -> String {
        self.endpoint(
            &format!("shows/{show_id}/episodes"),
            &[
                ("limit", limit.to_string()),
                ("offset", "0".to_string()),
                ("market", market.to_string()),
            ],
        )
    }

    pub fn episode_url(&self, episode_id: &str, market: &str) -> String {
        self.endpoint(
            &format!("episodes/{episode_id}"),
            &[("market", market.to_string())],
        )
    }

    /// Validates an upstream `next` URL before it is ever requested.
    ///
    /// Only URLs on the API origin, under the API base path, and addressing a
    /// playlist's tracks or a show's episodes are accepted.
    pub fn resolve_cursor(&self, cursor: &str) -> Option<CursorTarget> {
        let url = Url::parse(cursor.trim()).ok()?;
        if url.origin() != self.base.origin()
            || !url.username().is_empty()
            || url.password().is_some()
            || url.fragment().is_some()
        {
            return None;
        }

        let rest = url.path().strip_prefix(self.base_path())?;
        let segments: Vec<&str> = rest.strip_prefix('/')?.split('/').collect();
        match segments.as_slice() {
            ["playlists", id, "tracks"] if is_spotify_id(id) => {
                Some(CursorTarget::PlaylistTracks(id.to_string()))
            }
            ["shows", id, "episodes"] if is_spotify_id(id) => {
                Some(CursorTarget::ShowEpisodes(id.to_string()))
            }
            _ => None,
        }
    }
}
