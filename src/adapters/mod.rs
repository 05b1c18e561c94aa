pub mod paged_mock;
pub mod spotify;

use std::sync::Arc;

use color_eyre::eyre::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::ImportError;
use crate::models::{ImportPage, Provider};
use crate::ports::fetch::FetchClient;

use self::paged_mock::PagedMockAdapter;
use self::spotify::SpotifyAdapter;

/// Input to a single adapter call.
///
/// `cursor` takes precedence over `url` when both are present.
#[derive(Clone)]
pub struct ImportRequest {
    pub url: Option<String>,
    pub cursor: Option<String>,
    pub cancel: CancellationToken,
    /// Overrides the adapter's own transport for this call.
    pub fetch_client: Option<Arc<dyn FetchClient>>,
}

impl ImportRequest {
    pub fn first_page(url: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            url: Some(url.into()),
            cursor: None,
            cancel,
            fetch_client: None,
        }
    }

    pub fn next_page(url: Option<String>, cursor: String, cancel: CancellationToken) -> Self {
        Self {
            url,
            cursor: Some(cursor),
            cancel,
            fetch_client: None,
        }
    }
}

/// One adapter per [`Provider`].
pub struct AdapterRegistry {
    spotify: SpotifyAdapter,
    youtube: PagedMockAdapter,
    soundcloud: PagedMockAdapter,
}

impl AdapterRegistry {
    pub fn new(
        spotify: SpotifyAdapter,
        youtube: PagedMockAdapter,
        soundcloud: PagedMockAdapter,
    ) -> Self {
        Self {
            spotify,
            youtube,
            soundcloud,
        }
    }

    pub fn from_config(config: &Config, fetch: Arc<dyn FetchClient>) -> Result<Self> {
        let spotify = SpotifyAdapter::new(fetch, &config.spotify, config.spotify_token_url())
            .wrap_err_with(|| {
                format!("Invalid Spotify API base URL: {}", config.spotify.api_base_url)
            })?;

        Ok(Self::new(
            spotify,
            PagedMockAdapter::youtube(&config.mock),
            PagedMockAdapter::soundcloud(&config.mock),
        ))
    }

    pub async fn import_page(
        &self,
        provider: Provider,
        request: &ImportRequest,
    ) -> Result<ImportPage, ImportError> {
        match provider {
            Provider::Spotify => self.spotify.import_playlist(request).await,
            Provider::YouTube => self.youtube.import_playlist(request).await,
            Provider::SoundCloud => self.soundcloud.import_playlist(request).await,
        }
    }
}
