use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Origin of the backend that issues provider credentials.
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub mock: MockConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default = "default_spotify_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_spotify_token_path")]
    pub token_path: String,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default = "default_episode_page_limit")]
    pub episode_page_limit: u32,
    #[serde(default = "default_market")]
    pub market: String,
    /// Accept show and episode links in addition to playlists.
    #[serde(default)]
    pub podcasts_enabled: bool,
}

/// Shape of the simulated catalogs served for YouTube and SoundCloud.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockConfig {
    #[serde(default = "default_catalog_size")]
    pub catalog_size: usize,
    #[serde(default = "default_mock_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub latency_ms: u64,
}

fn default_app_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_spotify_api_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_spotify_token_path() -> String {
    "/api/spotify/token".to_string()
}

fn default_page_limit() -> u32 {
    100
}

fn default_episode_page_limit() -> u32 {
    50
}

fn default_market() -> String {
    "US".to_string()
}

fn default_catalog_size() -> usize {
    60
}

fn default_mock_page_size() -> usize {
    20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_base_url: default_app_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            spotify: SpotifyConfig::default(),
            mock: MockConfig::default(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_spotify_api_base_url(),
            token_path: default_spotify_token_path(),
            page_limit: default_page_limit(),
            episode_page_limit: default_episode_page_limit(),
            market: default_market(),
            podcasts_enabled: false,
        }
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            catalog_size: default_catalog_size(),
            page_size: default_mock_page_size(),
            latency_ms: 0,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("playlist-importer").join("config.toml"))
    }

    /// Load the config from the default location, falling back to defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the default config to the default location, if no file exists there yet
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_else(|| eyre!("No config directory available"))?;
        if path.exists() {
            return Err(eyre!("Config file already exists: {}", path.display()));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents =
            toml::to_string_pretty(&Self::default()).wrap_err("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.app_base_url)
            .wrap_err_with(|| format!("Invalid app_base_url: {}", self.app_base_url))?;
        url::Url::parse(&self.spotify.api_base_url).wrap_err_with(|| {
            format!("Invalid spotify.api_base_url: {}", self.spotify.api_base_url)
        })?;
        if self.mock.page_size == 0 {
            return Err(eyre!("mock.page_size must be greater than zero"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Full URL of the Spotify credential endpoint.
    pub fn spotify_token_url(&self) -> String {
        format!(
            "{}{}",
            self.app_base_url.trim_end_matches('/'),
            self.spotify.token_path
        )
    }
}
