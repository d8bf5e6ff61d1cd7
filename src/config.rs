//! Application configuration with persistence.
//!
//! The document is JSON with three sections: Spotify credentials, the YouTube
//! API key and app settings. A missing file is replaced by a placeholder whose
//! `YOUR_...` values count as "not configured".

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_DIR_NAME: &str = "spotube";
const CONFIG_FILE_NAME: &str = "config.json";
const TOKEN_CACHE_FILE_NAME: &str = "spotify_token.json";

pub const PLACEHOLDER_CLIENT_ID: &str = "YOUR_SPOTIFY_CLIENT_ID";
pub const PLACEHOLDER_CLIENT_SECRET: &str = "YOUR_SPOTIFY_CLIENT_SECRET";
pub const PLACEHOLDER_API_KEY: &str = "YOUR_YOUTUBE_API_KEY";

/// Smallest accepted poll interval in seconds.
pub const MIN_CHECK_INTERVAL: u64 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Failed to read config file {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to write config file {}: {source}", .path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Invalid JSON in config file {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("Failed to serialize config: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("{0} is not configured")]
  NotConfigured(&'static str),

  #[error("{0}")]
  Invalid(String),
}

/// Spotify application credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
  pub client_id: String,
  pub client_secret: String,
  pub redirect_uri: String,
  pub scope: String,
}

impl Default for SpotifyConfig {
  fn default() -> Self {
    Self {
      client_id: PLACEHOLDER_CLIENT_ID.to_string(),
      client_secret: PLACEHOLDER_CLIENT_SECRET.to_string(),
      redirect_uri: "http://localhost:8080".to_string(),
      scope: "user-read-playback-state user-modify-playback-state".to_string(),
    }
  }
}

/// YouTube Data API credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
  pub api_key: String,
}

impl Default for YoutubeConfig {
  fn default() -> Self {
    Self {
      api_key: PLACEHOLDER_API_KEY.to_string(),
    }
  }
}

/// Behaviour of the sync loop and the video player window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
  /// Seconds between two Spotify polls.
  #[serde(default = "default_check_interval")]
  pub check_interval: u64,

  /// Mute Spotify while the video plays.
  #[serde(default = "default_true")]
  pub mute_spotify: bool,

  #[serde(default)]
  pub mpv_fullscreen: bool,

  #[serde(default = "default_window_width")]
  pub mpv_window_width: u32,

  #[serde(default = "default_window_height")]
  pub mpv_window_height: u32,

  /// Custom MPV executable path (None = auto-detect).
  #[serde(default)]
  pub mpv_path: Option<String>,

  /// Additional MPV command-line arguments.
  #[serde(default)]
  pub mpv_args: Vec<String>,
}

fn default_check_interval() -> u64 {
  5
}

fn default_true() -> bool {
  true
}

fn default_window_width() -> u32 {
  1280
}

fn default_window_height() -> u32 {
  720
}

impl Default for AppSettings {
  fn default() -> Self {
    Self {
      check_interval: default_check_interval(),
      mute_spotify: default_true(),
      mpv_fullscreen: false,
      mpv_window_width: default_window_width(),
      mpv_window_height: default_window_height(),
      mpv_path: None,
      mpv_args: Vec::new(),
    }
  }
}

impl AppSettings {
  /// Poll interval, never shorter than [`MIN_CHECK_INTERVAL`].
  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.check_interval.max(MIN_CHECK_INTERVAL))
  }

  /// Configured MPV path, ignoring blank values.
  pub fn mpv_path(&self) -> Option<PathBuf> {
    self
      .mpv_path
      .as_ref()
      .filter(|s| !s.trim().is_empty())
      .map(PathBuf::from)
  }
}

/// Whole configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
  #[serde(default)]
  pub spotify: SpotifyConfig,
  #[serde(default)]
  pub youtube: YoutubeConfig,
  #[serde(default)]
  pub app: AppSettings,
}

impl AppConfig {
  /// Load the configuration, writing a placeholder document if none exists.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = match std::fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == ErrorKind::NotFound => {
        log::info!("No config at {}, writing placeholder", path.display());
        let config = Self::default();
        config.save(path)?;
        return Ok(config);
      }
      Err(source) => {
        return Err(ConfigError::Read {
          path: path.to_path_buf(),
          source,
        })
      }
    };

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Write the configuration as indented JSON, creating parent directories.
  pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(self)?;
    let write_err = |source: std::io::Error| ConfigError::Write {
      path: path.to_path_buf(),
      source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, json).map_err(write_err)
  }

  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if is_unset(&self.spotify.client_id, PLACEHOLDER_CLIENT_ID) {
      return Err(ConfigError::NotConfigured("Spotify client ID"));
    }
    if is_unset(&self.spotify.client_secret, PLACEHOLDER_CLIENT_SECRET) {
      return Err(ConfigError::NotConfigured("Spotify client secret"));
    }
    if is_unset(&self.youtube.api_key, PLACEHOLDER_API_KEY) {
      return Err(ConfigError::NotConfigured("YouTube API key"));
    }
    if self.spotify.redirect_uri.trim().is_empty() {
      return Err(ConfigError::NotConfigured("Spotify redirect URI"));
    }
    if self.app.check_interval < MIN_CHECK_INTERVAL {
      return Err(ConfigError::Invalid(format!(
        "Check interval must be at least {} second",
        MIN_CHECK_INTERVAL
      )));
    }
    if !(320..=3840).contains(&self.app.mpv_window_width) {
      return Err(ConfigError::Invalid(
        "Window width must be between 320 and 3840".to_string(),
      ));
    }
    if !(240..=2160).contains(&self.app.mpv_window_height) {
      return Err(ConfigError::Invalid(
        "Window height must be between 240 and 2160".to_string(),
      ));
    }
    Ok(())
  }

  pub fn is_configured(&self) -> bool {
    self.validate().is_ok()
  }
}

fn is_unset(value: &str, placeholder: &str) -> bool {
  let value = value.trim();
  value.is_empty() || value == placeholder
}

/// `<config dir>/spotube/config.json`, or `./config.json` without a config dir.
pub fn default_config_path() -> PathBuf {
  match dirs::config_dir() {
    Some(dir) => dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
    None => PathBuf::from(CONFIG_FILE_NAME),
  }
}

/// The Spotify token cache lives next to the config file.
pub fn token_cache_path(config_path: &Path) -> PathBuf {
  config_path.with_file_name(TOKEN_CACHE_FILE_NAME)
}
