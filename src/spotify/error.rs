//! Spotify error types.

use thiserror::Error;

/// Errors that can occur when talking to Spotify.
///
/// [`SpotifyError::Auth`] means the session could not be established; every
/// other variant is transient and the next poll may succeed.
#[derive(Debug, Error)]
pub enum SpotifyError {
  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Spotify API error: HTTP {status} - {message}")]
  Api { status: u16, message: String },

  #[error("Rate limited by Spotify, retry after {0}s")]
  RateLimited(u64),

  #[error("JSON serialization error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Authentication failed: {0}")]
  Auth(String),
}

impl SpotifyError {
  /// Credential or session problem the user has to fix.
  pub fn is_auth(&self) -> bool {
    matches!(self, SpotifyError::Auth(_))
  }
}
