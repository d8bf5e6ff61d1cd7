//! YouTube error types.

use thiserror::Error;

/// Errors that can occur when searching for a video.
#[derive(Debug, Error)]
pub enum YoutubeError {
  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("YouTube API error: HTTP {status} - {message}")]
  Api { status: u16, message: String },

  #[error("JSON serialization error: {0}")]
  Json(#[from] serde_json::Error),
}
