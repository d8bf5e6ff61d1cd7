//! Track and video data exchanged between the sync loop and its collaborators.

use serde::Serialize;

/// Point-in-time read of what Spotify is playing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSnapshot {
  /// Opaque identity, stable per distinct track.
  pub id: String,
  pub name: String,
  pub artist: String,
  pub album: String,
  pub artwork_url: Option<String>,
  pub progress_ms: u64,
  pub duration_ms: u64,
  /// Text handed to the video search.
  pub query: String,
}

impl TrackSnapshot {
  pub fn new(
    id: impl Into<String>,
    name: impl Into<String>,
    artist: impl Into<String>,
    album: impl Into<String>,
    progress_ms: u64,
    duration_ms: u64,
  ) -> Self {
    let name = name.into();
    let artist = artist.into();
    let query = search_query(&name, &artist);
    Self {
      id: id.into(),
      name,
      artist,
      album: album.into(),
      artwork_url: None,
      progress_ms,
      duration_ms,
      query,
    }
  }

  pub fn with_artwork(mut self, url: Option<String>) -> Self {
    self.artwork_url = url;
    self
  }

  /// Elapsed share of the track in `[0, 1]`; zero for unknown durations.
  pub fn progress_fraction(&self) -> f64 {
    if self.duration_ms == 0 {
      return 0.0;
    }
    (self.progress_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
  }

  /// `"m:ss / m:ss"`.
  pub fn format_progress(&self) -> String {
    format!(
      "{} / {}",
      format_time(self.progress_ms),
      format_time(self.duration_ms)
    )
  }
}

/// Query used to find the music video for a track.
pub fn search_query(name: &str, artist: &str) -> String {
  format!("{} {} official music video", name, artist)
}

/// Minutes and zero-padded seconds; minutes are not folded into hours.
pub fn format_time(ms: u64) -> String {
  let secs = ms / 1000;
  format!("{}:{:02}", secs / 60, secs % 60)
}

/// Video chosen to represent a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMatch {
  pub id: String,
  pub url: String,
  /// Plain text, entities already decoded.
  pub title: String,
  pub thumbnail_url: Option<String>,
}
