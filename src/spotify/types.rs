//! Spotify Web API types.
//!
//! Only the fields the sync loop needs are modelled; everything else in the
//! responses is ignored.

use serde::{Deserialize, Serialize};

use crate::media::TrackSnapshot;

/// `GET /v1/me/player` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentPlayback {
  #[serde(default)]
  pub is_playing: bool,
  #[serde(default)]
  pub progress_ms: Option<u64>,
  #[serde(default)]
  pub item: Option<PlayableItem>,
  #[serde(default)]
  pub device: Option<Device>,
}

/// Device the playback is running on.
#[derive(Debug, Clone, Deserialize)]
pub struct Device {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub volume_percent: Option<u8>,
}

/// Track or podcast episode.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayableItem {
  /// Missing for local files.
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub uri: String,
  pub name: String,
  #[serde(default)]
  pub duration_ms: u64,
  #[serde(default)]
  pub artists: Vec<Artist>,
  #[serde(default)]
  pub album: Option<Album>,
  /// Set for podcast episodes instead of artists/album.
  #[serde(default)]
  pub show: Option<Show>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
  pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Album {
  pub name: String,
  #[serde(default)]
  pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Show {
  pub name: String,
  #[serde(default)]
  pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
  pub url: String,
}

/// `GET /v1/me` response.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
  pub id: String,
  #[serde(default)]
  pub display_name: Option<String>,
}

/// Error body returned by the Web API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
  pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
  #[serde(default)]
  pub message: String,
}

/// Accounts service `POST /api/token` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
  pub access_token: String,
  #[serde(default = "default_expires_in")]
  pub expires_in: u64,
  #[serde(default)]
  pub refresh_token: Option<String>,
  #[serde(default)]
  pub scope: Option<String>,
}

fn default_expires_in() -> u64 {
  3600
}

/// Tokens persisted in the token cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
  pub access_token: String,
  #[serde(default)]
  pub refresh_token: Option<String>,
  /// Unix timestamp (seconds) after which the access token is stale.
  pub expires_at: u64,
  #[serde(default)]
  pub scope: Option<String>,
}

/// Refresh this many seconds before the token actually expires.
const EXPIRY_MARGIN_SECS: u64 = 60;

impl TokenSet {
  /// Build from a token response. The accounts service may omit the refresh
  /// token on refresh, in which case the previous one stays valid.
  pub fn from_response(response: TokenResponse, previous_refresh: Option<&str>, now: u64) -> Self {
    Self {
      access_token: response.access_token,
      refresh_token: response
        .refresh_token
        .or_else(|| previous_refresh.map(str::to_string)),
      expires_at: now + response.expires_in,
      scope: response.scope,
    }
  }

  pub fn is_expired(&self, now: u64) -> bool {
    now + EXPIRY_MARGIN_SECS >= self.expires_at
  }
}

impl CurrentPlayback {
  /// The device volume, if Spotify reports one.
  pub fn device_volume(&self) -> Option<u8> {
    self.device.as_ref().and_then(|d| d.volume_percent)
  }

  /// Snapshot of the playing item; `None` when paused or nothing is loaded.
  pub fn into_snapshot(self) -> Option<TrackSnapshot> {
    if !self.is_playing {
      return None;
    }
    let item = self.item?;

    let id = item.id.clone().unwrap_or_else(|| item.uri.clone());
    if id.is_empty() {
      return None;
    }

    let artist = item
      .artists
      .first()
      .map(|a| a.name.clone())
      .or_else(|| item.show.as_ref().map(|s| s.name.clone()))
      .unwrap_or_default();

    let (album, images) = match (&item.album, &item.show) {
      (Some(album), _) => (album.name.clone(), album.images.as_slice()),
      (None, Some(show)) => (show.name.clone(), show.images.as_slice()),
      (None, None) => (String::new(), &[][..]),
    };
    let artwork = images.first().map(|i| i.url.clone());

    Some(
      TrackSnapshot::new(
        id,
        item.name.clone(),
        artist,
        album,
        self.progress_ms.unwrap_or(0),
        item.duration_ms,
      )
      .with_artwork(artwork),
    )
  }
}
