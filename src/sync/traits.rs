//! Collaborator seams of the sync loop.
//!
//! The loop only talks to Spotify, YouTube and mpv through these traits so the
//! engine can be driven by fakes in tests.

use std::fmt;

use async_trait::async_trait;

use crate::media::{TrackSnapshot, VideoMatch};
use crate::mpv::MpvError;
use crate::spotify::SpotifyError;
use crate::youtube::YoutubeError;

/// What is playing in the audio service, plus transport and volume control.
#[async_trait]
pub trait PlaybackSource: Send + Sync {
  /// Current track, or `None` when nothing is playing.
  async fn current(&self) -> Result<Option<TrackSnapshot>, SpotifyError>;

  /// Set the device volume (0-100).
  ///
  /// Setting a level at or below the mute threshold records the previous
  /// volume once; later mutes never overwrite that backup.
  async fn set_volume(&self, level: u8) -> Result<(), SpotifyError>;

  /// Re-apply the backed-up volume and clear it. No-op without a backup.
  async fn restore_volume(&self) -> Result<(), SpotifyError>;

  async fn skip_next(&self) -> Result<(), SpotifyError>;

  async fn skip_previous(&self) -> Result<(), SpotifyError>;
}

/// Maps a search query to a single video.
#[async_trait]
pub trait VideoResolver: Send + Sync {
  async fn search(&self, query: &str) -> Result<Option<VideoMatch>, YoutubeError>;
}

/// Supervises at most one external video player process.
#[async_trait]
pub trait VideoPlayer: Send + Sync {
  /// Kill any running player, then launch one for `video` seeked to the offset.
  async fn play(&self, video: &VideoMatch, start_offset_ms: u64) -> Result<(), MpvError>;

  /// Terminate the tracked player and sweep stray instances. Never fails.
  async fn kill(&self);

  /// Whether the player binary can be run at all.
  async fn is_available(&self) -> bool;

  /// Non-blocking check for a player that exited on its own.
  fn poll_exit(&self) -> Option<PlayerExit>;
}

/// How a player process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerExit {
  pub success: bool,
  /// `None` when terminated by a signal.
  pub code: Option<i32>,
}

impl From<std::process::ExitStatus> for PlayerExit {
  fn from(status: std::process::ExitStatus) -> Self {
    Self {
      success: status.success(),
      code: status.code(),
    }
  }
}

impl fmt::Display for PlayerExit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.code {
      Some(code) => write!(f, "exit code {}", code),
      None => write!(f, "terminated by signal"),
    }
  }
}
