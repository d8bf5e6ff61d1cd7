//! The polling loop that keeps the video player in step with Spotify.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use super::events::{EventSink, Status, SyncEvent};
use super::traits::{PlaybackSource, VideoPlayer, VideoResolver};
use crate::config::AppSettings;

/// The three collaborators the loop drives.
#[derive(Clone)]
pub struct Services {
  pub source: Arc<dyn PlaybackSource>,
  pub resolver: Arc<dyn VideoResolver>,
  pub player: Arc<dyn VideoPlayer>,
}

/// Loop knobs, read at the start of every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
  pub interval: Duration,
  pub mute_on_play: bool,
}

impl Default for LoopSettings {
  fn default() -> Self {
    Self {
      interval: Duration::from_secs(5),
      mute_on_play: true,
    }
  }
}

impl From<&AppSettings> for LoopSettings {
  fn from(app: &AppSettings) -> Self {
    Self {
      interval: app.poll_interval(),
      mute_on_play: app.mute_spotify,
    }
  }
}

/// State shared between the controller and the running worker.
#[derive(Default)]
pub(crate) struct Shared {
  services: RwLock<Option<Services>>,
  settings: RwLock<LoopSettings>,
}

impl Shared {
  pub(crate) fn new(services: Option<Services>, settings: LoopSettings) -> Self {
    Self {
      services: RwLock::new(services),
      settings: RwLock::new(settings),
    }
  }

  pub(crate) fn services(&self) -> Option<Services> {
    self.services.read().clone()
  }

  /// Swap in a new collaborator set; returns the previous one.
  pub(crate) fn replace_services(&self, services: Option<Services>) -> Option<Services> {
    std::mem::replace(&mut *self.services.write(), services)
  }

  pub(crate) fn settings(&self) -> LoopSettings {
    *self.settings.read()
  }

  pub(crate) fn set_settings(&self, settings: LoopSettings) {
    *self.settings.write() = settings;
  }

  pub(crate) fn set_mute_on_play(&self, enabled: bool) {
    self.settings.write().mute_on_play = enabled;
  }
}

/// One monitoring session. Dropped when the worker task returns.
pub(crate) struct SyncLoop {
  shared: Arc<Shared>,
  events: EventSink,
  cancel: CancellationToken,
  /// Track whose video was last launched in this session.
  last_matched: Option<String>,
}

impl SyncLoop {
  pub(crate) fn new(shared: Arc<Shared>, events: EventSink, cancel: CancellationToken) -> Self {
    Self {
      shared,
      events,
      cancel,
      last_matched: None,
    }
  }

  #[cfg(test)]
  pub(crate) fn last_matched(&self) -> Option<&str> {
    self.last_matched.as_deref()
  }

  /// Poll until cancelled.
  pub(crate) async fn run(mut self) {
    log::info!("Sync loop started");
    while !self.cancel.is_cancelled() {
      self.cycle().await;

      let interval = self.shared.settings().interval;
      tokio::select! {
        _ = self.cancel.cancelled() => break,
        _ = tokio::time::sleep(interval) => {}
      }
    }
    log::info!("Sync loop exited");
  }

  /// A single poll/compare/launch pass.
  pub(crate) async fn cycle(&mut self) {
    let Some(services) = self.shared.services() else {
      log::warn!("Sync cycle skipped: no services configured");
      return;
    };
    let settings = self.shared.settings();

    if let Some(exit) = services.player.poll_exit() {
      if exit.success {
        self.events.status(Status::info("Video player closed"));
      } else {
        self.events.status(Status::warning(format!(
          "Video player exited unexpectedly ({})",
          exit
        )));
      }
      self.events.emit(SyncEvent::Video(None));
    }

    let track = match services.source.current().await {
      Ok(Some(track)) => track,
      Ok(None) => {
        self.events.emit(SyncEvent::Track(None));
        return;
      }
      Err(e) if e.is_auth() => {
        self.events.status(Status::error(format!("Spotify authorization failed: {}", e)));
        return;
      }
      Err(e) => {
        self.events.status(Status::error(format!("Error: {}", e)));
        return;
      }
    };
    self.events.emit(SyncEvent::Track(Some(track.clone())));

    if self.last_matched.as_deref() == Some(track.id.as_str()) {
      return;
    }
    self.events.status(Status::info(format!("New track detected: {}", track.name)));

    if self.cancel.is_cancelled() {
      return;
    }
    self.events.status(Status::info("Searching for video..."));
    let video = match services.resolver.search(&track.query).await {
      Ok(Some(video)) => video,
      Ok(None) => {
        self.events.emit(SyncEvent::Video(None));
        self.events.status(Status::warning("No video found for this track"));
        return;
      }
      Err(e) => {
        self.events.emit(SyncEvent::Video(None));
        self.events.status(Status::warning(format!("No video found for this track: {}", e)));
        return;
      }
    };

    if self.cancel.is_cancelled() {
      return;
    }
    if settings.mute_on_play {
      if let Err(e) = services.source.set_volume(0).await {
        self.events.status(Status::warning(format!("Failed to mute Spotify: {}", e)));
      }
    }

    if self.cancel.is_cancelled() {
      return;
    }
    self.events.status(Status::info("Playing video..."));
    let launched = services.player.play(&video, track.progress_ms).await;

    // Advance even on launch failure; a broken launch is not retried until the track changes.
    self.last_matched = Some(track.id);

    match launched {
      Ok(()) => {
        let message = format!("Now playing: {}", video.title);
        self.events.emit(SyncEvent::Video(Some(video)));
        self.events.status(Status::info(message));
      }
      Err(e) => {
        self.events.emit(SyncEvent::Video(None));
        self.events.status(Status::error(format!("Failed to launch video player: {}", e)));
      }
    }
  }
}
