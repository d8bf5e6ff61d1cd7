//! Start/stop/skip/settings intents from the front-end.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::engine::{LoopSettings, Services, Shared, SyncLoop};
use super::events::{EventSink, Status, SyncEvent};
use crate::config::{self, AppConfig, ConfigError};
use crate::mpv::{MpvPlayer, PlayerOptions};
use crate::spotify::{SpotifyClient, SpotifyError};
use crate::youtube::YoutubeClient;

#[derive(Debug, Error)]
pub enum ControlError {
  #[error("Monitoring is already running")]
  AlreadyRunning,
  #[error("Configuration is not usable: {0}")]
  Config(#[from] ConfigError),
  #[error("No services configured")]
  NotConfigured,
  #[error("Spotify error: {0}")]
  Spotify(#[from] SpotifyError),
}

impl Services {
  /// Build the real Spotify/YouTube/mpv collaborators from a validated config.
  pub fn from_config(config: &AppConfig, config_path: &Path) -> Result<Self, ConfigError> {
    config.validate()?;
    let source = SpotifyClient::new(
      config.spotify.clone(),
      config::token_cache_path(config_path),
    );
    let resolver = YoutubeClient::new(config.youtube.api_key.clone());
    let player = MpvPlayer::new(PlayerOptions::from(&config.app));
    Ok(Self {
      source: Arc::new(source),
      resolver: Arc::new(resolver),
      player: Arc::new(player),
    })
  }
}

struct Worker {
  cancel: CancellationToken,
  handle: JoinHandle<()>,
}

/// Owns the monitoring state machine (stopped / running).
pub struct SyncController {
  shared: Arc<Shared>,
  events: EventSink,
  worker: Mutex<Option<Worker>>,
}

impl SyncController {
  /// Controller with no services; `start` fails until a config is applied.
  pub fn new(events: EventSink) -> Self {
    Self {
      shared: Arc::new(Shared::default()),
      events,
      worker: Mutex::new(None),
    }
  }

  pub fn with_services(services: Services, settings: LoopSettings, events: EventSink) -> Self {
    Self {
      shared: Arc::new(Shared::new(Some(services), settings)),
      events,
      worker: Mutex::new(None),
    }
  }

  pub fn is_running(&self) -> bool {
    self
      .worker
      .lock()
      .as_ref()
      .map(|w| !w.handle.is_finished())
      .unwrap_or(false)
  }

  pub fn is_configured(&self) -> bool {
    self.shared.services().is_some()
  }

  pub fn settings(&self) -> LoopSettings {
    self.shared.settings()
  }

  pub fn services(&self) -> Option<Services> {
    self.shared.services()
  }

  /// Stopped -> Running.
  pub fn start(&self) -> Result<(), ControlError> {
    if self.shared.services().is_none() {
      return Err(ControlError::NotConfigured);
    }

    let mut worker = self.worker.lock();
    if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
      return Err(ControlError::AlreadyRunning);
    }

    let cancel = CancellationToken::new();
    let engine = SyncLoop::new(self.shared.clone(), self.events.clone(), cancel.clone());
    let handle = tokio::spawn(engine.run());
    *worker = Some(Worker { cancel, handle });
    drop(worker);

    self.events.emit(SyncEvent::Monitoring(true));
    self.events.status(Status::info("Starting monitoring..."));
    Ok(())
  }

  /// Running -> Stopped: wait for the worker, kill the player, restore volume.
  ///
  /// Returns `false` when monitoring was not running.
  pub async fn stop(&self) -> bool {
    let Some(worker) = self.worker.lock().take() else {
      return false;
    };

    self.events.status(Status::info("Stopping monitoring..."));
    worker.cancel.cancel();
    if let Err(e) = worker.handle.await {
      log::error!("Sync worker ended abnormally: {}", e);
    }

    if let Some(services) = self.shared.services() {
      self.cleanup(&services).await;
    }

    self.events.emit(SyncEvent::Monitoring(false));
    self.events.emit(SyncEvent::Video(None));
    self.events.status(Status::info("Monitoring stopped"));
    true
  }

  async fn cleanup(&self, services: &Services) {
    services.player.kill().await;
    if self.shared.settings().mute_on_play {
      if let Err(e) = services.source.restore_volume().await {
        self
          .events
          .status(Status::warning(format!("Failed to restore Spotify volume: {}", e)));
      }
    }
  }

  pub async fn skip_next(&self) -> Result<(), ControlError> {
    let services = self.shared.services().ok_or(ControlError::NotConfigured)?;
    match services.source.skip_next().await {
      Ok(()) => {
        self.events.status(Status::info("Skipped to next track"));
        Ok(())
      }
      Err(e) => {
        self
          .events
          .status(Status::error(format!("Failed to skip to next track: {}", e)));
        Err(e.into())
      }
    }
  }

  pub async fn skip_previous(&self) -> Result<(), ControlError> {
    let services = self.shared.services().ok_or(ControlError::NotConfigured)?;
    match services.source.skip_previous().await {
      Ok(()) => {
        self.events.status(Status::info("Skipped to previous track"));
        Ok(())
      }
      Err(e) => {
        self
          .events
          .status(Status::error(format!("Failed to skip to previous track: {}", e)));
        Err(e.into())
      }
    }
  }

  /// Toggle mute-on-play. Turning it off restores any muted volume right away.
  pub async fn set_mute_on_play(&self, enabled: bool) {
    let was_enabled = self.shared.settings().mute_on_play;
    self.shared.set_mute_on_play(enabled);
    if was_enabled && !enabled {
      if let Some(services) = self.shared.services() {
        if let Err(e) = services.source.restore_volume().await {
          self
            .events
            .status(Status::warning(format!("Failed to restore Spotify volume: {}", e)));
        }
      }
    }
    log::info!("Mute Spotify during video: {}", enabled);
  }

  /// Replace collaborators and loop settings.
  ///
  /// A running session is stopped with the old collaborators and restarted
  /// with the new ones.
  pub async fn apply(&self, services: Services, settings: LoopSettings) -> Result<(), ControlError> {
    let was_running = self.stop().await;
    self.shared.set_settings(settings);
    self.shared.replace_services(Some(services));
    self.events.status(Status::info("Configuration updated"));
    if was_running {
      self.start()?;
    }
    Ok(())
  }

  /// Rebuild collaborators from a config document.
  ///
  /// An unusable config stops monitoring and clears the services so that
  /// `start` is rejected until a valid one is applied.
  pub async fn apply_config(&self, config: &AppConfig, config_path: &Path) -> Result<(), ControlError> {
    match Services::from_config(config, config_path) {
      Ok(services) => self.apply(services, LoopSettings::from(&config.app)).await,
      Err(e) => {
        self.stop().await;
        self.shared.replace_services(None);
        self.events.status(Status::warning(format!("Not configured: {}", e)));
        Err(e.into())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::sync::fakes::{track, video, FakePlayer, FakeResolver, FakeSource, Journal};

  struct Fixture {
    source: Arc<FakeSource>,
    resolver: Arc<FakeResolver>,
    player: Arc<FakePlayer>,
    journal: Journal,
    controller: SyncController,
    rx: async_channel::Receiver<SyncEvent>,
  }

  fn fixture(mute_on_play: bool) -> Fixture {
    let journal = Journal::default();
    let source = Arc::new(FakeSource::with_journal(journal.clone()));
    let resolver = Arc::new(FakeResolver::default());
    let player = Arc::new(FakePlayer::with_journal(journal.clone()));
    let (events, rx) = EventSink::channel();
    let controller = SyncController::with_services(
      Services {
        source: source.clone(),
        resolver: resolver.clone(),
        player: player.clone(),
      },
      LoopSettings {
        interval: Duration::from_secs(5),
        mute_on_play,
      },
      events,
    );
    Fixture {
      source,
      resolver,
      player,
      journal,
      controller,
      rx,
    }
  }

  fn drain(rx: &async_channel::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
  }

  #[tokio::test(start_paused = true)]
  async fn start_then_stop_runs_cleanup_in_order() {
    let f = fixture(true);
    f.resolver.answer("Song Artist official music video", video("v", "V"));
    f.source.push(Ok(Some(track("t1", "Song", 0))));
    f.source.push(Ok(Some(track("t1", "Song", 5_000))));

    f.controller.start().unwrap();
    assert!(f.controller.is_running());
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert!(f.controller.stop().await);
    assert!(!f.controller.is_running());

    assert_eq!(f.player.plays().len(), 1);
    assert_eq!(*f.journal.lock(), vec!["volume", "play", "kill", "restore"]);

    let events = drain(&f.rx);
    assert_eq!(events.first(), Some(&SyncEvent::Monitoring(true)));
    assert!(events.contains(&SyncEvent::Monitoring(false)));
  }

  #[tokio::test(start_paused = true)]
  async fn stop_without_mute_skips_restore() {
    let f = fixture(false);
    f.controller.start().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    f.controller.stop().await;

    assert_eq!(f.player.kills(), 1);
    assert_eq!(f.source.restores(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn second_start_is_rejected() {
    let f = fixture(false);
    f.controller.start().unwrap();

    assert!(matches!(f.controller.start(), Err(ControlError::AlreadyRunning)));
    f.controller.stop().await;

    f.controller.start().unwrap();
    f.controller.stop().await;
  }

  #[tokio::test]
  async fn stop_when_stopped_is_a_no_op() {
    let f = fixture(true);
    assert!(!f.controller.stop().await);
    assert_eq!(f.player.kills(), 0);
    assert_eq!(f.source.restores(), 0);
  }

  #[tokio::test]
  async fn unconfigured_controller_rejects_intents() {
    let (events, _rx) = EventSink::channel();
    let controller = SyncController::new(events);

    assert!(!controller.is_configured());
    assert!(matches!(controller.start(), Err(ControlError::NotConfigured)));
    assert!(matches!(
      controller.skip_next().await,
      Err(ControlError::NotConfigured)
    ));
  }

  #[tokio::test]
  async fn skips_reach_the_source() {
    let f = fixture(false);
    f.controller.skip_next().await.unwrap();
    f.controller.skip_previous().await.unwrap();

    assert_eq!(f.source.skips(), vec!["next", "previous"]);
    let events = drain(&f.rx);
    assert!(events.contains(&SyncEvent::Status(Status::info("Skipped to next track"))));
  }

  #[tokio::test]
  async fn disabling_mute_restores_volume_immediately() {
    let f = fixture(true);
    f.controller.set_mute_on_play(false).await;

    assert_eq!(f.source.restores(), 1);
    assert!(!f.controller.settings().mute_on_play);

    f.controller.set_mute_on_play(true).await;
    assert_eq!(f.source.restores(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn apply_restarts_a_running_session_with_new_services() {
    let f = fixture(false);
    f.controller.start().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let replacement = Arc::new(FakeSource::default());
    let new_player = Arc::new(FakePlayer::default());
    f.controller
      .apply(
        Services {
          source: replacement.clone(),
          resolver: f.resolver.clone(),
          player: new_player.clone(),
        },
        LoopSettings {
          interval: Duration::from_secs(2),
          mute_on_play: false,
        },
      )
      .await
      .unwrap();

    assert_eq!(f.player.kills(), 1);
    assert!(f.controller.is_running());
    assert_eq!(f.controller.settings().interval, Duration::from_secs(2));

    f.controller.stop().await;
    assert_eq!(new_player.kills(), 1);
  }

  #[tokio::test]
  async fn placeholder_config_clears_services() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let f = fixture(false);

    let err = f
      .controller
      .apply_config(&AppConfig::default(), &path)
      .await
      .unwrap_err();

    assert!(matches!(err, ControlError::Config(ConfigError::NotConfigured(_))));
    assert!(!f.controller.is_configured());
    assert!(matches!(f.controller.start(), Err(ControlError::NotConfigured)));
  }
}
