//! Scriptable in-memory collaborators for driving the sync loop in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::traits::{PlaybackSource, PlayerExit, VideoPlayer, VideoResolver};
use crate::media::{TrackSnapshot, VideoMatch};
use crate::mpv::{MpvError, ProcessError};
use crate::spotify::SpotifyError;
use crate::youtube::YoutubeError;

pub fn track(id: &str, name: &str, progress_ms: u64) -> TrackSnapshot {
  TrackSnapshot::new(id, name, "Artist", "Album", progress_ms, 200_000)
}

pub fn video(id: &str, title: &str) -> VideoMatch {
  VideoMatch {
    id: id.to_string(),
    url: format!("https://www.youtube.com/watch?v={}", id),
    title: title.to_string(),
    thumbnail_url: None,
  }
}

/// Replays queued `current()` answers, then reports nothing playing.
#[derive(Default)]
pub struct FakeSource {
  script: Mutex<VecDeque<Result<Option<TrackSnapshot>, SpotifyError>>>,
  volumes: Mutex<Vec<u8>>,
  fail_volume: AtomicBool,
  restores: AtomicUsize,
  skips: Mutex<Vec<&'static str>>,
  journal: Journal,
}

/// Ordered record of calls shared across fakes.
pub type Journal = Arc<Mutex<Vec<&'static str>>>;

impl FakeSource {
  pub fn with_journal(journal: Journal) -> Self {
    Self {
      journal,
      ..Self::default()
    }
  }

  pub fn push(&self, answer: Result<Option<TrackSnapshot>, SpotifyError>) {
    self.script.lock().push_back(answer);
  }

  pub fn volumes(&self) -> Vec<u8> {
    self.volumes.lock().clone()
  }

  pub fn fail_volume(&self, fail: bool) {
    self.fail_volume.store(fail, Ordering::SeqCst);
  }

  pub fn restores(&self) -> usize {
    self.restores.load(Ordering::SeqCst)
  }

  pub fn skips(&self) -> Vec<&'static str> {
    self.skips.lock().clone()
  }
}

#[async_trait]
impl PlaybackSource for FakeSource {
  async fn current(&self) -> Result<Option<TrackSnapshot>, SpotifyError> {
    self.script.lock().pop_front().unwrap_or(Ok(None))
  }

  async fn set_volume(&self, level: u8) -> Result<(), SpotifyError> {
    if self.fail_volume.load(Ordering::SeqCst) {
      return Err(SpotifyError::Api {
        status: 404,
        message: "No active device found".into(),
      });
    }
    self.journal.lock().push("volume");
    self.volumes.lock().push(level);
    Ok(())
  }

  async fn restore_volume(&self) -> Result<(), SpotifyError> {
    self.journal.lock().push("restore");
    self.restores.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  async fn skip_next(&self) -> Result<(), SpotifyError> {
    self.skips.lock().push("next");
    Ok(())
  }

  async fn skip_previous(&self) -> Result<(), SpotifyError> {
    self.skips.lock().push("previous");
    Ok(())
  }
}

type ErrorFactory = Box<dyn Fn() -> YoutubeError + Send + Sync>;

/// Answers known queries, `None` for everything else.
#[derive(Default)]
pub struct FakeResolver {
  answers: Mutex<HashMap<String, VideoMatch>>,
  failure: Mutex<Option<ErrorFactory>>,
  calls: Mutex<Vec<String>>,
}

impl FakeResolver {
  pub fn answer(&self, query: &str, video: VideoMatch) {
    self.answers.lock().insert(query.to_string(), video);
  }

  pub fn fail_with(&self, make: impl Fn() -> YoutubeError + Send + Sync + 'static) {
    *self.failure.lock() = Some(Box::new(make));
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().clone()
  }
}

#[async_trait]
impl VideoResolver for FakeResolver {
  async fn search(&self, query: &str) -> Result<Option<VideoMatch>, YoutubeError> {
    self.calls.lock().push(query.to_string());
    if let Some(make) = self.failure.lock().as_ref() {
      return Err(make());
    }
    Ok(self.answers.lock().get(query).cloned())
  }
}

/// Records launches and kills instead of spawning anything.
#[derive(Default)]
pub struct FakePlayer {
  plays: Mutex<Vec<(String, u64)>>,
  attempts: AtomicUsize,
  kills: AtomicUsize,
  fail_launch: AtomicBool,
  pending_exit: Mutex<Option<PlayerExit>>,
  journal: Journal,
}

impl FakePlayer {
  pub fn with_journal(journal: Journal) -> Self {
    Self {
      journal,
      ..Self::default()
    }
  }

  pub fn plays(&self) -> Vec<(String, u64)> {
    self.plays.lock().clone()
  }

  pub fn attempts(&self) -> usize {
    self.attempts.load(Ordering::SeqCst)
  }

  pub fn kills(&self) -> usize {
    self.kills.load(Ordering::SeqCst)
  }

  pub fn fail_launch(&self, fail: bool) {
    self.fail_launch.store(fail, Ordering::SeqCst);
  }

  pub fn exit_with(&self, exit: PlayerExit) {
    *self.pending_exit.lock() = Some(exit);
  }
}

#[async_trait]
impl VideoPlayer for FakePlayer {
  async fn play(&self, video: &VideoMatch, start_offset_ms: u64) -> Result<(), MpvError> {
    self.attempts.fetch_add(1, Ordering::SeqCst);
    if self.fail_launch.load(Ordering::SeqCst) {
      return Err(MpvError::Process(ProcessError::NotFound));
    }
    self.journal.lock().push("play");
    self.plays.lock().push((video.id.clone(), start_offset_ms));
    Ok(())
  }

  async fn kill(&self) {
    self.journal.lock().push("kill");
    self.kills.fetch_add(1, Ordering::SeqCst);
  }

  async fn is_available(&self) -> bool {
    true
  }

  fn poll_exit(&self) -> Option<PlayerExit> {
    self.pending_exit.lock().take()
  }
}
