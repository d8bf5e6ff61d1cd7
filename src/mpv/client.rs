//! MPV player supervision: one live process at a time.

use std::process::{Child, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use super::process::{
  build_args, process_name, request_terminate, resolve_mpv, spawn_mpv, sweep, PlayerOptions,
  ProcessError,
};
use crate::media::VideoMatch;
use crate::sync::{PlayerExit, VideoPlayer};

/// Time given to killed players to release the window and audio device.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum MpvError {
  #[error("Process error: {0}")]
  Process(#[from] ProcessError),
  #[error("Invalid media URL: {0:?}")]
  InvalidMedia(String),
}

/// Launches MPV for each video, killing the previous instance first.
pub struct MpvPlayer {
  options: PlayerOptions,
  process: Mutex<Option<Child>>,
}

impl MpvPlayer {
  pub fn new(options: PlayerOptions) -> Self {
    Self {
      options,
      process: Mutex::new(None),
    }
  }

  pub fn options(&self) -> &PlayerOptions {
    &self.options
  }

  /// Whether a player process is currently tracked.
  pub fn has_process(&self) -> bool {
    self.process.lock().is_some()
  }

  /// Pid of the tracked player, if any.
  pub fn pid(&self) -> Option<u32> {
    self.process.lock().as_ref().map(Child::id)
  }

  fn sweep_name(&self) -> String {
    let exe = resolve_mpv(self.options.mpv_path.as_deref()).ok();
    process_name(exe.as_deref())
  }
}

#[async_trait]
impl VideoPlayer for MpvPlayer {
  async fn play(&self, video: &VideoMatch, start_offset_ms: u64) -> Result<(), MpvError> {
    self.kill().await;

    if video.url.trim().is_empty() {
      return Err(MpvError::InvalidMedia(video.url.clone()));
    }

    let exe = resolve_mpv(self.options.mpv_path.as_deref())?;
    let args = build_args(video, start_offset_ms, &self.options);
    let child = spawn_mpv(&exe, &args)?;
    log::info!(
      "Playing {} from {:.1}s (pid: {})",
      video.url,
      start_offset_ms as f64 / 1000.0,
      child.id()
    );
    *self.process.lock() = Some(child);
    Ok(())
  }

  async fn kill(&self) {
    let mut child = self.process.lock().take();

    if let Some(child) = child.as_mut() {
      log::info!("Stopping MPV process (pid: {})", child.id());
      request_terminate(child);
    }

    sweep(&self.sweep_name()).await;
    tokio::time::sleep(SETTLE_DELAY).await;

    // Reap in spawn_blocking to avoid blocking the async runtime
    if let Some(mut child) = child {
      let result = tokio::task::spawn_blocking(move || match child.try_wait() {
        Ok(Some(status)) => Ok(status),
        Ok(None) => {
          let _ = child.kill();
          child.wait()
        }
        Err(e) => Err(e),
      })
      .await;

      match result {
        Ok(Ok(status)) => log::info!("MPV process exited with: {}", status),
        Ok(Err(e)) => log::error!("wait() failed: {}", e),
        Err(e) => log::error!("spawn_blocking panicked during process cleanup: {}", e),
      }
    }
  }

  async fn is_available(&self) -> bool {
    let Ok(exe) = resolve_mpv(self.options.mpv_path.as_deref()) else {
      log::warn!("MPV executable not found");
      return false;
    };

    let status = tokio::process::Command::new(&exe)
      .arg("--version")
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status()
      .await;
    match status {
      Ok(status) => status.success(),
      Err(e) => {
        log::warn!("Failed to run {:?} --version: {}", exe, e);
        false
      }
    }
  }

  fn poll_exit(&self) -> Option<PlayerExit> {
    let mut process = self.process.lock();
    let status = match process.as_mut()?.try_wait() {
      Ok(Some(status)) => status,
      Ok(None) => return None,
      Err(e) => {
        log::warn!("Failed to poll MPV process: {}", e);
        return None;
      }
    };
    process.take();
    log::info!("MPV process exited on its own: {}", status);
    Some(status.into())
  }
}
