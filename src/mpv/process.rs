//! MPV process detection, argument building and spawning.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use thiserror::Error;

use crate::media::VideoMatch;

#[derive(Error, Debug)]
pub enum ProcessError {
  #[error("MPV executable not found")]
  NotFound,
  #[error("Failed to spawn MPV: {0}")]
  SpawnFailed(#[from] std::io::Error),
}

/// How the player window should look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerOptions {
  /// Explicit executable; searched for when unset.
  pub mpv_path: Option<PathBuf>,
  pub fullscreen: bool,
  pub window_width: u32,
  pub window_height: u32,
  /// Appended after the built-in arguments.
  pub extra_args: Vec<String>,
}

impl Default for PlayerOptions {
  fn default() -> Self {
    Self {
      mpv_path: None,
      fullscreen: false,
      window_width: 1280,
      window_height: 720,
      extra_args: Vec::new(),
    }
  }
}

impl From<&crate::config::AppSettings> for PlayerOptions {
  fn from(app: &crate::config::AppSettings) -> Self {
    Self {
      mpv_path: app.mpv_path(),
      fullscreen: app.mpv_fullscreen,
      window_width: app.mpv_window_width,
      window_height: app.mpv_window_height,
      extra_args: app.mpv_args.clone(),
    }
  }
}

/// Find MPV executable in common locations.
pub fn find_mpv() -> Option<PathBuf> {
  if let Ok(path) = which::which("mpv") {
    return Some(path);
  }

  #[cfg(windows)]
  let common_paths = [
    r"C:\Program Files\mpv\mpv.exe",
    r"C:\Program Files (x86)\mpv\mpv.exe",
    r"C:\mpv\mpv.exe",
  ];

  #[cfg(target_os = "macos")]
  let common_paths = [
    "/usr/local/bin/mpv",
    "/opt/homebrew/bin/mpv",
    "/Applications/mpv.app/Contents/MacOS/mpv",
  ];

  #[cfg(not(any(windows, target_os = "macos")))]
  let common_paths = ["/usr/bin/mpv", "/usr/local/bin/mpv", "/snap/bin/mpv"];

  common_paths.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Configured executable, else the first one found.
pub fn resolve_mpv(configured: Option<&Path>) -> Result<PathBuf, ProcessError> {
  configured
    .map(Path::to_path_buf)
    .or_else(find_mpv)
    .ok_or(ProcessError::NotFound)
}

/// Process name used for the system-wide sweep.
pub fn process_name(exe: Option<&Path>) -> String {
  exe
    .and_then(|p| p.file_stem())
    .map(|s| s.to_string_lossy().into_owned())
    .filter(|s| !s.is_empty())
    .unwrap_or_else(|| "mpv".to_string())
}

/// Window titles are passed as a single argument; quotes are dropped.
pub fn sanitize_title(title: &str) -> String {
  title.chars().filter(|c| *c != '"' && *c != '\'').collect()
}

/// Command-line arguments for playing `video` from `start_offset_ms`.
pub fn build_args(video: &VideoMatch, start_offset_ms: u64, options: &PlayerOptions) -> Vec<String> {
  let mut args = vec![
    video.url.clone(),
    format!("--start={}", start_offset_ms as f64 / 1000.0),
    "--force-window=yes".to_string(),
    format!("--title=Spotube: {}", sanitize_title(&video.title)),
    "--no-terminal".to_string(),
  ];

  if options.fullscreen {
    args.push("--fullscreen".to_string());
  } else {
    args.push(format!(
      "--geometry={}x{}",
      options.window_width, options.window_height
    ));
  }

  args.extend(options.extra_args.iter().cloned());
  args
}

/// Spawn a detached MPV process.
pub fn spawn_mpv(exe: &Path, args: &[String]) -> Result<Child, ProcessError> {
  log::info!("Spawning MPV: {:?}", exe);
  log::debug!("MPV args: {:?}", args);

  let child = Command::new(exe)
    .args(args)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .spawn()?;

  Ok(child)
}

/// Ask a process to terminate.
pub fn request_terminate(child: &mut Child) {
  #[cfg(unix)]
  {
    let pid = child.id() as libc::pid_t;
    // SAFETY: signalling a pid we spawned and have not reaped yet.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc != 0 {
      log::debug!(
        "SIGTERM to MPV (pid {}) failed: {}",
        pid,
        std::io::Error::last_os_error()
      );
    }
  }
  #[cfg(not(unix))]
  {
    if let Err(e) = child.kill() {
      log::debug!("Terminating MPV failed: {}", e);
    }
  }
}

/// Force-kill every process with the given name, including ones we lost track of.
pub async fn sweep(name: &str) {
  #[cfg(windows)]
  let mut cmd = {
    let image = format!("{}.exe", name);
    let mut cmd = tokio::process::Command::new("taskkill");
    cmd.args(["/F", "/IM", image.as_str()]);
    cmd
  };
  #[cfg(not(windows))]
  let mut cmd = {
    let mut cmd = tokio::process::Command::new("pkill");
    cmd.args(["-9", name]);
    cmd
  };

  let result = cmd
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .status()
    .await;
  match result {
    Ok(status) => log::debug!("Process sweep for {} finished: {}", name, status),
    Err(e) => log::debug!("Process sweep for {} unavailable: {}", name, e),
  }
}
