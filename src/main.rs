//! Spotube - headless front-end.
//!
//! Runs the sync loop in the terminal: events are printed as lines on stdout
//! and simple commands are read from stdin.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_channel::Receiver;
use clap::{Parser, Subcommand};
use spotube_lib::config::{self, AppConfig};
use spotube_lib::mpv::{MpvPlayer, PlayerOptions};
use spotube_lib::spotify::SpotifyClient;
use spotube_lib::sync::{EventSink, StatusLevel, SyncController, SyncEvent, VideoPlayer};
use spotube_lib::youtube::YoutubeClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

/// Spotube - play the music video for the track Spotify is playing.
#[derive(Parser, Debug)]
#[command(name = "spotube")]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Path to the configuration file (JSON).
  #[arg(short, long, value_name = "FILE", global = true, env = "SPOTUBE_CONFIG")]
  config: Option<PathBuf>,

  /// Log level (error, warn, info, debug, trace).
  #[arg(
    short,
    long,
    default_value = "info",
    global = true,
    env = "SPOTUBE_LOG_LEVEL"
  )]
  log_level: log::LevelFilter,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Monitor Spotify and play matching videos (default).
  Run {
    /// Wait for a `start` command instead of starting right away.
    #[arg(long)]
    no_autostart: bool,
  },
  /// Validate the configuration and test every external service.
  Check,
  /// Authorize Spotify access: print the consent URL, or store tokens for a code.
  Authorize {
    /// Authorization code from the redirect URL.
    #[arg(long)]
    code: Option<String>,
  },
  /// Write a placeholder configuration if none exists.
  Init,
}

/// A line typed on stdin while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
  Start,
  Stop,
  Next,
  Previous,
  Mute(bool),
  Reload,
  Status,
  Help,
  Quit,
}

const HELP: &str = "Commands: start, stop, next, prev, mute on|off, reload, status, help, quit";

fn parse_intent(line: &str) -> Result<Intent, String> {
  let mut words = line.split_whitespace();
  let intent = match words.next().map(str::to_ascii_lowercase).as_deref() {
    Some("start") => Intent::Start,
    Some("stop") => Intent::Stop,
    Some("next" | "n") => Intent::Next,
    Some("prev" | "previous" | "p") => Intent::Previous,
    Some("mute") => match words.next() {
      Some("on") => Intent::Mute(true),
      Some("off") => Intent::Mute(false),
      _ => return Err("usage: mute on|off".to_string()),
    },
    Some("reload") => Intent::Reload,
    Some("status") => Intent::Status,
    Some("help" | "?") | None => Intent::Help,
    Some("quit" | "exit" | "q") => Intent::Quit,
    Some(other) => return Err(format!("unknown command `{}`", other)),
  };
  Ok(intent)
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  env_logger::Builder::new()
    .filter_level(args.log_level)
    .format_timestamp_millis()
    .init();

  log::info!("Spotube v{}", env!("CARGO_PKG_VERSION"));

  let config_path = args.config.unwrap_or_else(config::default_config_path);
  log::info!("Using configuration file {}", config_path.display());

  match args.command.unwrap_or(Command::Run {
    no_autostart: false,
  }) {
    Command::Run { no_autostart } => run(&config_path, !no_autostart).await,
    Command::Check => check(&config_path).await,
    Command::Authorize { code } => authorize(&config_path, code.as_deref()).await,
    Command::Init => init(&config_path),
  }
}

fn load_config(path: &Path) -> Result<AppConfig> {
  AppConfig::load(path)
    .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn init(config_path: &Path) -> Result<()> {
  let config = load_config(config_path)?;
  println!("Configuration file: {}", config_path.display());
  if let Err(e) = config.validate() {
    println!("Not ready yet: {}", e);
  }
  Ok(())
}

async fn authorize(config_path: &Path, code: Option<&str>) -> Result<()> {
  let config = load_config(config_path)?;
  let spotify = SpotifyClient::new(config.spotify, config::token_cache_path(config_path));

  match code {
    None => {
      let url = spotify.auth().authorize_url()?;
      println!("Open this URL and approve access:\n\n  {}\n", url);
      println!("Then run `spotube authorize --code <CODE>` with the `code` parameter of the redirect URL.");
    }
    Some(code) => {
      spotify
        .auth()
        .exchange_code(code)
        .await
        .context("Failed to exchange authorization code")?;
      let user = spotify
        .check_connection()
        .await
        .context("Tokens stored, but the connection test failed")?;
      println!("Authorized as {}", user);
    }
  }
  Ok(())
}

async fn check(config_path: &Path) -> Result<()> {
  let config = load_config(config_path)?;
  config.validate().context("Configuration is incomplete")?;
  println!("Configuration: ok");

  let player = MpvPlayer::new(PlayerOptions::from(&config.app));
  if player.is_available().await {
    println!("MPV: ok");
  } else {
    println!("MPV: not found (install it or set app.mpv_path)");
  }

  let spotify = SpotifyClient::new(config.spotify.clone(), config::token_cache_path(config_path));
  match spotify.check_connection().await {
    Ok(user) => println!("Spotify: connected as {}", user),
    Err(e) => println!("Spotify: {}", e),
  }

  let youtube = YoutubeClient::new(config.youtube.api_key.clone());
  match youtube.check_key().await {
    Ok(Some(title)) => println!("YouTube: ok (test search found \"{}\")", title),
    Ok(None) => println!("YouTube: ok (test search returned no results)"),
    Err(e) => println!("YouTube: {}", e),
  }
  Ok(())
}

async fn run(config_path: &Path, autostart: bool) -> Result<()> {
  let config = load_config(config_path)?;

  let (events, rx) = EventSink::channel();
  let controller = Arc::new(SyncController::new(events));
  let renderer = tokio::spawn(render_events(rx));

  if let Err(e) = controller.apply_config(&config, config_path).await {
    println!(
      "Edit {} and type `reload` when done ({}).",
      config_path.display(),
      e
    );
  }

  if let Some(services) = controller.services() {
    if !services.player.is_available().await {
      log::warn!("MPV is not available; videos will fail to launch until it is installed");
    }
  }

  if autostart && controller.is_configured() {
    if let Err(e) = controller.start() {
      println!("Cannot start monitoring: {}", e);
    }
  }
  println!("{}", HELP);

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut stdin_open = true;
  loop {
    tokio::select! {
      _ = shutdown_signal() => {
        log::info!("Shutdown signal received, cleaning up...");
        break;
      }
      line = lines.next_line(), if stdin_open => match line {
        Ok(Some(line)) => match parse_intent(&line) {
          Ok(Intent::Quit) => break,
          Ok(intent) => handle_intent(&controller, config_path, intent).await,
          Err(e) => println!("{}. {}", e, HELP),
        },
        Ok(None) => {
          log::debug!("stdin closed, waiting for a shutdown signal");
          stdin_open = false;
        }
        Err(e) => {
          log::error!("Failed to read stdin: {}", e);
          stdin_open = false;
        }
      },
    }
  }

  controller.stop().await;
  drop(controller);
  if let Err(e) = renderer.await {
    log::error!("Event renderer ended abnormally: {}", e);
  }

  log::info!("Shutdown complete");
  Ok(())
}

async fn handle_intent(controller: &SyncController, config_path: &Path, intent: Intent) {
  match intent {
    Intent::Start => {
      if let Err(e) = controller.start() {
        println!("Cannot start monitoring: {}", e);
      }
    }
    Intent::Stop => {
      if !controller.stop().await {
        println!("Monitoring is not running");
      }
    }
    Intent::Next => {
      let _ = controller.skip_next().await;
    }
    Intent::Previous => {
      let _ = controller.skip_previous().await;
    }
    Intent::Mute(enabled) => {
      controller.set_mute_on_play(enabled).await;
      if let Err(e) = persist_mute(config_path, enabled) {
        log::warn!("Failed to save mute setting: {}", e);
      }
      println!("Mute Spotify during videos: {}", if enabled { "on" } else { "off" });
    }
    Intent::Reload => match AppConfig::load(config_path) {
      Ok(config) => {
        if let Err(e) = controller.apply_config(&config, config_path).await {
          println!("Configuration not applied: {}", e);
        }
      }
      Err(e) => println!("Failed to reload configuration: {}", e),
    },
    Intent::Status => {
      let settings = controller.settings();
      println!(
        "Monitoring: {} | configured: {} | interval: {}s | mute: {}",
        if controller.is_running() { "running" } else { "stopped" },
        if controller.is_configured() { "yes" } else { "no" },
        settings.interval.as_secs(),
        if settings.mute_on_play { "on" } else { "off" },
      );
    }
    Intent::Help => println!("{}", HELP),
    Intent::Quit => {}
  }
}

fn persist_mute(config_path: &Path, enabled: bool) -> Result<()> {
  let mut config = load_config(config_path)?;
  config.app.mute_spotify = enabled;
  config.save(config_path).context("Failed to save configuration")?;
  Ok(())
}

/// Print events as they arrive; returns when every sender is gone.
async fn render_events(rx: Receiver<SyncEvent>) {
  let mut current_track: Option<String> = None;

  while let Ok(event) = rx.recv().await {
    match event {
      SyncEvent::Monitoring(true) => println!("== Monitoring started"),
      SyncEvent::Monitoring(false) => {
        current_track = None;
        println!("== Monitoring stopped");
      }
      SyncEvent::Track(Some(track)) => {
        if current_track.as_deref() != Some(track.id.as_str()) {
          println!(
            "Track: {} - {} ({}) [{}]",
            track.name,
            track.artist,
            track.album,
            track.format_progress()
          );
          current_track = Some(track.id);
        }
      }
      SyncEvent::Track(None) => {
        if current_track.take().is_some() {
          println!("Nothing playing");
        }
      }
      SyncEvent::Video(Some(video)) => println!("Video: {} <{}>", video.title, video.url),
      SyncEvent::Video(None) => {}
      SyncEvent::Status(status) => {
        let tag = match status.level {
          StatusLevel::Info => "info",
          StatusLevel::Warning => "warn",
          StatusLevel::Error => "error",
        };
        println!("[{}] {}", tag, status.message);
      }
    }
  }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      log::error!("Failed to listen for Ctrl+C: {}", e);
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut stream) => {
        stream.recv().await;
      }
      Err(e) => {
        log::error!("Failed to install SIGTERM handler: {}", e);
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
}
