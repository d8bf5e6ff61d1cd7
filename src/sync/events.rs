//! Events pushed from the sync worker to the front-end.

use async_channel::{Receiver, Sender};
use serde::Serialize;

use crate::media::{TrackSnapshot, VideoMatch};

/// Severity of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
  Info,
  Warning,
  Error,
}

/// Human-readable status; only the latest one matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
  pub level: StatusLevel,
  pub message: String,
}

impl Status {
  pub fn info(message: impl Into<String>) -> Self {
    Self {
      level: StatusLevel::Info,
      message: message.into(),
    }
  }

  pub fn warning(message: impl Into<String>) -> Self {
    Self {
      level: StatusLevel::Warning,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      level: StatusLevel::Error,
      message: message.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum SyncEvent {
  Monitoring(bool),
  /// `None` when nothing is playing.
  Track(Option<TrackSnapshot>),
  Video(Option<VideoMatch>),
  Status(Status),
}

/// Sending half of the event queue.
///
/// Sends never block and never fail the caller: events are dropped once the
/// receiver is gone.
#[derive(Clone)]
pub struct EventSink {
  tx: Sender<SyncEvent>,
}

impl EventSink {
  /// Create an unbounded queue.
  pub fn channel() -> (Self, Receiver<SyncEvent>) {
    let (tx, rx) = async_channel::unbounded();
    (Self { tx }, rx)
  }

  pub fn emit(&self, event: SyncEvent) {
    if self.tx.try_send(event).is_err() {
      log::debug!("Event receiver closed, dropping event");
    }
  }

  pub fn status(&self, status: Status) {
    match status.level {
      StatusLevel::Info => log::info!("{}", status.message),
      StatusLevel::Warning => log::warn!("{}", status.message),
      StatusLevel::Error => log::error!("{}", status.message),
    }
    self.emit(SyncEvent::Status(status));
  }
}
