//! Spotube plays the official music video of whatever Spotify is playing.
//!
//! The [`sync::SyncController`] polls Spotify, looks up a matching YouTube
//! video and launches it in MPV, seeked to the track position.

pub mod config;
pub mod media;
pub mod mpv;
pub mod spotify;
pub mod sync;
pub mod youtube;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use media::{TrackSnapshot, VideoMatch};
pub use sync::{EventSink, SyncController, SyncEvent};
