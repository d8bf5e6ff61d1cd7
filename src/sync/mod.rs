//! Spotify -> YouTube -> mpv synchronisation.
//!
//! A [`SyncController`] runs one polling worker at a time. The worker asks a
//! [`PlaybackSource`] what is playing and, when the track changes, resolves a
//! video through a [`VideoResolver`] and hands it to a [`VideoPlayer`].
//! Progress is reported as [`SyncEvent`]s over an async channel.

mod controller;
mod engine;
mod events;
mod traits;

#[cfg(test)]
pub(crate) mod fakes;

pub use controller::{ControlError, SyncController};
pub use engine::{LoopSettings, Services};
pub use events::{EventSink, Status, StatusLevel, SyncEvent};
pub use traits::{PlaybackSource, PlayerExit, VideoPlayer, VideoResolver};
