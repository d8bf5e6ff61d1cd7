//! MPV module - launches the external MPV player for each matched video.
//!
//! - `process.rs` - binary detection, argument building, spawning and the
//!   system-wide sweep
//! - `client.rs` - `MpvPlayer`, which tracks the single live process

mod client;
mod process;

pub use client::{MpvError, MpvPlayer};
pub use process::{build_args, find_mpv, sanitize_title, PlayerOptions, ProcessError};
