//! Spotify Web API module.
//!
//! Handles the token session, playback polling, volume save/restore and
//! transport commands.

mod auth;
mod client;
mod error;
mod types;

pub use auth::SpotifyAuth;
pub use client::{SpotifyClient, MUTE_THRESHOLD};
pub use error::SpotifyError;
pub use types::*;
