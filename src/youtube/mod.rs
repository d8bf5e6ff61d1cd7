//! YouTube Data API module: resolves track queries to a single video.

mod client;
mod error;
mod types;

pub use client::YoutubeClient;
pub use error::YoutubeError;
pub use types::SearchResponse;
