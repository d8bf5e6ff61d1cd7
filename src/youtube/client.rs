//! YouTube Data API client.

use async_trait::async_trait;
use reqwest::Client;

use super::error::YoutubeError;
use super::types::{ApiErrorBody, SearchResponse};
use crate::media::VideoMatch;
use crate::sync::VideoResolver;

pub const API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Resolves search queries to the top-ranked YouTube video.
pub struct YoutubeClient {
  http: Client,
  api_key: String,
  api_url: String,
}

impl YoutubeClient {
  /// Create a new YouTube client.
  pub fn new(api_key: impl Into<String>) -> Self {
    Self::with_api_url(api_key, API_URL)
  }

  pub fn with_api_url(api_key: impl Into<String>, api_url: &str) -> Self {
    Self {
      http: Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()
        .expect("Failed to create HTTP client"),
      api_key: api_key.into(),
      api_url: api_url.trim_end_matches('/').to_string(),
    }
  }

  /// One `search.list` call, top result only.
  async fn search_top(&self, query: &str) -> Result<Option<VideoMatch>, YoutubeError> {
    let url = format!("{}/search", self.api_url);
    let response = self
      .http
      .get(&url)
      .query(&[
        ("part", "snippet"),
        ("q", query),
        ("type", "video"),
        ("maxResults", "1"),
        ("key", self.api_key.as_str()),
      ])
      .send()
      .await
      .map_err(redact)?;

    let status = response.status();
    if !status.is_success() {
      let text = response.text().await.unwrap_or_default();
      let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|body| body.error.message)
        .unwrap_or(text);
      log::error!("YouTube search failed with status {}: {}", status, message);
      return Err(YoutubeError::Api {
        status: status.as_u16(),
        message,
      });
    }

    let body: SearchResponse = serde_json::from_str(&response.text().await.map_err(redact)?)?;
    Ok(body.into_top_match())
  }

  /// Run a throwaway search to verify the API key; returns the title found.
  pub async fn check_key(&self) -> Result<Option<String>, YoutubeError> {
    Ok(self.search_top("test").await?.map(|video| video.title))
  }
}

/// The request URL carries the API key; keep it out of error text.
fn redact(e: reqwest::Error) -> YoutubeError {
  YoutubeError::Http(e.without_url())
}

#[async_trait]
impl VideoResolver for YoutubeClient {
  async fn search(&self, query: &str) -> Result<Option<VideoMatch>, YoutubeError> {
    let query = query.trim();
    if query.is_empty() {
      log::warn!("Skipping YouTube search for an empty query");
      return Ok(None);
    }
    log::debug!("Searching YouTube for: {}", query);
    self.search_top(query).await
  }
}
