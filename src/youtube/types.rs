//! YouTube Data API v3 search types.

use serde::Deserialize;

use crate::media::VideoMatch;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// `search.list` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
  #[serde(default)]
  pub items: Vec<SearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
  pub id: ResourceId,
  pub snippet: Snippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
  #[serde(default)]
  pub video_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Snippet {
  pub title: String,
  #[serde(default)]
  pub thumbnails: Thumbnails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
  #[serde(default)]
  pub high: Option<Thumbnail>,
  #[serde(default)]
  pub medium: Option<Thumbnail>,
  #[serde(default)]
  pub default: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
  pub url: String,
}

/// Error body returned by Google APIs.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
  pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
  #[serde(default)]
  pub message: String,
}

impl Thumbnails {
  /// Largest available thumbnail.
  pub fn best(&self) -> Option<&Thumbnail> {
    self
      .high
      .as_ref()
      .or(self.medium.as_ref())
      .or(self.default.as_ref())
  }
}

impl SearchResponse {
  /// Top-ranked video, with its title decoded to plain text.
  pub fn into_top_match(self) -> Option<VideoMatch> {
    self.items.into_iter().find_map(|item| {
      let video_id = item.id.video_id?;
      Some(VideoMatch {
        url: format!("{}{}", WATCH_URL, video_id),
        id: video_id,
        title: html_escape::decode_html_entities(&item.snippet.title).into_owned(),
        thumbnail_url: item.snippet.thumbnails.best().map(|t| t.url.clone()),
      })
    })
  }
}
