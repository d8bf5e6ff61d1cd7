//! Spotify Web API client: playback polling, volume and transport commands.

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{header, Client, Method, Response, StatusCode};

use super::auth::{unix_now, SpotifyAuth};
use super::error::SpotifyError;
use super::types::*;
use crate::config::SpotifyConfig;
use crate::media::TrackSnapshot;
use crate::sync::PlaybackSource;

pub const API_URL: &str = "https://api.spotify.com/v1";

/// Volume levels at or below this count as muting.
pub const MUTE_THRESHOLD: u8 = 5;

/// Spotify playback source.
pub struct SpotifyClient {
  http: Client,
  auth: SpotifyAuth,
  api_url: String,
  /// Lazily loaded from the token cache on first use.
  session: Mutex<Option<TokenSet>>,
  /// Volume seen before the first mute, until restored.
  volume_backup: Mutex<Option<u8>>,
}

impl SpotifyClient {
  /// Create a new Spotify client.
  pub fn new(config: SpotifyConfig, token_cache: PathBuf) -> Self {
    Self::with_endpoints(config, token_cache, API_URL, super::auth::ACCOUNTS_URL)
  }

  /// Create a client talking to custom endpoints.
  pub fn with_endpoints(
    config: SpotifyConfig,
    token_cache: PathBuf,
    api_url: &str,
    accounts_url: &str,
  ) -> Self {
    let http = Client::builder()
      .timeout(std::time::Duration::from_secs(15))
      .build()
      .expect("Failed to create HTTP client");

    Self {
      auth: SpotifyAuth::with_accounts_url(http.clone(), config, token_cache, accounts_url),
      http,
      api_url: api_url.trim_end_matches('/').to_string(),
      session: Mutex::new(None),
      volume_backup: Mutex::new(None),
    }
  }

  pub fn auth(&self) -> &SpotifyAuth {
    &self.auth
  }

  /// Volume recorded by the last mute, if not yet restored.
  pub fn volume_backup(&self) -> Option<u8> {
    *self.volume_backup.lock()
  }

  /// Get a valid access token, loading or refreshing the session as needed.
  async fn access_token(&self) -> Result<String, SpotifyError> {
    let cached = self.session.lock().clone();
    let tokens = match cached {
      Some(tokens) => tokens,
      None => self.auth.load_cache()?,
    };

    let tokens = if tokens.is_expired(unix_now()) {
      let refresh_token = tokens.refresh_token.clone().ok_or_else(|| {
        SpotifyError::Auth("Access token expired and no refresh token is cached".to_string())
      })?;
      let fresh = self.auth.refresh(&refresh_token).await?;
      if let Err(e) = self.auth.save_cache(&fresh) {
        log::warn!("Failed to update token cache: {}", e);
      }
      fresh
    } else {
      tokens
    };

    let token = tokens.access_token.clone();
    *self.session.lock() = Some(tokens);
    Ok(token)
  }

  /// Make an authenticated request and map error statuses.
  async fn request(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<Response, SpotifyError> {
    let token = self.access_token().await?;
    let url = format!("{}{}", self.api_url, path);

    let mut builder = self
      .http
      .request(method.clone(), &url)
      .bearer_auth(token)
      .query(query);
    if method != Method::GET {
      builder = builder.header(header::CONTENT_LENGTH, 0);
    }
    let response = builder.send().await?;

    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    match status {
      StatusCode::UNAUTHORIZED => {
        // Drop the session so the next call reloads or refreshes it.
        self.session.lock().take();
        let message = error_message(response).await;
        Err(SpotifyError::Auth(format!("HTTP 401: {}", message)))
      }
      StatusCode::TOO_MANY_REQUESTS => {
        let retry_after = response
          .headers()
          .get(header::RETRY_AFTER)
          .and_then(|v| v.to_str().ok())
          .and_then(|v| v.parse().ok())
          .unwrap_or(1);
        Err(SpotifyError::RateLimited(retry_after))
      }
      _ => {
        let message = error_message(response).await;
        log::debug!("{} {} failed: HTTP {} - {}", method, path, status, message);
        Err(SpotifyError::Api {
          status: status.as_u16(),
          message,
        })
      }
    }
  }

  /// Current playback state, `None` when no device is active.
  async fn playback(&self) -> Result<Option<CurrentPlayback>, SpotifyError> {
    let response = self.request(Method::GET, "/me/player", &[]).await?;
    if response.status() == StatusCode::NO_CONTENT {
      return Ok(None);
    }
    let text = response.text().await?;
    if text.trim().is_empty() {
      return Ok(None);
    }
    Ok(Some(serde_json::from_str(&text)?))
  }

  async fn put_volume(&self, level: u8) -> Result<(), SpotifyError> {
    self
      .request(
        Method::PUT,
        "/me/player/volume",
        &[("volume_percent", level.to_string())],
      )
      .await?;
    Ok(())
  }

  /// Display name of the authorized user, to verify credentials.
  pub async fn check_connection(&self) -> Result<String, SpotifyError> {
    let profile: UserProfile = self.request(Method::GET, "/me", &[]).await?.json().await?;
    Ok(profile.display_name.unwrap_or(profile.id))
  }
}

#[async_trait]
impl PlaybackSource for SpotifyClient {
  async fn current(&self) -> Result<Option<TrackSnapshot>, SpotifyError> {
    Ok(self.playback().await?.and_then(CurrentPlayback::into_snapshot))
  }

  async fn set_volume(&self, level: u8) -> Result<(), SpotifyError> {
    let level = level.min(100);

    // Remember the pre-mute volume, but only the first time.
    let has_backup = self.volume_backup().is_some();
    let observed = if level <= MUTE_THRESHOLD && !has_backup {
      self
        .playback()
        .await?
        .filter(|p| p.device.is_some())
        .map(|p| p.device_volume().unwrap_or(100))
    } else {
      None
    };

    self.put_volume(level).await?;

    if let Some(observed) = observed {
      let mut backup = self.volume_backup.lock();
      if backup.is_none() {
        log::info!("Saved Spotify volume {} before muting", observed);
        *backup = Some(observed);
      }
    }
    Ok(())
  }

  async fn restore_volume(&self) -> Result<(), SpotifyError> {
    let Some(previous) = self.volume_backup() else {
      return Ok(());
    };
    self.put_volume(previous).await?;
    self.volume_backup.lock().take();
    log::info!("Restored Spotify volume to {}", previous);
    Ok(())
  }

  async fn skip_next(&self) -> Result<(), SpotifyError> {
    self.request(Method::POST, "/me/player/next", &[]).await?;
    Ok(())
  }

  async fn skip_previous(&self) -> Result<(), SpotifyError> {
    self.request(Method::POST, "/me/player/previous", &[]).await?;
    Ok(())
  }
}

async fn error_message(response: Response) -> String {
  let text = response.text().await.unwrap_or_default();
  serde_json::from_str::<ApiErrorBody>(&text)
    .map(|body| body.error.message)
    .unwrap_or(text)
}
