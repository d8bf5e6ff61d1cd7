//! Spotify token handling: token cache, refresh, and authorization code
//! exchange.
//!
//! The interactive consent step happens in the user's browser; this module
//! only builds the consent URL and trades the returned code for tokens.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::{Client, Url};

use super::error::SpotifyError;
use super::types::{TokenResponse, TokenSet};
use crate::config::SpotifyConfig;

pub const ACCOUNTS_URL: &str = "https://accounts.spotify.com";

/// Token endpoint client plus the on-disk token cache.
pub struct SpotifyAuth {
  http: Client,
  config: SpotifyConfig,
  cache_path: PathBuf,
  accounts_url: String,
}

impl SpotifyAuth {
  pub fn new(http: Client, config: SpotifyConfig, cache_path: PathBuf) -> Self {
    Self::with_accounts_url(http, config, cache_path, ACCOUNTS_URL)
  }

  pub fn with_accounts_url(
    http: Client,
    config: SpotifyConfig,
    cache_path: PathBuf,
    accounts_url: &str,
  ) -> Self {
    Self {
      http,
      config,
      cache_path,
      accounts_url: accounts_url.trim_end_matches('/').to_string(),
    }
  }

  pub fn cache_path(&self) -> &Path {
    &self.cache_path
  }

  /// Consent page URL the user opens to grant access.
  pub fn authorize_url(&self) -> Result<String, SpotifyError> {
    let base = format!("{}/authorize", self.accounts_url);
    let url = Url::parse_with_params(
      &base,
      &[
        ("client_id", self.config.client_id.as_str()),
        ("response_type", "code"),
        ("redirect_uri", self.config.redirect_uri.as_str()),
        ("scope", self.config.scope.as_str()),
      ],
    )
    .map_err(|e| SpotifyError::Auth(format!("Invalid accounts URL: {}", e)))?;
    Ok(url.to_string())
  }

  /// Exchange an authorization code for tokens and store them in the cache.
  pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, SpotifyError> {
    let response = self
      .request_token(&[
        ("grant_type", "authorization_code"),
        ("code", code.trim()),
        ("redirect_uri", self.config.redirect_uri.as_str()),
      ])
      .await?;
    let tokens = TokenSet::from_response(response, None, unix_now());
    self.save_cache(&tokens)?;
    log::info!("Stored Spotify tokens in {}", self.cache_path.display());
    Ok(tokens)
  }

  /// Trade a refresh token for a fresh access token.
  pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, SpotifyError> {
    let response = self
      .request_token(&[
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
      ])
      .await?;
    log::info!("Refreshed Spotify access token (expires in {}s)", response.expires_in);
    Ok(TokenSet::from_response(response, Some(refresh_token), unix_now()))
  }

  async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, SpotifyError> {
    let url = format!("{}/api/token", self.accounts_url);
    let response = self
      .http
      .post(&url)
      .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
      .form(form)
      .send()
      .await
      .map_err(|e| SpotifyError::Auth(format!("Token request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
      let text = response.text().await.unwrap_or_default();
      return Err(SpotifyError::Auth(format!("HTTP {}: {}", status, text)));
    }

    response
      .json()
      .await
      .map_err(|e| SpotifyError::Auth(format!("Malformed token response: {}", e)))
  }

  /// Read the token cache.
  pub fn load_cache(&self) -> Result<TokenSet, SpotifyError> {
    let content = std::fs::read_to_string(&self.cache_path).map_err(|e| {
      SpotifyError::Auth(format!(
        "No usable token cache at {} ({}); run `spotube authorize` first",
        self.cache_path.display(),
        e
      ))
    })?;
    serde_json::from_str(&content)
      .map_err(|e| SpotifyError::Auth(format!("Corrupt token cache: {}", e)))
  }

  pub fn save_cache(&self, tokens: &TokenSet) -> Result<(), SpotifyError> {
    let json = serde_json::to_string_pretty(tokens)?;
    if let Some(parent) = self.cache_path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)
        .map_err(|e| SpotifyError::Auth(format!("Cannot create token cache dir: {}", e)))?;
    }
    std::fs::write(&self.cache_path, json)
      .map_err(|e| SpotifyError::Auth(format!("Cannot write token cache: {}", e)))
  }
}

pub(crate) fn unix_now() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0)
}
