//! `OAuth2` client credentials authentication with token caching.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::config::ConnectorConfig;
use crate::error::{SodError, SodResult};

/// Tokens are refreshed this many seconds before their stated expiry.
const TOKEN_EXPIRY_GRACE_SECS: i64 = 60;

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[allow(dead_code)]
    token_type: Option<String>,
}

/// A cached access token with its expiry time.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self, grace: Duration) -> bool {
        Utc::now() + grace >= self.expires_at
    }
}

/// Caches `OAuth2` access tokens and refreshes them on demand.
#[derive(Debug, Clone)]
pub struct TokenCache {
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    http_client: reqwest::Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl TokenCache {
    /// Creates a token cache for the tenant named in `config`.
    ///
    /// The HTTP client is shared with the API client so connection pools
    /// are reused.
    pub fn new(config: &ConnectorConfig, http_client: reqwest::Client) -> Self {
        Self {
            token_url: format!("{}/oauth/token", config.base_url()),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            http_client,
            cached_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns a valid access token, fetching a new one if needed.
    #[instrument(skip(self))]
    pub async fn get_token(&self) -> SodResult<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired(Duration::seconds(TOKEN_EXPIRY_GRACE_SECS)) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let token = self.acquire_token().await?;
        let access_token = token.access_token.clone();
        *self.cached_token.write().await = Some(token);
        Ok(access_token)
    }

    /// Drops the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.cached_token.write().await = None;
    }

    async fn acquire_token(&self) -> SodResult<CachedToken> {
        debug!(token_url = %self.token_url, "requesting access token");

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SodError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(CachedToken {
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
            access_token: token.access_token,
        })
    }
}
