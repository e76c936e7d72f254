//! HTTP client for the governance tenant REST APIs.
//!
//! Wraps a shared `reqwest` client with bearer-token injection, 429 retry
//! handling and offset pagination. Endpoint modules build on the verb
//! helpers here; nothing outside this file talks to the wire directly.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::auth::TokenCache;
use crate::config::ConnectorConfig;
use crate::error::{SodError, SodResult};
use crate::rate_limit::RateLimiter;

/// Page size for offset-paginated list endpoints.
pub(crate) const LIST_PAGE_SIZE: usize = 250;

const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

/// A single JSON Patch operation (RFC 6902).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOperation {
    pub op: &'static str,
    pub path: &'static str,
    pub value: Value,
}

impl PatchOperation {
    /// A `replace` operation for the given pointer path.
    pub fn replace(path: &'static str, value: Value) -> Self {
        Self {
            op: "replace",
            path,
            value,
        }
    }
}

/// Authenticated client for one tenant.
///
/// Cloning is cheap and shares the token cache and throttling state.
#[derive(Debug, Clone)]
pub struct IscClient {
    http_client: reqwest::Client,
    base_url: String,
    token_cache: Arc<TokenCache>,
    rate_limiter: Arc<RateLimiter>,
}

impl IscClient {
    /// Builds a client from the connector configuration.
    pub fn new(config: &ConnectorConfig) -> SodResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("sodsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let token_cache = TokenCache::new(config, http_client.clone());
        Ok(Self {
            base_url: config.base_url().to_string(),
            token_cache: Arc::new(token_cache),
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            http_client,
        })
    }

    /// Current throttling state, for diagnostics.
    pub async fn rate_limit_state(&self) -> crate::rate_limit::RateLimitState {
        self.rate_limiter.state().await
    }

    #[instrument(skip(self, query))]
    pub(crate) async fn get_json(&self, path: &str, query: &[(&str, String)]) -> SodResult<Value> {
        let response = self.execute(Method::GET, path, query, None, None).await?;
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    #[instrument(skip(self, query, body))]
    pub(crate) async fn post_json<B>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> SodResult<Value>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        let response = self
            .execute(Method::POST, path, query, Some(&body), None)
            .await?;
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    /// Sends an RFC 6902 patch document.
    #[instrument(skip(self, operations))]
    pub(crate) async fn patch_json(
        &self,
        path: &str,
        operations: &[PatchOperation],
    ) -> SodResult<Value> {
        let body = serde_json::to_value(operations)?;
        let response = self
            .execute(
                Method::PATCH,
                path,
                &[],
                Some(&body),
                Some(JSON_PATCH_CONTENT_TYPE),
            )
            .await?;
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    #[instrument(skip(self, body))]
    pub(crate) async fn put_json<B>(&self, path: &str, body: &B) -> SodResult<Value>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        let response = self
            .execute(Method::PUT, path, &[], Some(&body), None)
            .await?;
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    #[instrument(skip(self))]
    pub(crate) async fn delete(&self, path: &str) -> SodResult<()> {
        let response = self.execute(Method::DELETE, path, &[], None, None).await?;
        if !response.status().is_success() {
            return Err(api_error_from_response(response).await);
        }
        Ok(())
    }

    /// Fetches every page of an offset-paginated list endpoint.
    pub(crate) async fn get_paginated(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> SodResult<Vec<Value>> {
        let mut items = Vec::new();
        let mut offset = 0usize;
        loop {
            let mut page_query: Vec<(&str, String)> = query.to_vec();
            page_query.push(("offset", offset.to_string()));
            page_query.push(("limit", LIST_PAGE_SIZE.to_string()));

            let page: Vec<Value> = serde_json::from_value(self.get_json(path, &page_query).await?)?;
            let page_len = page.len();
            items.extend(page);

            if page_len < LIST_PAGE_SIZE {
                break;
            }
            offset += LIST_PAGE_SIZE;
        }
        Ok(items)
    }

    /// Sends one request, retrying while the tenant answers 429.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        content_type: Option<&'static str>,
    ) -> SodResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempts: u32 = 0;
        loop {
            let token = self.token_cache.get_token().await?;
            let mut request = self
                .http_client
                .request(method.clone(), &url)
                .bearer_auth(&token);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = match content_type {
                    Some(content_type) => request
                        .header(CONTENT_TYPE, content_type)
                        .body(serde_json::to_vec(body)?),
                    None => request.json(body),
                };
            }

            let response = request.send().await?;
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                self.rate_limiter
                    .handle_throttled_response(retry_after.as_deref(), attempts)
                    .await?;
                attempts += 1;
                continue;
            }
            self.rate_limiter.record_success().await;
            return Ok(response);
        }
    }
}

/// Turns a non-success response into an `Api` error, extracting the
/// tenant's `{detailCode, messages: [{text}]}` shape when present.
async fn api_error_from_response(response: reqwest::Response) -> SodError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    parse_api_error(status, &body)
}

fn parse_api_error(status: u16, body: &str) -> SodError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|parsed| {
            let detail_code = parsed.get("detailCode").and_then(Value::as_str);
            let text = parsed
                .get("messages")
                .and_then(Value::as_array)
                .and_then(|messages| messages.first())
                .and_then(|message| message.get("text"))
                .and_then(Value::as_str);
            match (detail_code, text) {
                (Some(code), Some(text)) => Some(format!("{code}: {text}")),
                (Some(code), None) => Some(code.to_string()),
                (None, Some(text)) => Some(text.to_string()),
                (None, None) => None,
            }
        })
        .unwrap_or_else(|| body.trim().to_string());
    SodError::Api { status, message }
}
