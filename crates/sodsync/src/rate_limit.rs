//! Retry handling for throttled tenant API requests.
//!
//! The tenant signals throttling with HTTP 429 and an optional `Retry-After`
//! header. Only 429 responses are retried; every other failure class is
//! surfaced to the caller unchanged. Waits honor `Retry-After` when present
//! and otherwise use exponential backoff with jitter.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{SodError, SodResult};

fn default_base_delay_ms() -> u64 {
    2_000
}

fn default_max_delay_ms() -> u64 {
    300_000
}

fn default_jitter_factor() -> f64 {
    0.25
}

fn default_max_retries() -> u32 {
    10
}

/// Tunable retry behavior for throttled requests.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Ceiling on any single wait, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Fraction of the computed delay added as random jitter (0.0 to 1.0).
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,

    /// Retries attempted before giving up on a throttled request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_factor: default_jitter_factor(),
            max_retries: default_max_retries(),
        }
    }
}

impl RateLimitConfig {
    /// Short delays for tests that exercise the retry path.
    pub fn for_testing() -> Self {
        Self {
            base_delay_ms: 10,
            max_delay_ms: 100,
            jitter_factor: 0.0,
            max_retries: 3,
        }
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_delay_ms == 0 {
            return Err("baseDelayMs must be greater than zero".to_string());
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err("maxDelayMs must be at least baseDelayMs".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err("jitterFactor must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }
}

/// Observable throttling state, shared across clones of a client.
#[derive(Debug, Clone, Default)]
pub struct RateLimitState {
    /// Whether the most recent request was throttled.
    pub is_throttled: bool,
    /// Server-mandated quiet period, if a `Retry-After` header was seen.
    pub retry_after_until: Option<DateTime<Utc>>,
    /// Consecutive 429 responses without an intervening success.
    pub consecutive_throttles: u32,
    /// When the most recent 429 was received.
    pub last_throttled_at: Option<DateTime<Utc>>,
}

impl RateLimitState {
    fn record_throttle(&mut self, retry_after_secs: Option<u64>) {
        self.is_throttled = true;
        self.consecutive_throttles += 1;
        self.last_throttled_at = Some(Utc::now());
        if let Some(secs) = retry_after_secs {
            self.retry_after_until = Some(Utc::now() + chrono::Duration::seconds(secs as i64));
        }
    }

    fn record_success(&mut self) {
        self.is_throttled = false;
        self.consecutive_throttles = 0;
        self.retry_after_until = None;
    }

    /// Whether a server-mandated quiet period is still in effect.
    pub fn is_within_retry_after(&self) -> bool {
        self.retry_after_until
            .map(|until| Utc::now() < until)
            .unwrap_or(false)
    }
}

/// Applies the retry policy to 429 responses.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Arc<RwLock<RateLimitState>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(RateLimitState::default())),
        }
    }

    /// Snapshot of the current throttling state.
    pub async fn state(&self) -> RateLimitState {
        self.state.read().await.clone()
    }

    /// Records a throttled response and waits before the next attempt.
    ///
    /// `attempt` is the number of retries already performed for this request.
    /// Returns `MaxRetriesExceeded` once the retry budget is spent.
    pub async fn handle_throttled_response(
        &self,
        retry_after_header: Option<&str>,
        attempt: u32,
    ) -> SodResult<()> {
        let retry_after_secs = retry_after_header.and_then(parse_retry_after);

        {
            let mut state = self.state.write().await;
            state.record_throttle(retry_after_secs);
            debug!(
                consecutive = state.consecutive_throttles,
                retry_after_secs, "request throttled by tenant"
            );
        }

        if attempt >= self.config.max_retries {
            warn!(attempts = attempt, "retry budget exhausted for throttled request");
            return Err(SodError::MaxRetriesExceeded { attempts: attempt });
        }

        let delay_ms = match retry_after_secs {
            Some(secs) => secs.saturating_mul(1000).min(self.config.max_delay_ms),
            None => self.add_jitter(self.backoff_delay_ms(attempt)),
        };
        debug!(delay_ms, attempt, "waiting before retrying throttled request");
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(())
    }

    /// Records a response that was not throttled.
    pub async fn record_success(&self) {
        self.state.write().await.record_success();
    }

    /// Exponential backoff capped at `max_delay_ms`: base * 2^attempt.
    fn backoff_delay_ms(&self, attempt: u32) -> u64 {
        let factor = 2u64.saturating_pow(attempt);
        self.config
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.config.max_delay_ms)
    }

    /// Adds up to `jitter_factor` of the delay as random extra wait.
    fn add_jitter(&self, delay_ms: u64) -> u64 {
        if self.config.jitter_factor <= 0.0 {
            return delay_ms;
        }
        let jitter_range = delay_ms as f64 * self.config.jitter_factor;
        let jitter = rand::thread_rng().gen_range(0.0..=jitter_range);
        (delay_ms + jitter as u64).min(self.config.max_delay_ms)
    }
}

/// Parses a `Retry-After` header value given in whole seconds.
fn parse_retry_after(header: &str) -> Option<u64> {
    header.trim().parse::<u64>().ok()
}
