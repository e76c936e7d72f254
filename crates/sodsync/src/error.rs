//! Error types for the policy reconciliation connector.

use thiserror::Error;

/// Result type alias using `SodError`.
pub type SodResult<T> = Result<T, SodError>;

/// Errors that can occur while reconciling policies against the tenant.
#[derive(Debug, Error)]
pub enum SodError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// `OAuth2` authentication error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Tenant API rejected the request.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Maximum retry attempts exceeded.
    #[error("Maximum retries ({attempts}) exceeded for rate limit")]
    MaxRetriesExceeded { attempts: u32 },
}
