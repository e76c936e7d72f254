//! Connector configuration.
//!
//! Configuration arrives as a flat JSON object (the shape the governance
//! platform stores for a connector instance), so every field deserializes
//! from a camelCase key. Optional fields fall back to documented defaults.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::error::{SodError, SodResult};
use crate::rate_limit::RateLimitConfig;

fn default_identity_resolution_attribute() -> String {
    "name".to_string()
}

fn default_hourly_schedule_day() -> Vec<String> {
    vec!["9".to_string()]
}

fn default_weekly_schedule_day() -> Vec<String> {
    vec!["MON".to_string()]
}

fn default_monthly_schedule_day() -> Vec<String> {
    vec!["1".to_string()]
}

fn default_campaign_duration() -> String {
    "P2W".to_string()
}

fn default_max_entitlements_per_policy_side() -> u32 {
    400
}

fn default_max_access_items_per_campaign() -> u32 {
    10_000
}

fn default_timeout_seconds() -> u64 {
    60
}

/// Connector instance configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorConfig {
    /// Base URL of the tenant API, e.g. `https://tenant.api.identitysoon.com`.
    pub api_url: String,

    /// `OAuth2` client id for the client credentials grant.
    pub client_id: String,

    /// `OAuth2` client secret for the client credentials grant.
    pub client_secret: SecretString,

    /// Name of the source whose accounts are the policy configuration records.
    pub policy_config_source_name: String,

    /// Identity attribute used to resolve owners, violation owners and
    /// reviewers. Defaults to `name`.
    #[serde(default = "default_identity_resolution_attribute")]
    pub identity_resolution_attribute: String,

    /// Hours of the day a policy schedule fires on. Accepts a single string
    /// or a list of strings.
    #[serde(
        default = "default_hourly_schedule_day",
        deserialize_with = "string_or_list"
    )]
    pub hourly_schedule_day: Vec<String>,

    /// Days of the week a WEEKLY policy schedule fires on.
    #[serde(
        default = "default_weekly_schedule_day",
        deserialize_with = "string_or_list"
    )]
    pub weekly_schedule_day: Vec<String>,

    /// Days of the month a MONTHLY policy schedule fires on.
    #[serde(
        default = "default_monthly_schedule_day",
        deserialize_with = "string_or_list"
    )]
    pub monthly_schedule_day: Vec<String>,

    /// ISO-8601 duration granted to reviewers once a campaign activates.
    #[serde(default = "default_campaign_duration")]
    pub campaign_duration: String,

    /// Upper bound on entitlements allowed on each side of a policy.
    #[serde(default = "default_max_entitlements_per_policy_side")]
    pub max_entitlements_per_policy_side: u32,

    /// Upper bound on total access items a campaign may certify.
    #[serde(default = "default_max_access_items_per_campaign")]
    pub max_access_items_per_campaign: u32,

    /// Reconcile policy records concurrently instead of sequentially.
    #[serde(default)]
    pub parallel_processing: bool,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Retry behavior for throttled requests.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl ConnectorConfig {
    /// Validates the configuration, returning the first problem found.
    pub fn validate(&self) -> SodResult<()> {
        if self.api_url.trim().is_empty() {
            return Err(SodError::Config("apiUrl must not be empty".to_string()));
        }
        if !self.api_url.starts_with("https://") && !self.api_url.starts_with("http://") {
            return Err(SodError::Config(
                "apiUrl must be an http(s) URL".to_string(),
            ));
        }
        if self.client_id.trim().is_empty() {
            return Err(SodError::Config("clientId must not be empty".to_string()));
        }
        if self.client_secret.expose_secret().is_empty() {
            return Err(SodError::Config(
                "clientSecret must not be empty".to_string(),
            ));
        }
        if self.policy_config_source_name.trim().is_empty() {
            return Err(SodError::Config(
                "policyConfigSourceName must not be empty".to_string(),
            ));
        }
        if self.identity_resolution_attribute.trim().is_empty() {
            return Err(SodError::Config(
                "identityResolutionAttribute must not be empty".to_string(),
            ));
        }
        if self.max_entitlements_per_policy_side == 0 {
            return Err(SodError::Config(
                "maxEntitlementsPerPolicySide must be greater than zero".to_string(),
            ));
        }
        if self.max_access_items_per_campaign == 0 {
            return Err(SodError::Config(
                "maxAccessItemsPerCampaign must be greater than zero".to_string(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SodError::Config(
                "timeoutSeconds must be greater than zero".to_string(),
            ));
        }
        self.rate_limit.validate().map_err(SodError::Config)
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub(crate) fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

/// Accepts either `"MON"` or `["MON", "FRI"]` for schedule day fields.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::One(value) => vec![value],
        StringOrList::Many(values) => values,
    })
}
