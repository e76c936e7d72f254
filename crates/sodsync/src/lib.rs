//! Separation-of-duties policy reconciliation for Identity Security Cloud
//!
//! This crate reads declarative policy configuration records from a source
//! in the tenant and converges the tenant to them: each record drives the
//! creation, update, scheduling or deletion of an SOD policy and the
//! certification campaign template derived from it.
//!
//! # Features
//!
//! - `OAuth2` client credentials authentication with token caching
//! - Entitlement discovery through the Search API, with pagination
//! - Policy create/update/delete via the SOD-Policies API
//! - Recurring violation report schedules with recipient resolution
//! - Campaign template create/update/delete with access constraints
//! - Governance group expansion for report recipients
//! - Automatic retry with exponential backoff on rate limiting
//! - Optional parallel processing with a dedicated session per record
//!
//! # Example
//!
//! ```no_run
//! use sodsync::{ConnectorConfig, SodConnector};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config: ConnectorConfig = serde_json::from_str(
//!     r#"{
//!         "apiUrl": "https://tenant.api.identitynow.com",
//!         "clientId": "client-id",
//!         "clientSecret": "client-secret",
//!         "policyConfigSourceName": "SOD Policy Configuration"
//!     }"#,
//! )?;
//!
//! let connector = SodConnector::new(config)?;
//! connector.test_connection().await?;
//! for result in connector.reconcile_all().await? {
//!     println!("{}: configured={}", result.policy_name, result.policy_configured);
//! }
//! # Ok(())
//! # }
//! ```

mod api;
mod auth;
mod campaigns;
mod client;
mod config;
mod connector;
mod criteria;
mod engine;
mod error;
mod groups;
mod policies;
mod policy_config;
mod rate_limit;
mod resolver;
mod result;
mod schedule;
mod search;
mod sources;

// Re-exports
pub use api::IscApi;
pub use auth::TokenCache;
pub use campaigns::{
    Campaign, CampaignTemplate, CampaignType, CorrelatedStatus, SearchCampaignInfo,
    SearchCampaignType,
};
pub use client::{IscClient, PatchOperation};
pub use config::ConnectorConfig;
pub use connector::SodConnector;
pub use criteria::{
    build_access_constraints, build_conflicting_access_criteria, AccessConstraint,
    AccessConstraintSummary, AccessCriteria, AccessItemType, ConflictingAccessCriteria,
    ConstraintOperator, CriteriaItem, SideAccessItems,
};
pub use engine::ReconciliationEngine;
pub use error::{SodError, SodResult};
pub use policies::{
    AssignmentRule, PolicyState, SodPolicy, SodPolicySchedule, SodPolicyType,
    ViolationOwnerAssignmentConfig,
};
pub use policy_config::{
    ConfigRecord, OwnerType, PolicyAction, PolicyConfig, PolicyType, ViolationOwnerType,
};
pub use rate_limit::{RateLimitConfig, RateLimitState, RateLimiter};
pub use resolver::{OwnerRefType, ReferenceResolver, ResolvedOwner};
pub use result::PolicyReconciliationResult;
pub use schedule::{
    build_schedule, Schedule, ScheduleKind, ScheduleType, ScheduleValueType, ScheduleValues,
};
pub use search::{display_names, entitlement_display_names, SearchDocument, SourceRef};
