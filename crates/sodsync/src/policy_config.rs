//! Typed view of a policy configuration record.
//!
//! Records are accounts on the configuration source. Their attribute bag is
//! parsed once into a `PolicyConfig`; the engine never touches raw
//! attributes. Keyword fields (types, actions, schedules) are normalized
//! here, free-text fields are carried verbatim.

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Raw account from the configuration source.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Kind of policy a record declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyType {
    /// Separation-of-duties policy, the only kind reconciled.
    Sod,
    /// Anything else; the record is skipped.
    Other(String),
}

impl PolicyType {
    fn parse(raw: &str) -> Self {
        match raw {
            "SOD" => Self::Sod,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sod => f.write_str("SOD"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Referenced object kind for the policy owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerType {
    Identity,
    GovernanceGroup,
    /// Unrecognized value, echoed back in diagnostics.
    Other(String),
}

impl OwnerType {
    fn parse(raw: &str) -> Self {
        match raw {
            "IDENTITY" => Self::Identity,
            "GOVERNANCE_GROUP" => Self::GovernanceGroup,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("IDENTITY"),
            Self::GovernanceGroup => f.write_str("GOVERNANCE_GROUP"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Referenced object kind for the violation owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationOwnerType {
    Identity,
    GovernanceGroup,
    /// Violations go to each violator's manager instead of a fixed owner.
    Manager,
    /// Unrecognized value, echoed back in diagnostics.
    Other(String),
}

impl ViolationOwnerType {
    fn parse(raw: &str) -> Self {
        match raw {
            "IDENTITY" => Self::Identity,
            "GOVERNANCE_GROUP" => Self::GovernanceGroup,
            "MANAGER" => Self::Manager,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ViolationOwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("IDENTITY"),
            Self::GovernanceGroup => f.write_str("GOVERNANCE_GROUP"),
            Self::Manager => f.write_str("MANAGER"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Processing step a record requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    /// Configure a recurring violation report schedule.
    Report,
    /// Maintain a certification campaign template for the policy.
    Certify,
    /// Delete the campaign template.
    DeleteCampaign,
    /// Delete the policy and the campaign template.
    DeleteAll,
}

impl PolicyAction {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "REPORT" => Some(Self::Report),
            "CERTIFY" => Some(Self::Certify),
            "DELETE_CAMPAIGN" => Some(Self::DeleteCampaign),
            "DELETE_ALL" => Some(Self::DeleteAll),
            _ => None,
        }
    }
}

/// One record's declared policy, parsed from its attribute bag.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    pub policy_name: String,
    pub policy_type: PolicyType,
    pub policy_description: Option<String>,
    pub policy_owner_type: OwnerType,
    pub policy_owner: String,
    /// Whether the policy is enforced once configured.
    pub policy_enabled: bool,
    pub external_reference: Option<String>,
    pub tags: Vec<String>,
    pub query1_name: String,
    pub query1: String,
    pub query2_name: String,
    pub query2: String,
    pub violation_owner_type: ViolationOwnerType,
    pub violation_owner: String,
    pub mitigating_controls: Option<String>,
    pub correction_advice: Option<String>,
    pub actions: Vec<PolicyAction>,
    /// Raw report schedule keyword; kept verbatim for diagnostics.
    pub policy_schedule: String,
    pub certification_name: String,
    pub certification_description: String,
    /// Raw campaign schedule keyword; kept verbatim for diagnostics.
    pub certification_schedule: String,
}

impl PolicyConfig {
    /// Parses a configuration record. Missing attributes become empty
    /// values; the engine validates what each phase actually needs.
    pub fn from_record(record: &ConfigRecord) -> Self {
        let attributes = &record.attributes;
        let text = |key: &str| attribute_text(attributes, key).unwrap_or_default();

        let enabled_raw = text("PolicyEnabled").to_lowercase();
        let policy_enabled = enabled_raw == "true" || enabled_raw == "yes";

        Self {
            policy_name: text("PolicyName"),
            policy_type: PolicyType::parse(&text("PolicyType")),
            policy_description: attribute_text(attributes, "PolicyDescription"),
            policy_owner_type: OwnerType::parse(&text("PolicyOwnerType")),
            policy_owner: text("PolicyOwner"),
            policy_enabled,
            external_reference: attribute_text(attributes, "ExternalReference"),
            tags: split_list(&text("Tags")),
            query1_name: text("Query1Name"),
            query1: text("Query1"),
            query2_name: text("Query2Name"),
            query2: text("Query2"),
            violation_owner_type: ViolationOwnerType::parse(&text("ViolationOwnerType")),
            violation_owner: text("ViolationOwner"),
            mitigating_controls: attribute_text(attributes, "MitigatingControls"),
            correction_advice: attribute_text(attributes, "CorrectionAdvice"),
            actions: parse_actions(&text("Actions")),
            policy_schedule: text("PolicySchedule"),
            certification_name: text("CertificationName"),
            certification_description: text("CertificationDescription"),
            certification_schedule: text("CertificationSchedule"),
        }
    }

    /// Whether the record requested the given action.
    pub fn has_action(&self, action: PolicyAction) -> bool {
        self.actions.contains(&action)
    }
}

fn attribute_text(attributes: &Map<String, Value>, key: &str) -> Option<String> {
    match attributes.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Splits a comma-separated attribute, preserving entries verbatim.
fn split_list(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::to_string).collect()
}

/// Parses the Actions attribute. Unknown keywords are silently ignored.
fn parse_actions(raw: &str) -> Vec<PolicyAction> {
    raw.split(',')
        .filter_map(|token| PolicyAction::parse(token.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_with(attributes: Value) -> ConfigRecord {
        serde_json::from_value(json!({
            "id": "acct-1",
            "name": "Finance SOD",
            "attributes": attributes
        }))
        .unwrap()
    }

    #[test]
    fn test_full_record_parses_all_fields() {
        let record = record_with(json!({
            "PolicyName": "Finance SOD",
            "PolicyType": "SOD",
            "PolicyDescription": "Payables vs receivables",
            "PolicyOwnerType": "IDENTITY",
            "PolicyOwner": "ada.prentiss",
            "PolicyEnabled": "true",
            "ExternalReference": "GRC-42",
            "Tags": "FINANCE,SOX",
            "Query1Name": "Payables",
            "Query1": "source.name:\"Oracle EBS\" AND attribute:payables",
            "Query2Name": "Receivables",
            "Query2": "source.name:\"Oracle EBS\" AND attribute:receivables",
            "ViolationOwnerType": "IDENTITY",
            "ViolationOwner": "grace.wu",
            "MitigatingControls": "Quarterly review",
            "CorrectionAdvice": "Remove one side",
            "Actions": "REPORT,CERTIFY",
            "PolicySchedule": "WEEKLY",
            "CertificationName": "Finance SOD Campaign",
            "CertificationDescription": "Certify conflicting finance access",
            "CertificationSchedule": "MONTHLY"
        }));

        let config = PolicyConfig::from_record(&record);

        assert_eq!(config.policy_name, "Finance SOD");
        assert_eq!(config.policy_type, PolicyType::Sod);
        assert_eq!(config.policy_owner_type, OwnerType::Identity);
        assert!(config.policy_enabled);
        assert_eq!(config.tags, vec!["FINANCE", "SOX"]);
        assert_eq!(config.violation_owner_type, ViolationOwnerType::Identity);
        assert_eq!(
            config.actions,
            vec![PolicyAction::Report, PolicyAction::Certify]
        );
        assert_eq!(config.policy_schedule, "WEEKLY");
        assert_eq!(config.certification_name, "Finance SOD Campaign");
    }

    #[test]
    fn test_enabled_accepts_true_and_yes_case_insensitively() {
        for raw in ["true", "TRUE", "yes", "Yes"] {
            let record = record_with(json!({"PolicyEnabled": raw}));
            assert!(
                PolicyConfig::from_record(&record).policy_enabled,
                "{raw} should enable the policy"
            );
        }
        for raw in ["false", "no", "enabled", ""] {
            let record = record_with(json!({"PolicyEnabled": raw}));
            assert!(!PolicyConfig::from_record(&record).policy_enabled);
        }
    }

    #[test]
    fn test_missing_attributes_default_to_empty() {
        let record = record_with(json!({}));
        let config = PolicyConfig::from_record(&record);

        assert_eq!(config.policy_name, "");
        assert_eq!(config.policy_type, PolicyType::Other(String::new()));
        assert!(config.policy_description.is_none());
        assert!(!config.policy_enabled);
        assert!(config.tags.is_empty());
        assert!(config.actions.is_empty());
    }

    #[test]
    fn test_unknown_actions_are_ignored() {
        let record = record_with(json!({"Actions": "REPORT, CERTIFY,ARCHIVE,delete_all"}));
        let config = PolicyConfig::from_record(&record);

        assert_eq!(
            config.actions,
            vec![PolicyAction::Report, PolicyAction::Certify]
        );
    }

    #[test]
    fn test_unrecognized_owner_types_are_echoed() {
        let record = record_with(json!({
            "PolicyOwnerType": "WORKGROUP",
            "ViolationOwnerType": "MANAGER"
        }));
        let config = PolicyConfig::from_record(&record);

        assert_eq!(
            config.policy_owner_type,
            OwnerType::Other("WORKGROUP".to_string())
        );
        assert_eq!(config.policy_owner_type.to_string(), "WORKGROUP");
        assert_eq!(config.violation_owner_type, ViolationOwnerType::Manager);
    }

    #[test]
    fn test_has_action() {
        let record = record_with(json!({"Actions": "DELETE_ALL"}));
        let config = PolicyConfig::from_record(&record);

        assert!(config.has_action(PolicyAction::DeleteAll));
        assert!(!config.has_action(PolicyAction::Certify));
    }

    #[test]
    fn test_non_string_scalars_are_accepted() {
        let record = record_with(json!({
            "PolicyEnabled": true,
            "PolicyName": 42
        }));
        let config = PolicyConfig::from_record(&record);

        assert!(config.policy_enabled);
        assert_eq!(config.policy_name, "42");
    }
}
