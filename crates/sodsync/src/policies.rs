//! Policy API types and endpoint calls.

use serde::{Deserialize, Serialize};
use serde_json::{to_value, Value};

use crate::client::{IscClient, PatchOperation};
use crate::criteria::ConflictingAccessCriteria;
use crate::error::SodResult;
use crate::policy_config::PolicyConfig;
use crate::resolver::ResolvedOwner;
use crate::schedule::Schedule;

const SOD_POLICIES_PATH: &str = "/v3/sod-policies";

/// Whether the tenant enforces the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyState {
    Enforced,
    #[default]
    NotEnforced,
}

/// Policy kinds the tenant knows about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SodPolicyType {
    /// Two conflicting sets of access criteria.
    #[default]
    ConflictingAccessBased,
    /// Free-form policy, not managed here.
    General,
}

/// How violations get assigned to an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentRule {
    /// A fixed identity or governance group owns every violation.
    Static,
    /// Each violator's manager owns their violations.
    Manager,
}

/// Violation owner assignment carried on a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationOwnerAssignmentConfig {
    pub assignment_rule: AssignmentRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_ref: Option<ResolvedOwner>,
}

impl ViolationOwnerAssignmentConfig {
    /// STATIC assignment when an owner resolved, MANAGER otherwise.
    pub fn from_resolved(owner: Option<ResolvedOwner>) -> Self {
        match owner {
            Some(owner) => Self {
                assignment_rule: AssignmentRule::Static,
                owner_ref: Some(owner),
            },
            None => Self {
                assignment_rule: AssignmentRule::Manager,
                owner_ref: None,
            },
        }
    }
}

/// A separation-of-duties policy, as sent to and returned by the tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SodPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_ref: Option<ResolvedOwner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_policy_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensating_controls: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_advice: Option<String>,
    #[serde(default)]
    pub state: PolicyState,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_owner_assignment_config: Option<ViolationOwnerAssignmentConfig>,
    #[serde(rename = "type", default)]
    pub policy_type: SodPolicyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_access_criteria: Option<ConflictingAccessCriteria>,
    /// Query selecting identities that violate the policy. Issued by the
    /// tenant when the policy is created or updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_query: Option<String>,
}

impl SodPolicy {
    /// The desired policy state for a record.
    pub fn from_config(
        config: &PolicyConfig,
        owner: ResolvedOwner,
        assignment: ViolationOwnerAssignmentConfig,
        criteria: ConflictingAccessCriteria,
    ) -> Self {
        let state = if config.policy_enabled {
            PolicyState::Enforced
        } else {
            PolicyState::NotEnforced
        };
        Self {
            id: None,
            name: config.policy_name.clone(),
            description: config.policy_description.clone(),
            owner_ref: Some(owner),
            external_policy_reference: config.external_reference.clone(),
            compensating_controls: config.mitigating_controls.clone(),
            correction_advice: config.correction_advice.clone(),
            state,
            tags: config.tags.clone(),
            violation_owner_assignment_config: Some(assignment),
            policy_type: SodPolicyType::ConflictingAccessBased,
            conflicting_access_criteria: Some(criteria),
            policy_query: None,
        }
    }

    /// Field replacements an update sends. Every declared field is
    /// replaced so an update converges the whole policy, not a diff.
    pub fn as_patch(&self) -> SodResult<Vec<PatchOperation>> {
        Ok(vec![
            PatchOperation::replace("/name", Value::String(self.name.clone())),
            PatchOperation::replace("/description", to_value(&self.description)?),
            PatchOperation::replace("/ownerRef", to_value(&self.owner_ref)?),
            PatchOperation::replace(
                "/externalPolicyReference",
                to_value(&self.external_policy_reference)?,
            ),
            PatchOperation::replace(
                "/compensatingControls",
                to_value(&self.compensating_controls)?,
            ),
            PatchOperation::replace("/correctionAdvice", to_value(&self.correction_advice)?),
            PatchOperation::replace("/state", to_value(self.state)?),
            PatchOperation::replace("/tags", to_value(&self.tags)?),
            PatchOperation::replace(
                "/violationOwnerAssignmentConfig",
                to_value(&self.violation_owner_assignment_config)?,
            ),
            PatchOperation::replace(
                "/conflictingAccessCriteria",
                to_value(&self.conflicting_access_criteria)?,
            ),
        ])
    }
}

/// Recurring violation report definition set on a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SodPolicySchedule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schedule: Schedule,
    pub recipients: Vec<ResolvedOwner>,
}

impl SodPolicySchedule {
    /// Names the schedule `<keyword>: <policy name>` after the record's
    /// schedule keyword.
    pub fn for_policy(
        config: &PolicyConfig,
        schedule: Schedule,
        recipients: Vec<ResolvedOwner>,
    ) -> Self {
        Self {
            name: format!("{}: {}", config.policy_schedule, config.policy_name),
            description: config.policy_description.clone(),
            schedule,
            recipients,
        }
    }
}

impl IscClient {
    /// Looks a policy up by exact name. The first match wins; a match
    /// without an id counts as absent.
    pub(crate) async fn find_policy_by_name(&self, name: &str) -> SodResult<Option<SodPolicy>> {
        let query = [("filters", format!("name eq \"{name}\""))];
        let body = self.get_json(SOD_POLICIES_PATH, &query).await?;
        let policies: Vec<SodPolicy> = serde_json::from_value(body)?;
        Ok(policies
            .into_iter()
            .next()
            .filter(|policy| policy.id.as_deref().is_some_and(|id| !id.is_empty())))
    }

    pub(crate) async fn create_sod_policy(&self, policy: &SodPolicy) -> SodResult<SodPolicy> {
        let body = self.post_json(SOD_POLICIES_PATH, &[], policy).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub(crate) async fn update_sod_policy(
        &self,
        policy_id: &str,
        desired: &SodPolicy,
    ) -> SodResult<SodPolicy> {
        let operations = desired.as_patch()?;
        let body = self
            .patch_json(&format!("{SOD_POLICIES_PATH}/{policy_id}"), &operations)
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    pub(crate) async fn delete_sod_policy(&self, policy_id: &str) -> SodResult<()> {
        self.delete(&format!("{SOD_POLICIES_PATH}/{policy_id}")).await
    }

    pub(crate) async fn put_policy_schedule(
        &self,
        policy_id: &str,
        schedule: &SodPolicySchedule,
    ) -> SodResult<()> {
        self.put_json(&format!("{SOD_POLICIES_PATH}/{policy_id}/schedule"), schedule)
            .await
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy_config::ConfigRecord;
    use serde_json::json;

    fn sample_config() -> PolicyConfig {
        let record: ConfigRecord = serde_json::from_value(json!({
            "id": "acct-1",
            "name": "Finance SOD",
            "attributes": {
                "PolicyName": "Finance SOD",
                "PolicyType": "SOD",
                "PolicyDescription": "Payables vs receivables",
                "PolicyOwnerType": "IDENTITY",
                "PolicyOwner": "ada.prentiss",
                "PolicyEnabled": "true",
                "ExternalReference": "GRC-42",
                "Tags": "FINANCE,SOX",
                "Query1Name": "Payables",
                "Query1": "q1",
                "Query2Name": "Receivables",
                "Query2": "q2",
                "ViolationOwnerType": "IDENTITY",
                "ViolationOwner": "grace.wu",
                "Actions": "REPORT,CERTIFY",
                "PolicySchedule": "WEEKLY",
                "CertificationName": "Finance SOD Campaign",
                "CertificationDescription": "Certify it",
                "CertificationSchedule": "MONTHLY"
            }
        }))
        .unwrap();
        PolicyConfig::from_record(&record)
    }

    fn sample_criteria() -> ConflictingAccessCriteria {
        crate::criteria::build_conflicting_access_criteria("Payables", &[], "Receivables", &[])
    }

    #[test]
    fn test_enabled_config_maps_to_enforced_state() {
        let mut config = sample_config();
        let owner = ResolvedOwner::identity("o1", "Ada Prentiss");
        let assignment = ViolationOwnerAssignmentConfig::from_resolved(None);

        let policy = SodPolicy::from_config(
            &config,
            owner.clone(),
            assignment.clone(),
            sample_criteria(),
        );
        assert_eq!(policy.state, PolicyState::Enforced);

        config.policy_enabled = false;
        let policy = SodPolicy::from_config(&config, owner, assignment, sample_criteria());
        assert_eq!(policy.state, PolicyState::NotEnforced);
    }

    #[test]
    fn test_create_payload_shape() {
        let config = sample_config();
        let owner = ResolvedOwner::identity("o1", "Ada Prentiss");
        let violation_owner = ResolvedOwner::identity("v1", "Grace Wu");
        let assignment = ViolationOwnerAssignmentConfig::from_resolved(Some(violation_owner));

        let policy = SodPolicy::from_config(&config, owner, assignment, sample_criteria());
        let serialized = serde_json::to_value(&policy).unwrap();

        assert_eq!(serialized["name"], "Finance SOD");
        assert_eq!(serialized["state"], "ENFORCED");
        assert_eq!(serialized["type"], "CONFLICTING_ACCESS_BASED");
        assert_eq!(serialized["tags"], json!(["FINANCE", "SOX"]));
        assert_eq!(
            serialized["violationOwnerAssignmentConfig"]["assignmentRule"],
            "STATIC"
        );
        assert_eq!(serialized["ownerRef"]["type"], "IDENTITY");
        // Fields the tenant issues are absent from the create payload.
        assert!(serialized.get("id").is_none());
        assert!(serialized.get("policyQuery").is_none());
    }

    #[test]
    fn test_manager_assignment_omits_owner_ref() {
        let assignment = ViolationOwnerAssignmentConfig::from_resolved(None);
        assert_eq!(assignment.assignment_rule, AssignmentRule::Manager);
        assert_eq!(
            serde_json::to_value(&assignment).unwrap(),
            json!({"assignmentRule": "MANAGER"})
        );
    }

    #[test]
    fn test_patch_covers_every_declared_field() {
        let config = sample_config();
        let owner = ResolvedOwner::identity("o1", "Ada Prentiss");
        let assignment = ViolationOwnerAssignmentConfig::from_resolved(None);
        let policy = SodPolicy::from_config(&config, owner, assignment, sample_criteria());

        let operations = policy.as_patch().unwrap();
        let paths: Vec<&str> = operations.iter().map(|op| op.path).collect();
        assert_eq!(
            paths,
            vec![
                "/name",
                "/description",
                "/ownerRef",
                "/externalPolicyReference",
                "/compensatingControls",
                "/correctionAdvice",
                "/state",
                "/tags",
                "/violationOwnerAssignmentConfig",
                "/conflictingAccessCriteria",
            ]
        );
        assert!(operations.iter().all(|op| op.op == "replace"));
    }

    #[test]
    fn test_policy_schedule_name_uses_keyword_prefix() {
        let config = sample_config();
        let schedule = crate::schedule::Schedule {
            schedule_type: crate::schedule::ScheduleType::Weekly,
            hours: crate::schedule::ScheduleValues {
                value_type: crate::schedule::ScheduleValueType::List,
                values: vec!["9".to_string()],
            },
            days: None,
        };
        let recipients = vec![ResolvedOwner::identity("o1", "Ada Prentiss")];

        let payload = SodPolicySchedule::for_policy(&config, schedule, recipients);
        assert_eq!(payload.name, "WEEKLY: Finance SOD");
        assert_eq!(payload.description.as_deref(), Some("Payables vs receivables"));
        assert_eq!(payload.recipients.len(), 1);
    }

    #[test]
    fn test_policy_response_parses_policy_query() {
        let policy: SodPolicy = serde_json::from_value(json!({
            "id": "pol-1",
            "name": "Finance SOD",
            "state": "NOT_ENFORCED",
            "type": "CONFLICTING_ACCESS_BASED",
            "policyQuery": "@access(id:e1 OR id:e2)",
            "created": "2024-03-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(policy.id.as_deref(), Some("pol-1"));
        assert_eq!(policy.policy_query.as_deref(), Some("@access(id:e1 OR id:e2)"));
        assert_eq!(policy.state, PolicyState::NotEnforced);
    }
}
