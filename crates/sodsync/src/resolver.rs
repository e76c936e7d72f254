//! Owner, violation owner and recipient resolution.

use serde::{Deserialize, Serialize};

use crate::api::IscApi;
use crate::policy_config::{OwnerType, PolicyConfig, ViolationOwnerType};

/// Kind of object an owner reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerRefType {
    Identity,
    GovernanceGroup,
}

/// A resolved reference to an identity or governance group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedOwner {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub owner_type: OwnerRefType,
}

impl ResolvedOwner {
    pub fn identity(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_type: OwnerRefType::Identity,
        }
    }

    pub fn governance_group(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_type: OwnerRefType::GovernanceGroup,
        }
    }
}

/// Resolves record attribute values to tenant object references.
///
/// Lookups are best effort: a missing or unresolvable reference is `None`
/// and the engine decides whether that blocks the record.
pub struct ReferenceResolver<'a, A> {
    api: &'a A,
    resolution_attribute: &'a str,
}

impl<'a, A: IscApi> ReferenceResolver<'a, A> {
    pub fn new(api: &'a A, resolution_attribute: &'a str) -> Self {
        Self {
            api,
            resolution_attribute,
        }
    }

    /// Resolves the policy owner declared on the record.
    pub async fn resolve_policy_owner(&self, config: &PolicyConfig) -> Option<ResolvedOwner> {
        match &config.policy_owner_type {
            OwnerType::Identity => {
                self.api
                    .search_identity(self.resolution_attribute, &config.policy_owner)
                    .await
            }
            OwnerType::GovernanceGroup => {
                self.api.find_governance_group(&config.policy_owner).await
            }
            OwnerType::Other(_) => None,
        }
    }

    /// Resolves the violation owner declared on the record.
    ///
    /// MANAGER assignment needs no lookup, so it resolves to `None`, as do
    /// records that leave the violation owner value empty.
    pub async fn resolve_violation_owner(&self, config: &PolicyConfig) -> Option<ResolvedOwner> {
        if config.violation_owner.is_empty() {
            return None;
        }
        match &config.violation_owner_type {
            ViolationOwnerType::Identity => {
                self.api
                    .search_identity(self.resolution_attribute, &config.violation_owner)
                    .await
            }
            ViolationOwnerType::GovernanceGroup => {
                self.api.find_governance_group(&config.violation_owner).await
            }
            ViolationOwnerType::Manager | ViolationOwnerType::Other(_) => None,
        }
    }

    /// Member identities of a governance group.
    pub async fn expand_group_members(&self, group: &ResolvedOwner) -> Vec<ResolvedOwner> {
        self.api.governance_group_members(&group.id).await
    }

    /// Who receives the recurring violation report.
    ///
    /// An identity violation owner receives it directly and a governance
    /// group is expanded to its members. Everything else, including a group
    /// that expands to nobody, falls back to the policy owner.
    pub async fn resolve_recipients(
        &self,
        config: &PolicyConfig,
        violation_owner: Option<&ResolvedOwner>,
        policy_owner: &ResolvedOwner,
    ) -> Vec<ResolvedOwner> {
        let mut recipients = Vec::new();
        if !config.violation_owner.is_empty() {
            match (&config.violation_owner_type, violation_owner) {
                (ViolationOwnerType::Identity, Some(owner)) => recipients.push(owner.clone()),
                (ViolationOwnerType::GovernanceGroup, Some(group)) => {
                    recipients = self.expand_group_members(group).await;
                }
                _ => {}
            }
        }
        if recipients.is_empty() {
            recipients.push(policy_owner.clone());
        }
        recipients
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolved_owner_serializes_with_type_key() {
        let owner = ResolvedOwner::identity("2c91808a", "Ada Prentiss");
        assert_eq!(
            serde_json::to_value(&owner).unwrap(),
            json!({"id": "2c91808a", "name": "Ada Prentiss", "type": "IDENTITY"})
        );

        let group = ResolvedOwner::governance_group("wg-1", "Audit Board");
        assert_eq!(
            serde_json::to_value(&group).unwrap()["type"],
            "GOVERNANCE_GROUP"
        );
    }
}
