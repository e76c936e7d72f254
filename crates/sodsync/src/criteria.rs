//! Conflicting access criteria and campaign access constraints.
//!
//! A policy names two conflicting sets of entitlements. The criteria sent to
//! the policy API reference entitlements only; the constraints sent to the
//! campaign API additionally carry the access profiles and roles that bundle
//! those entitlements, so a certification covers indirect assignments too.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::search::SearchDocument;

/// Kinds of access item a constraint can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessItemType {
    /// A single entitlement on a source.
    Entitlement,
    /// An access profile bundling entitlements.
    AccessProfile,
    /// A role bundling access profiles or entitlements.
    Role,
}

/// How a constraint interprets its id list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintOperator {
    /// Only the listed ids are in scope.
    Selected,
    /// Every item of the type is in scope.
    All,
}

/// One side's criteria list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaItem {
    #[serde(rename = "type")]
    pub item_type: AccessItemType,
    pub id: String,
}

/// One side of a policy's conflicting access definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCriteria {
    pub name: String,
    pub criteria_list: Vec<CriteriaItem>,
}

impl AccessCriteria {
    /// Builds a named criteria side from entitlement search hits.
    pub fn from_entitlements(name: impl Into<String>, entitlements: &[SearchDocument]) -> Self {
        Self {
            name: name.into(),
            criteria_list: entitlements
                .iter()
                .map(|doc| CriteriaItem {
                    item_type: AccessItemType::Entitlement,
                    id: doc.id.clone(),
                })
                .collect(),
        }
    }
}

/// Both sides of a policy's conflicting access definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictingAccessCriteria {
    pub left_criteria: AccessCriteria,
    pub right_criteria: AccessCriteria,
}

/// Scope restriction for a certification campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessConstraint {
    #[serde(rename = "type")]
    pub item_type: AccessItemType,
    pub ids: Vec<String>,
    pub operator: ConstraintOperator,
}

/// The access items discovered for one side of a policy.
#[derive(Debug, Clone, Default)]
pub struct SideAccessItems {
    pub entitlements: Vec<SearchDocument>,
    pub access_profiles: Vec<SearchDocument>,
    pub roles: Vec<SearchDocument>,
}

impl SideAccessItems {
    /// Entitlements, access profiles and roles on this side, counted
    /// without deduplication against the other side.
    pub fn total_count(&self) -> u32 {
        (self.entitlements.len() + self.access_profiles.len() + self.roles.len()) as u32
    }
}

/// Campaign constraints plus the counts derived while building them.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessConstraintSummary {
    pub constraints: Vec<AccessConstraint>,
    /// Item count of the left side. Items on both sides count twice
    /// across the two side totals.
    pub left_hand_total: u32,
    /// Item count of the right side.
    pub right_hand_total: u32,
    /// Deduplicated item count across both sides.
    pub total: u32,
}

/// Builds the two-sided criteria payload for the policy API.
pub fn build_conflicting_access_criteria(
    query1_name: &str,
    left_entitlements: &[SearchDocument],
    query2_name: &str,
    right_entitlements: &[SearchDocument],
) -> ConflictingAccessCriteria {
    ConflictingAccessCriteria {
        left_criteria: AccessCriteria::from_entitlements(query1_name, left_entitlements),
        right_criteria: AccessCriteria::from_entitlements(query2_name, right_entitlements),
    }
}

/// Builds campaign access constraints from both sides' discovered items.
///
/// Each access item type yields at most one constraint holding the
/// deduplicated union of both sides' ids; types with no items are omitted.
pub fn build_access_constraints(
    left: &SideAccessItems,
    right: &SideAccessItems,
) -> AccessConstraintSummary {
    let sides = [
        (
            AccessItemType::Entitlement,
            &left.entitlements,
            &right.entitlements,
        ),
        (
            AccessItemType::AccessProfile,
            &left.access_profiles,
            &right.access_profiles,
        ),
        (AccessItemType::Role, &left.roles, &right.roles),
    ];

    let mut constraints = Vec::new();
    let mut total = 0u32;
    for (item_type, left_docs, right_docs) in sides {
        let ids = union_ids(left_docs, right_docs);
        if ids.is_empty() {
            continue;
        }
        total += ids.len() as u32;
        constraints.push(AccessConstraint {
            item_type,
            ids,
            operator: ConstraintOperator::Selected,
        });
    }

    AccessConstraintSummary {
        left_hand_total: left.total_count(),
        right_hand_total: right.total_count(),
        total,
        constraints,
    }
}

/// Joins item ids into a search clause, e.g. `id:e1 OR id:e2`.
pub(crate) fn build_id_query(items: &[SearchDocument], field_prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{field_prefix}{}", item.id))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// First-seen order union of both sides' document ids.
fn union_ids(left: &[SearchDocument], right: &[SearchDocument]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for doc in left.iter().chain(right.iter()) {
        if seen.insert(doc.id.as_str()) {
            ids.push(doc.id.clone());
        }
    }
    ids
}
