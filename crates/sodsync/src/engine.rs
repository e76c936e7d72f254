//! Per-record reconciliation workflow.
//!
//! One run takes a parsed policy configuration record and converges the
//! tenant to it: deleting, creating or updating the separation-of-duties
//! policy, its recurring violation report schedule, and the certification
//! campaign template derived from it. Business-rule rejections and remote
//! failures are collected on the result; the run itself never fails.

use std::sync::Arc;

use tracing::info;

use crate::api::IscApi;
use crate::campaigns::CampaignTemplate;
use crate::config::ConnectorConfig;
use crate::criteria::{
    build_access_constraints, build_conflicting_access_criteria, SideAccessItems,
};
use crate::policies::{SodPolicy, SodPolicySchedule, ViolationOwnerAssignmentConfig};
use crate::policy_config::{PolicyAction, PolicyConfig, ViolationOwnerType};
use crate::resolver::ReferenceResolver;
use crate::result::{MessageLog, PolicyReconciliationResult};
use crate::schedule::{build_schedule, ScheduleKind};
use crate::search::{display_names, entitlement_display_names};

/// Whether the remaining phases of a record still run.
enum Flow {
    Continue,
    Abort,
}

/// Drives the reconciliation workflow against a remote API.
pub struct ReconciliationEngine<A> {
    api: A,
    config: Arc<ConnectorConfig>,
}

impl<A: IscApi> ReconciliationEngine<A> {
    pub fn new(api: A, config: Arc<ConnectorConfig>) -> Self {
        Self { api, config }
    }

    /// Processes one policy configuration record end to end.
    ///
    /// A record requesting DELETE_ALL skips configuration entirely; the
    /// campaign deletion phase runs for DELETE_ALL and DELETE_CAMPAIGN
    /// even when earlier phases recorded failures.
    pub async fn reconcile(&self, policy_config: &PolicyConfig) -> PolicyReconciliationResult {
        info!("### Processing policy [{}] ###", policy_config.policy_name);

        let mut result = PolicyReconciliationResult::new(&policy_config.policy_name);
        let mut log = MessageLog::default();

        if policy_config.has_action(PolicyAction::DeleteAll) {
            self.remove_policy(policy_config, &mut result, &mut log)
                .await;
        } else if let Flow::Abort = self.configure(policy_config, &mut result, &mut log).await {
            result.error_messages = log.into_messages();
            return result;
        }

        if policy_config.has_action(PolicyAction::DeleteCampaign)
            || policy_config.has_action(PolicyAction::DeleteAll)
        {
            self.remove_campaign(policy_config, &mut result, &mut log)
                .await;
        }

        info!(
            "### Finished processing policy [{}] ###",
            policy_config.policy_name
        );
        result.error_messages = log.into_messages();
        result
    }

    /// Deletes the record's policy if the tenant has one by that name.
    async fn remove_policy(
        &self,
        policy_config: &PolicyConfig,
        result: &mut PolicyReconciliationResult,
        log: &mut MessageLog,
    ) {
        let existing_id = self
            .api
            .find_policy(&policy_config.policy_name)
            .await
            .and_then(|policy| policy.id);
        match existing_id {
            Some(policy_id) => match self.api.delete_policy(&policy_id).await {
                Ok(()) => result.policy_deleted = true,
                Err(error) => log.push(format!(
                    "Error deleting existing policy using SOD-Policies API: {error}"
                )),
            },
            None => log.push(format!(
                "No Policy found by name [{}] to delete.",
                policy_config.policy_name
            )),
        }
    }

    /// Converges the policy, its report schedule and its campaign.
    ///
    /// Validation failures accumulate before the first remote write; a
    /// record that fails any of them is abandoned without touching the
    /// tenant. Remote write failures abandon the record where they occur.
    async fn configure(
        &self,
        policy_config: &PolicyConfig,
        result: &mut PolicyReconciliationResult,
        log: &mut MessageLog,
    ) -> Flow {
        let mut can_process = true;

        let query1_entitlements = self.api.search_entitlements(&policy_config.query1).await;
        let query2_entitlements = self.api.search_entitlements(&policy_config.query2).await;

        result.left_hand_entitlements = entitlement_display_names(&query1_entitlements);
        result.right_hand_entitlements = entitlement_display_names(&query2_entitlements);
        result.left_hand_entitlement_count = query1_entitlements.len();
        result.right_hand_entitlement_count = query2_entitlements.len();

        if query1_entitlements.is_empty() {
            can_process = false;
            log.push(format!(
                "Entitlement Query 1 [{}] returns no entitlements",
                policy_config.query1
            ));
        }
        if query2_entitlements.is_empty() {
            can_process = false;
            log.push(format!(
                "Entitlement Query 2 [{}] returns no entitlements",
                policy_config.query2
            ));
        }

        let side_limit = self.config.max_entitlements_per_policy_side as usize;
        if query1_entitlements.len() > side_limit {
            can_process = false;
            log.push(format!(
                "Entitlement Query 1 [{}] result exceeds Identity Security Cloud limit of {} entitlements",
                policy_config.query1, side_limit
            ));
        }
        if query2_entitlements.len() > side_limit {
            can_process = false;
            log.push(format!(
                "Entitlement Query 2 [{}] result exceeds Identity Security Cloud limit of {} entitlements",
                policy_config.query2, side_limit
            ));
        }

        let resolver =
            ReferenceResolver::new(&self.api, &self.config.identity_resolution_attribute);

        let policy_owner = resolver.resolve_policy_owner(policy_config).await;
        if policy_owner.is_none() {
            can_process = false;
            log.push(format!(
                "Unable to resolve Policy Owner. Type: {}, Value: {}",
                policy_config.policy_owner_type, policy_config.policy_owner
            ));
        }

        let violation_owner = resolver.resolve_violation_owner(policy_config).await;
        if violation_owner.is_none()
            && !matches!(
                policy_config.violation_owner_type,
                ViolationOwnerType::Manager
            )
        {
            can_process = false;
            log.push(format!(
                "Unable to resolve Violation Manager. Type: {}, Value: {}",
                policy_config.violation_owner_type, policy_config.violation_owner
            ));
        }

        let criteria = build_conflicting_access_criteria(
            &policy_config.query1_name,
            &query1_entitlements,
            &policy_config.query2_name,
            &query2_entitlements,
        );

        let Some(policy_owner) = policy_owner.filter(|_| can_process) else {
            return Flow::Abort;
        };

        let assignment = ViolationOwnerAssignmentConfig::from_resolved(violation_owner.clone());
        let desired =
            SodPolicy::from_config(policy_config, policy_owner.clone(), assignment, criteria);

        let existing_id = self
            .api
            .find_policy(&policy_config.policy_name)
            .await
            .and_then(|policy| policy.id);

        let (policy_id, saved) = match existing_id {
            Some(existing_id) => match self.api.update_policy(&existing_id, &desired).await {
                Ok(saved) => (existing_id, saved),
                Err(error) => {
                    log.push(format!(
                        "Error updating existing Policy using SOD-Policies API: {error}"
                    ));
                    return Flow::Abort;
                }
            },
            None => match self.api.create_policy(&desired).await {
                Ok(saved) => (saved.id.clone().unwrap_or_default(), saved),
                Err(error) => {
                    log.push(format!(
                        "Error creating a new Policy using SOD-Policies API: {error}"
                    ));
                    return Flow::Abort;
                }
            },
        };

        if policy_id.is_empty() {
            log.push("No policy Id returned while processing the policy?");
            return Flow::Abort;
        }
        let policy_query = saved.policy_query.unwrap_or_default();
        if policy_query.is_empty() {
            log.push("No policyQuery Id returned while processing the policy?");
            return Flow::Abort;
        }

        result.policy_query = policy_query.clone();
        result.policy_configured = true;

        if policy_config.has_action(PolicyAction::Report) {
            match build_schedule(
                ScheduleKind::Policy,
                &policy_config.policy_schedule,
                &self.config,
            ) {
                Some(schedule) => {
                    let recipients = resolver
                        .resolve_recipients(policy_config, violation_owner.as_ref(), &policy_owner)
                        .await;
                    let report = SodPolicySchedule::for_policy(policy_config, schedule, recipients);
                    match self.api.set_policy_schedule(&policy_id, &report).await {
                        Ok(()) => result.policy_schedule_configured = true,
                        Err(error) => log.push(format!(
                            "Error setting Policy Schedule using SOD-Policies API: {error}"
                        )),
                    }
                }
                None => log.push(format!(
                    "Unable to build policy schedule using schedule [{}]",
                    policy_config.policy_schedule
                )),
            }
        }

        // Campaign metrics are derived even when no campaign is requested.
        let query1_access_profiles = self.api.search_access_profiles(&query1_entitlements).await;
        let query2_access_profiles = self.api.search_access_profiles(&query2_entitlements).await;
        let query1_roles = self
            .api
            .search_roles(&query1_entitlements, &query1_access_profiles)
            .await;
        let query2_roles = self
            .api
            .search_roles(&query2_entitlements, &query2_access_profiles)
            .await;

        result.left_hand_access_profiles = display_names(&query1_access_profiles);
        result.right_hand_access_profiles = display_names(&query2_access_profiles);
        result.left_hand_roles = display_names(&query1_roles);
        result.right_hand_roles = display_names(&query2_roles);

        let left = SideAccessItems {
            entitlements: query1_entitlements,
            access_profiles: query1_access_profiles,
            roles: query1_roles,
        };
        let right = SideAccessItems {
            entitlements: query2_entitlements,
            access_profiles: query2_access_profiles,
            roles: query2_roles,
        };
        let summary = build_access_constraints(&left, &right);
        result.left_hand_total_count = summary.left_hand_total as usize;
        result.right_hand_total_count = summary.right_hand_total as usize;
        result.total_count = summary.total as usize;

        if policy_config.has_action(PolicyAction::Certify)
            && !policy_config.has_action(PolicyAction::DeleteCampaign)
        {
            let mut can_process = true;

            if summary.total > self.config.max_access_items_per_campaign {
                can_process = false;
                log.push(format!(
                    "Total number of access items to review exceeds Identity Security Cloud limit of {} access items.",
                    self.config.max_access_items_per_campaign
                ));
            }
            if policy_config.certification_name.is_empty() {
                can_process = false;
                log.push(
                    "A Certification Campaign Name is required to define a Certification Campaign.",
                );
            }
            if policy_config.certification_description.is_empty() {
                can_process = false;
                log.push(
                    "A Certification Campaign Description is required to define a Certification Campaign.",
                );
            }
            if !can_process {
                return Flow::Abort;
            }

            let desired = CampaignTemplate::from_config(
                policy_config,
                &policy_query,
                summary.constraints,
                violation_owner.clone(),
                &self.config.campaign_duration,
            );

            let existing_id = self
                .api
                .find_campaign(&policy_config.certification_name)
                .await
                .and_then(|template| template.id);

            let campaign_id = match existing_id {
                Some(existing_id) => match self.api.update_campaign(&existing_id, &desired).await {
                    Ok(()) => existing_id,
                    Err(error) => {
                        log.push(format!(
                            "Error updating existing Campaign using Certification-Campaigns API: {error}"
                        ));
                        return Flow::Abort;
                    }
                },
                None => match self.api.create_campaign(&desired).await {
                    Ok(created) => created.id.unwrap_or_default(),
                    Err(error) => {
                        log.push(format!(
                            "Error creating new Campaign using Certification-Campaigns API: {error}"
                        ));
                        return Flow::Abort;
                    }
                },
            };

            if campaign_id.is_empty() {
                log.push("No campaign Id returned while processing the policy?");
                return Flow::Abort;
            }

            result.campaign_configured = true;
            result.campaign_template_name = policy_config.certification_name.clone();

            if !policy_config.certification_schedule.is_empty() {
                match build_schedule(
                    ScheduleKind::Campaign,
                    &policy_config.certification_schedule,
                    &self.config,
                ) {
                    Some(schedule) => {
                        match self.api.set_campaign_schedule(&campaign_id, &schedule).await {
                            Ok(()) => result.campaign_schedule_configured = true,
                            Err(error) => log.push(format!(
                                "Error setting campaign schedule using Certification-Campaigns API: {error}"
                            )),
                        }
                    }
                    None => log.push(format!(
                        "Unable to build campaign schedule using schedule [{}]",
                        policy_config.certification_schedule
                    )),
                }
            }
        }

        Flow::Continue
    }

    /// Deletes the record's campaign template if the tenant has one by
    /// the configured certification name.
    async fn remove_campaign(
        &self,
        policy_config: &PolicyConfig,
        result: &mut PolicyReconciliationResult,
        log: &mut MessageLog,
    ) {
        if policy_config.certification_name.is_empty() {
            log.push("A Certification Campaign Name is required to delete it.");
            return;
        }

        let existing_id = self
            .api
            .find_campaign(&policy_config.certification_name)
            .await
            .and_then(|template| template.id);
        match existing_id {
            Some(campaign_id) => match self.api.delete_campaign(&campaign_id).await {
                Ok(()) => result.campaign_deleted = true,
                Err(error) => log.push(format!(
                    "Error deleting existing campaign using Certification-Campaigns API: {error}"
                )),
            },
            None => log.push(format!(
                "No Certification Campaign found by name [{}] to delete.",
                policy_config.certification_name
            )),
        }
    }
}
