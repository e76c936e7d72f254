//! Per-record reconciliation outcome.

use serde::Serialize;

/// Everything one reconciliation run records about a single policy
/// configuration record.
///
/// There is no separate failure type: a run that achieves nothing still
/// produces a result, with its stage flags false and the reasons in
/// `error_messages`. Created once per record and never reused.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyReconciliationResult {
    /// Identity of the record, the configured policy name.
    pub policy_name: String,
    /// The violation search query the policy was configured with.
    pub policy_query: String,
    pub left_hand_entitlement_count: usize,
    pub left_hand_total_count: usize,
    pub right_hand_entitlement_count: usize,
    pub right_hand_total_count: usize,
    pub total_count: usize,
    pub campaign_template_name: String,
    pub policy_deleted: bool,
    pub policy_configured: bool,
    pub policy_schedule_configured: bool,
    pub campaign_deleted: bool,
    pub campaign_configured: bool,
    pub campaign_schedule_configured: bool,
    /// Business-rule rejections and remote call failures, in the order
    /// they occurred.
    pub error_messages: Vec<String>,
    pub left_hand_entitlements: Vec<String>,
    pub left_hand_access_profiles: Vec<String>,
    pub left_hand_roles: Vec<String>,
    pub right_hand_entitlements: Vec<String>,
    pub right_hand_access_profiles: Vec<String>,
    pub right_hand_roles: Vec<String>,
}

impl PolicyReconciliationResult {
    /// A blank result for the named policy: no stage completed, empty
    /// metrics, no messages.
    pub fn new(policy_name: impl Into<String>) -> Self {
        Self {
            policy_name: policy_name.into(),
            policy_query: String::new(),
            left_hand_entitlement_count: 0,
            left_hand_total_count: 0,
            right_hand_entitlement_count: 0,
            right_hand_total_count: 0,
            total_count: 0,
            campaign_template_name: String::new(),
            policy_deleted: false,
            policy_configured: false,
            policy_schedule_configured: false,
            campaign_deleted: false,
            campaign_configured: false,
            campaign_schedule_configured: false,
            error_messages: Vec::new(),
            left_hand_entitlements: Vec::new(),
            left_hand_access_profiles: Vec::new(),
            left_hand_roles: Vec::new(),
            right_hand_entitlements: Vec::new(),
            right_hand_access_profiles: Vec::new(),
            right_hand_roles: Vec::new(),
        }
    }
}

/// Ordered accumulator for the messages a run collects.
///
/// Expected business-rule rejections are pushed here and carried to the
/// end of the run rather than raised as errors; the engine drains the log
/// into the result on every exit path.
#[derive(Debug, Default)]
pub(crate) struct MessageLog(Vec<String>);

impl MessageLog {
    pub(crate) fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub(crate) fn into_messages(self) -> Vec<String> {
        self.0
    }
}
