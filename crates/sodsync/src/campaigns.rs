//! Certification campaign template API types and endpoint calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{to_value, Value};

use crate::client::{IscClient, PatchOperation};
use crate::criteria::AccessConstraint;
use crate::error::SodResult;
use crate::policy_config::PolicyConfig;
use crate::resolver::ResolvedOwner;
use crate::schedule::Schedule;

const CAMPAIGN_TEMPLATES_PATH: &str = "/v3/campaign-templates";

/// Campaign kinds the tenant knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignType {
    /// Scope defined by a search query; the only kind managed here.
    Search,
    Manager,
    SourceOwner,
    RoleComposition,
}

/// Whether a campaign certifies correlated or uncorrelated identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrelatedStatus {
    Correlated,
    Uncorrelated,
}

/// What a search campaign reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchCampaignType {
    Identity,
    AccessItem,
}

/// Search-scoped campaign definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCampaignInfo {
    #[serde(rename = "type")]
    pub info_type: SearchCampaignType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fixed reviewer for every certification item. Absent when each
    /// violator's manager reviews instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<ResolvedOwner>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub access_constraints: Vec<AccessConstraint>,
}

/// The campaign a template stamps out on each activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub campaign_type: CampaignType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlated_status: Option<CorrelatedStatus>,
    #[serde(default)]
    pub recommendations_enabled: bool,
    #[serde(default)]
    pub email_notification_enabled: bool,
    #[serde(default)]
    pub sunset_comments_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_campaign_info: Option<SearchCampaignInfo>,
}

/// A certification campaign template, as sent to and returned by the tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deadline_duration: String,
    pub campaign: Campaign,
    /// Set by the tenant; sent as null on create.
    pub created: Option<DateTime<Utc>>,
    /// Set by the tenant; sent as null on create.
    pub modified: Option<DateTime<Utc>>,
}

impl CampaignTemplate {
    /// The desired template state for a record's certification campaign.
    pub fn from_config(
        config: &PolicyConfig,
        policy_query: &str,
        access_constraints: Vec<AccessConstraint>,
        reviewer: Option<ResolvedOwner>,
        campaign_duration: &str,
    ) -> Self {
        Self {
            id: None,
            name: config.certification_name.clone(),
            description: config.certification_description.clone(),
            deadline_duration: campaign_duration.to_string(),
            campaign: Campaign {
                name: config.certification_name.clone(),
                description: config.certification_description.clone(),
                campaign_type: CampaignType::Search,
                correlated_status: Some(CorrelatedStatus::Correlated),
                recommendations_enabled: true,
                email_notification_enabled: true,
                sunset_comments_required: true,
                search_campaign_info: Some(SearchCampaignInfo {
                    info_type: SearchCampaignType::Identity,
                    description: Some(config.certification_description.clone()),
                    reviewer,
                    query: policy_query.to_string(),
                    access_constraints,
                }),
            },
            created: None,
            modified: None,
        }
    }

    /// Field replacements an update sends.
    ///
    /// The reviewer is replaced with an explicit null when no fixed
    /// reviewer applies, clearing any previous one on the template.
    pub fn as_patch(&self) -> SodResult<Vec<PatchOperation>> {
        let info = self.campaign.search_campaign_info.as_ref();
        Ok(vec![
            PatchOperation::replace("/name", Value::String(self.name.clone())),
            PatchOperation::replace("/description", Value::String(self.description.clone())),
            PatchOperation::replace(
                "/deadlineDuration",
                Value::String(self.deadline_duration.clone()),
            ),
            PatchOperation::replace("/campaign/name", Value::String(self.campaign.name.clone())),
            PatchOperation::replace(
                "/campaign/description",
                Value::String(self.campaign.description.clone()),
            ),
            PatchOperation::replace(
                "/campaign/searchCampaignInfo/description",
                to_value(info.and_then(|info| info.description.as_ref()))?,
            ),
            PatchOperation::replace(
                "/campaign/searchCampaignInfo/reviewer",
                to_value(info.and_then(|info| info.reviewer.as_ref()))?,
            ),
            PatchOperation::replace(
                "/campaign/searchCampaignInfo/query",
                to_value(info.map(|info| info.query.as_str()))?,
            ),
            PatchOperation::replace(
                "/campaign/searchCampaignInfo/accessConstraints",
                to_value(info.map(|info| &info.access_constraints))?,
            ),
        ])
    }
}

impl IscClient {
    /// Looks a campaign template up by exact name. The first match wins;
    /// a match without an id counts as absent.
    pub(crate) async fn find_campaign_by_name(
        &self,
        name: &str,
    ) -> SodResult<Option<CampaignTemplate>> {
        let query = [("filters", format!("name eq \"{name}\""))];
        let body = self.get_json(CAMPAIGN_TEMPLATES_PATH, &query).await?;
        let templates: Vec<CampaignTemplate> = serde_json::from_value(body)?;
        Ok(templates
            .into_iter()
            .next()
            .filter(|template| template.id.as_deref().is_some_and(|id| !id.is_empty())))
    }

    pub(crate) async fn create_campaign_template(
        &self,
        template: &CampaignTemplate,
    ) -> SodResult<CampaignTemplate> {
        let body = self.post_json(CAMPAIGN_TEMPLATES_PATH, &[], template).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub(crate) async fn update_campaign_template(
        &self,
        campaign_id: &str,
        desired: &CampaignTemplate,
    ) -> SodResult<()> {
        let operations = desired.as_patch()?;
        self.patch_json(
            &format!("{CAMPAIGN_TEMPLATES_PATH}/{campaign_id}"),
            &operations,
        )
        .await
        .map(drop)
    }

    pub(crate) async fn delete_campaign_template(&self, campaign_id: &str) -> SodResult<()> {
        self.delete(&format!("{CAMPAIGN_TEMPLATES_PATH}/{campaign_id}"))
            .await
    }

    pub(crate) async fn put_campaign_schedule(
        &self,
        campaign_id: &str,
        schedule: &Schedule,
    ) -> SodResult<()> {
        self.put_json(
            &format!("{CAMPAIGN_TEMPLATES_PATH}/{campaign_id}/schedule"),
            schedule,
        )
        .await
        .map(drop)
    }
}
