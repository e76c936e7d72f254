//! The remote-operation seam between the engine and the HTTP client.
//!
//! The engine drives everything through [`IscApi`] so tests can swap the
//! tenant out for an in-memory fake. Lookups are best effort: a failed
//! search or find is logged and reported as empty, mirroring how a missing
//! object is treated. Mutations surface their errors so the engine can
//! record them against the policy being processed.

use async_trait::async_trait;
use tracing::warn;

use crate::campaigns::CampaignTemplate;
use crate::client::IscClient;
use crate::error::SodResult;
use crate::policies::{SodPolicy, SodPolicySchedule};
use crate::resolver::ResolvedOwner;
use crate::schedule::Schedule;
use crate::search::SearchDocument;

/// Remote operations one reconciliation run needs.
#[async_trait]
pub trait IscApi: Send + Sync {
    /// Entitlements matching a configured search query.
    async fn search_entitlements(&self, query: &str) -> Vec<SearchDocument>;

    /// Access profiles granting any of the given entitlements.
    async fn search_access_profiles(
        &self,
        entitlements: &[SearchDocument],
    ) -> Vec<SearchDocument>;

    /// Roles granting any of the given entitlements or access profiles.
    async fn search_roles(
        &self,
        entitlements: &[SearchDocument],
        access_profiles: &[SearchDocument],
    ) -> Vec<SearchDocument>;

    /// First identity whose attribute matches the value.
    async fn search_identity(&self, attribute: &str, value: &str) -> Option<ResolvedOwner>;

    /// Governance group with exactly this name.
    async fn find_governance_group(&self, name: &str) -> Option<ResolvedOwner>;

    /// Member identities of a governance group.
    async fn governance_group_members(&self, group_id: &str) -> Vec<ResolvedOwner>;

    async fn find_policy(&self, name: &str) -> Option<SodPolicy>;

    async fn create_policy(&self, policy: &SodPolicy) -> SodResult<SodPolicy>;

    async fn update_policy(&self, policy_id: &str, desired: &SodPolicy) -> SodResult<SodPolicy>;

    async fn delete_policy(&self, policy_id: &str) -> SodResult<()>;

    async fn set_policy_schedule(
        &self,
        policy_id: &str,
        schedule: &SodPolicySchedule,
    ) -> SodResult<()>;

    async fn find_campaign(&self, name: &str) -> Option<CampaignTemplate>;

    async fn create_campaign(&self, template: &CampaignTemplate) -> SodResult<CampaignTemplate>;

    async fn update_campaign(
        &self,
        campaign_id: &str,
        desired: &CampaignTemplate,
    ) -> SodResult<()>;

    async fn delete_campaign(&self, campaign_id: &str) -> SodResult<()>;

    async fn set_campaign_schedule(&self, campaign_id: &str, schedule: &Schedule)
        -> SodResult<()>;
}

#[async_trait]
impl IscApi for IscClient {
    async fn search_entitlements(&self, query: &str) -> Vec<SearchDocument> {
        match self.search_entitlement_documents(query).await {
            Ok(documents) => documents,
            Err(error) => {
                warn!("Error finding entitlements using Search API: {}", error);
                Vec::new()
            }
        }
    }

    async fn search_access_profiles(
        &self,
        entitlements: &[SearchDocument],
    ) -> Vec<SearchDocument> {
        match self.search_access_profile_documents(entitlements).await {
            Ok(documents) => documents,
            Err(error) => {
                warn!("Error finding access profiles using Search API: {}", error);
                Vec::new()
            }
        }
    }

    async fn search_roles(
        &self,
        entitlements: &[SearchDocument],
        access_profiles: &[SearchDocument],
    ) -> Vec<SearchDocument> {
        match self
            .search_role_documents(entitlements, access_profiles)
            .await
        {
            Ok(documents) => documents,
            Err(error) => {
                warn!("Error finding roles using Search API: {}", error);
                Vec::new()
            }
        }
    }

    async fn search_identity(&self, attribute: &str, value: &str) -> Option<ResolvedOwner> {
        match self.search_identity_documents(attribute, value).await {
            Ok(documents) => documents
                .into_iter()
                .next()
                .map(|document| ResolvedOwner::identity(document.id, document.name)),
            Err(error) => {
                warn!("Error finding identity using Search API: {}", error);
                None
            }
        }
    }

    async fn find_governance_group(&self, name: &str) -> Option<ResolvedOwner> {
        match self.find_workgroup_by_name(name).await {
            Ok(group) => {
                group.map(|group| ResolvedOwner::governance_group(group.id, group.name))
            }
            Err(error) => {
                warn!(
                    "Error finding Governance Group using Governance-Groups API: {}",
                    error
                );
                None
            }
        }
    }

    async fn governance_group_members(&self, group_id: &str) -> Vec<ResolvedOwner> {
        match self.list_workgroup_members(group_id).await {
            Ok(members) => members
                .into_iter()
                .map(|member| ResolvedOwner::identity(member.id, member.name))
                .collect(),
            Err(error) => {
                warn!(
                    "Error finding Governance Group Members using Governance-Groups API: {}",
                    error
                );
                Vec::new()
            }
        }
    }

    async fn find_policy(&self, name: &str) -> Option<SodPolicy> {
        match self.find_policy_by_name(name).await {
            Ok(policy) => policy,
            Err(error) => {
                warn!(
                    "Error finding existing Policy using SOD-Policies API: {}",
                    error
                );
                None
            }
        }
    }

    async fn create_policy(&self, policy: &SodPolicy) -> SodResult<SodPolicy> {
        self.create_sod_policy(policy).await
    }

    async fn update_policy(&self, policy_id: &str, desired: &SodPolicy) -> SodResult<SodPolicy> {
        self.update_sod_policy(policy_id, desired).await
    }

    async fn delete_policy(&self, policy_id: &str) -> SodResult<()> {
        self.delete_sod_policy(policy_id).await
    }

    async fn set_policy_schedule(
        &self,
        policy_id: &str,
        schedule: &SodPolicySchedule,
    ) -> SodResult<()> {
        self.put_policy_schedule(policy_id, schedule).await
    }

    async fn find_campaign(&self, name: &str) -> Option<CampaignTemplate> {
        match self.find_campaign_by_name(name).await {
            Ok(template) => template,
            Err(error) => {
                warn!(
                    "Error finding existing Campaign using Certification-Campaigns API: {}",
                    error
                );
                None
            }
        }
    }

    async fn create_campaign(&self, template: &CampaignTemplate) -> SodResult<CampaignTemplate> {
        self.create_campaign_template(template).await
    }

    async fn update_campaign(
        &self,
        campaign_id: &str,
        desired: &CampaignTemplate,
    ) -> SodResult<()> {
        self.update_campaign_template(campaign_id, desired).await
    }

    async fn delete_campaign(&self, campaign_id: &str) -> SodResult<()> {
        self.delete_campaign_template(campaign_id).await
    }

    async fn set_campaign_schedule(
        &self,
        campaign_id: &str,
        schedule: &Schedule,
    ) -> SodResult<()> {
        self.put_campaign_schedule(campaign_id, schedule).await
    }
}
