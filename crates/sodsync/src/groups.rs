//! Governance group lookup and membership expansion.
//!
//! Groups can own policies and receive violation reports; when a group is
//! named as a report recipient its individual members are expanded.

use serde::Deserialize;

use crate::client::IscClient;
use crate::error::SodResult;

const WORKGROUPS_PATH: &str = "/beta/workgroups";

/// A governance group as returned by the workgroups endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Workgroup {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One identity in a governance group's membership list.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkgroupMember {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl IscClient {
    /// Looks a governance group up by exact name. The first match wins;
    /// a match without an id counts as absent.
    pub(crate) async fn find_workgroup_by_name(&self, name: &str) -> SodResult<Option<Workgroup>> {
        let query = [("filters", format!("name eq \"{name}\""))];
        let body = self.get_json(WORKGROUPS_PATH, &query).await?;
        let groups: Vec<Workgroup> = serde_json::from_value(body)?;
        Ok(groups.into_iter().next().filter(|group| !group.id.is_empty()))
    }

    /// Fetches the full membership of a governance group.
    pub(crate) async fn list_workgroup_members(
        &self,
        group_id: &str,
    ) -> SodResult<Vec<WorkgroupMember>> {
        let pages = self
            .get_paginated(&format!("{WORKGROUPS_PATH}/{group_id}/members"), &[])
            .await?;
        pages
            .into_iter()
            .map(|member| Ok(serde_json::from_value(member)?))
            .collect()
    }
}
