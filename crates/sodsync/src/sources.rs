//! Policy configuration source discovery and record retrieval.
//!
//! Policy configuration records live as accounts on a dedicated source in
//! the tenant. The source is located by name once, then its accounts are
//! read through the Accounts API.

use serde::Deserialize;

use crate::client::{IscClient, LIST_PAGE_SIZE};
use crate::error::SodResult;
use crate::policy_config::ConfigRecord;

const SOURCES_PATH: &str = "/v3/sources";
const ACCOUNTS_PATH: &str = "/v3/accounts";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Source {
    #[serde(default)]
    pub id: String,
}

impl IscClient {
    /// Resolves a source id from its display name.
    pub(crate) async fn find_source_by_name(&self, name: &str) -> SodResult<Option<String>> {
        let query = [("filters", format!("name eq \"{name}\""))];
        let body = self.get_json(SOURCES_PATH, &query).await?;
        let sources: Vec<Source> = serde_json::from_value(body)?;
        Ok(sources
            .into_iter()
            .next()
            .map(|source| source.id)
            .filter(|id| !id.is_empty()))
    }

    /// Fetches every account on the given source.
    pub(crate) async fn list_source_accounts(
        &self,
        source_id: &str,
    ) -> SodResult<Vec<ConfigRecord>> {
        let query = [("filters", format!("sourceId eq \"{source_id}\""))];
        let pages = self.get_paginated(ACCOUNTS_PATH, &query).await?;
        pages
            .into_iter()
            .map(|account| Ok(serde_json::from_value(account)?))
            .collect()
    }

    /// Fetches a single account on the source by its account name.
    pub(crate) async fn find_source_account(
        &self,
        source_id: &str,
        name: &str,
    ) -> SodResult<Option<ConfigRecord>> {
        let query = [
            (
                "filters",
                format!("sourceId eq \"{source_id}\" and name eq \"{name}\""),
            ),
            ("limit", LIST_PAGE_SIZE.to_string()),
        ];
        let body = self.get_json(ACCOUNTS_PATH, &query).await?;
        let accounts: Vec<ConfigRecord> = serde_json::from_value(body)?;
        Ok(accounts.into_iter().next())
    }
}
