//! Search API access for entitlements, access profiles, roles and identities.
//!
//! All searches project a small document shape, sort by id and page with
//! `searchAfter` so result sets larger than one page come back complete.

use serde::{Deserialize, Serialize};

use crate::client::IscClient;
use crate::criteria::build_id_query;
use crate::error::SodResult;

/// Page size for search requests.
pub(crate) const SEARCH_PAGE_SIZE: usize = 250;

const SEARCH_PATH: &str = "/v3/search";

const ENTITLEMENT_INCLUDES: &[&str] = &["id", "name", "schema", "type", "source.name"];
const ACCESS_PROFILE_INCLUDES: &[&str] = &["id", "name", "type", "source.name"];
const ROLE_INCLUDES: &[&str] = &["id", "name", "type"];
const IDENTITY_INCLUDES: &[&str] = &["id", "name", "type"];

/// A projected document returned by the search index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Index the document came from, e.g. `identity`.
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    /// Entitlement schema on its source, e.g. `group`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
}

/// Source reference embedded in entitlement and access profile documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub name: String,
}

impl SearchDocument {
    /// Display string recorded on results for one entitlement.
    pub fn entitlement_display(&self) -> String {
        let source = self
            .source
            .as_ref()
            .map(|source| source.name.as_str())
            .unwrap_or_default();
        let schema = self.schema.as_deref().unwrap_or_default();
        format!("Source: {source}, Type: {schema}, Name: {}", self.name)
    }
}

/// Display strings for a list of entitlement documents.
pub fn entitlement_display_names(documents: &[SearchDocument]) -> Vec<String> {
    documents
        .iter()
        .map(SearchDocument::entitlement_display)
        .collect()
}

/// Plain names for access profile and role documents.
pub fn display_names(documents: &[SearchDocument]) -> Vec<String> {
    documents
        .iter()
        .map(|document| document.name.clone())
        .collect()
}

/// Builds the identity search query for a resolution attribute.
///
/// Top-level attributes (`name`, `employeeNumber`, `id`) are queried
/// directly; anything else lives under the `attributes` map.
pub(crate) fn identity_query(attribute: &str, value: &str) -> String {
    match attribute {
        "name" | "employeeNumber" | "id" => format!("{attribute}.exact:\"{value}\""),
        _ => format!("attributes.{attribute}.exact:\"{value}\""),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    indices: [&'static str; 1],
    query: QueryClause<'a>,
    query_result_filter: QueryResultFilter,
    sort: [&'static str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    search_after: Option<[String; 1]>,
}

#[derive(Debug, Serialize)]
struct QueryClause<'a> {
    query: &'a str,
}

#[derive(Debug, Serialize)]
struct QueryResultFilter {
    includes: &'static [&'static str],
}

impl IscClient {
    /// Runs an entitlement query verbatim against the entitlements index.
    pub(crate) async fn search_entitlement_documents(
        &self,
        query: &str,
    ) -> SodResult<Vec<SearchDocument>> {
        self.search_paginated("entitlements", query.to_string(), ENTITLEMENT_INCLUDES)
            .await
    }

    /// Finds access profiles granting any of the given entitlements.
    pub(crate) async fn search_access_profile_documents(
        &self,
        entitlements: &[SearchDocument],
    ) -> SodResult<Vec<SearchDocument>> {
        if entitlements.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("@entitlements({})", build_id_query(entitlements, "id:"));
        self.search_paginated("accessprofiles", query, ACCESS_PROFILE_INCLUDES)
            .await
    }

    /// Finds roles granting any of the given entitlements or access profiles.
    pub(crate) async fn search_role_documents(
        &self,
        entitlements: &[SearchDocument],
        access_profiles: &[SearchDocument],
    ) -> SodResult<Vec<SearchDocument>> {
        let mut query = String::new();
        if !entitlements.is_empty() {
            query = format!("@entitlements({})", build_id_query(entitlements, "id:"));
        }
        if !access_profiles.is_empty() {
            let clause = build_id_query(access_profiles, "accessProfiles.id:");
            query = if query.is_empty() {
                clause
            } else {
                format!("{query} OR {clause}")
            };
        }
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.search_paginated("roles", query, ROLE_INCLUDES).await
    }

    /// Looks up identities whose resolution attribute exactly matches `value`.
    pub(crate) async fn search_identity_documents(
        &self,
        attribute: &str,
        value: &str,
    ) -> SodResult<Vec<SearchDocument>> {
        self.search_paginated("identities", identity_query(attribute, value), IDENTITY_INCLUDES)
            .await
    }

    async fn search_paginated(
        &self,
        index: &'static str,
        query: String,
        includes: &'static [&'static str],
    ) -> SodResult<Vec<SearchDocument>> {
        let limit = [("limit", SEARCH_PAGE_SIZE.to_string())];
        let mut documents: Vec<SearchDocument> = Vec::new();
        let mut search_after: Option<[String; 1]> = None;

        loop {
            let request = SearchRequest {
                indices: [index],
                query: QueryClause { query: &query },
                query_result_filter: QueryResultFilter { includes },
                sort: ["id"],
                search_after: search_after.clone(),
            };

            let page: Vec<SearchDocument> =
                serde_json::from_value(self.post_json(SEARCH_PATH, &limit, &request).await?)?;
            let page_len = page.len();
            let last_id = page.last().map(|document| document.id.clone());
            documents.extend(page);

            if page_len < SEARCH_PAGE_SIZE {
                break;
            }
            match last_id {
                Some(id) => search_after = Some([id]),
                None => break,
            }
        }
        Ok(documents)
    }
}
