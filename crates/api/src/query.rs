//! Shared query parameter types for API handlers.
//!
//! Common query structs that appear across multiple handler modules are
//! extracted here to avoid duplication. Resolution into domain types
//! (projection, sort order, paging window) lives in `caravel_core`.

use serde::Deserialize;

use caravel_core::error::CoreError;
use caravel_core::filter::{FieldSelection, ListOptions, SortOrder};

/// Field projection parameters (`?include=` / `?exclude=`).
///
/// Accepted by every endpoint that returns engagement documents. The two
/// are mutually exclusive; resolution rejects requests carrying both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectionParams {
    pub include: Option<String>,
    pub exclude: Option<String>,
}

impl ProjectionParams {
    pub fn selection(&self) -> Result<FieldSelection, CoreError> {
        FieldSelection::from_params(self.include.as_deref(), self.exclude.as_deref())
    }
}

/// Full list controls: projection, category filter, aggregation
/// matcher, sort order, and paging (`?page=&perPage=` or `?limit=`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub categories: Option<String>,
    pub suggestion: Option<String>,
    pub sort_order: Option<String>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListParams {
    pub fn selection(&self) -> Result<FieldSelection, CoreError> {
        FieldSelection::from_params(self.include.as_deref(), self.exclude.as_deref())
    }

    pub fn options(&self) -> ListOptions {
        ListOptions {
            suggestion: self.suggestion.clone(),
            sort_order: SortOrder::parse(self.sort_order.as_deref()),
            limit: self.limit,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Parameters selecting what a refresh trigger should re-sync.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshParams {
    #[serde(default)]
    pub purge_first: bool,
    pub uuid: Option<String>,
    pub project_id: Option<String>,
}

/// The customer-suggestion matcher (`?suggest=`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestParams {
    pub suggest: Option<String>,
}
