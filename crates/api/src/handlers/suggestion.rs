//! Aggregation handlers: category counts, artifact types, and customer
//! name suggestions for typeahead fields.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;

use caravel_core::error::CoreError;
use caravel_db::repositories::EngagementRepo;

use crate::error::AppResult;
use crate::query::{ListParams, SuggestParams};
use crate::state::AppState;

/// GET /api/v1/engagements/categories
///
/// Category usage counts, folded to lowercase. `suggestion` narrows the
/// names by a case-insensitive pattern, `sortOrder` flips the count
/// ordering, and the usual paging parameters apply.
pub async fn category_counts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    // include/exclude stay mutually exclusive here even though the
    // summaries carry no projectable fields.
    params.selection()?;

    let options = params.options();
    let summaries = EngagementRepo::category_counts(
        &state.pool,
        options.suggestion.as_deref(),
        options.sort_order.is_ascending(),
        options.window(),
    )
    .await?;

    Ok(Json(summaries))
}

/// GET /api/v1/engagements/artifact/types
///
/// Distinct artifact type strings in use across all engagements.
pub async fn artifact_types(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    params.selection()?;

    let options = params.options();
    let types = EngagementRepo::artifact_types(
        &state.pool,
        options.suggestion.as_deref(),
        options.sort_order.is_ascending(),
        options.window(),
    )
    .await?;

    Ok(Json(types))
}

/// GET /api/v1/engagements/customers/suggest
///
/// Distinct customer names matching the `suggest` pattern, ascending.
/// The parameter is required and must not be blank.
pub async fn customer_suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> AppResult<impl IntoResponse> {
    let pattern = params
        .suggest
        .as_deref()
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .ok_or_else(|| CoreError::Validation("suggest parameter cannot be blank".to_string()))?;

    let names = EngagementRepo::customer_suggestions(&state.pool, pattern).await?;
    Ok(Json(names))
}
