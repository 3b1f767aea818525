//! Route definitions for the `/engagements` resource.
//!
//! The document CRUD surface, the aggregation endpoints, and the
//! synchronization surface (hook, refresh, write-backs) all live under
//! one mount so the whole engagement API ships as a single router.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{engagement, suggestion, sync};
use crate::state::AppState;

/// Routes mounted at `/engagements`.
///
/// ```text
/// GET    /                                          -> list
/// POST   /                                          -> create
/// GET    /categories                                -> category_counts
/// GET    /artifact/types                            -> artifact_types
/// GET    /customers/suggest                         -> customer_suggestions
/// GET    /customers/{customer}/projects/{project}   -> get_by_customer_and_project
/// PUT    /customers/{customer}/projects/{project}   -> update
/// PUT    /launch                                    -> launch
/// PUT    /refresh                                   -> refresh
/// PUT    /uuids                                     -> backfill_uuids
/// POST   /hook                                      -> process_hook
/// GET    /{id}                                      -> get_by_uuid
/// DELETE /{id}                                      -> delete
/// PUT    /{id}/status                               -> set_status
/// PUT    /{id}/commits                              -> set_commits
/// PUT    /{id}/project/{project_id}                 -> set_project_id
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(engagement::list).post(engagement::create))
        .route("/categories", get(suggestion::category_counts))
        .route("/artifact/types", get(suggestion::artifact_types))
        .route("/customers/suggest", get(suggestion::customer_suggestions))
        .route(
            "/customers/{customer}/projects/{project}",
            get(engagement::get_by_customer_and_project).put(engagement::update),
        )
        .route("/launch", put(engagement::launch))
        .route("/refresh", put(sync::refresh))
        .route("/uuids", put(sync::backfill_uuids))
        .route("/hook", post(sync::process_hook))
        .route(
            "/{id}",
            get(engagement::get_by_uuid).delete(engagement::delete),
        )
        .route("/{id}/status", put(sync::set_status))
        .route("/{id}/commits", put(sync::set_commits))
        .route("/{id}/project/{project_id}", put(sync::set_project_id))
}
