pub mod engagement;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /engagements                                          list, create
/// /engagements/categories                               category usage counts
/// /engagements/artifact/types                           distinct artifact types
/// /engagements/customers/suggest                        customer name suggestions
/// /engagements/customers/{customer}/projects/{project}  get, replace (PUT)
/// /engagements/launch                                   launch flow (PUT)
/// /engagements/refresh                                  emit resync events (PUT)
/// /engagements/uuids                                    uuid backfill (PUT)
/// /engagements/hook                                     git push hook (POST)
/// /engagements/{id}                                     get, delete (by uuid)
/// /engagements/{id}/status                              status write-back (PUT)
/// /engagements/{id}/commits                             commits write-back (PUT)
/// /engagements/{id}/project/{project_id}                project id write-back (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Engagement store: documents, aggregations, sync surface.
        .nest("/engagements", engagement::router())
}
