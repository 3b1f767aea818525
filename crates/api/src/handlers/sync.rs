//! Synchronization surface: the git push hook, resync triggers, the
//! uuid backfill, and the worker-facing mirror write-backs.
//!
//! Everything here is about keeping the database and the git mirror in
//! step. The hook and refresh endpoints only emit events; the heavy
//! lifting happens in whatever consumes the bus. The write-backs are
//! the reverse direction: the sync worker replacing server-owned
//! columns, bypassing the concurrency token and emitting no events.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;

use caravel_core::engagement::{BACKEND_BOT, BACKEND_BOT_EMAIL};
use caravel_core::error::CoreError;
use caravel_core::filter::PageWindow;
use caravel_core::hook::Hook;
use caravel_core::types::DbId;
use caravel_db::models::engagement::Engagement;
use caravel_db::repositories::EngagementRepo;
use caravel_events::SyncMessage;

use crate::error::{AppError, AppResult};
use crate::handlers::{document_json, engagement_not_found, next_last_update_token};
use crate::query::RefreshParams;
use crate::state::AppState;

const HOOK_TARGET_MISSING: &str = "no engagement found. unable to update from hook.";

/// Rows fetched per round of the backfill scan.
const BACKFILL_BATCH_SIZE: i64 = 200;

// --- inbound from the git host -------------------------------------------

/// POST /api/v1/engagements/hook
///
/// Push notification from the git host. A commit message carrying one
/// of the configured filter fragments short-circuits into a full
/// project resync; otherwise the engagement named by the repository
/// namespace gets a `status-update` event when the status file changed,
/// and a `commits-update` event either way.
pub async fn process_hook(
    State(state): State<AppState>,
    Json(hook): Json<Hook>,
) -> AppResult<impl IntoResponse> {
    if hook.contains_any_message(&state.config.commit_filtered_messages) {
        let project_id = hook
            .project
            .id
            .map(|id| id.to_string())
            .unwrap_or_default();
        tracing::info!(project_id = %project_id, "Hook requested manual refresh");
        state
            .event_bus
            .publish(SyncMessage::FullResyncByProject(project_id));
        return Ok(StatusCode::OK);
    }

    let engagement = locate_by_hook(&state, &hook).await?;
    let snapshot = document_json(&engagement)?;

    if hook.did_file_change(&state.config.status_file) {
        state
            .event_bus
            .publish(SyncMessage::StatusUpdate(snapshot.clone()));
    }
    state.event_bus.publish(SyncMessage::CommitsUpdate(snapshot));

    tracing::info!(
        customer = %engagement.customer_name,
        project = %engagement.project_name,
        "Hook processed"
    );

    Ok(StatusCode::OK)
}

/// Try each customer/project pair the hook namespace yields: display
/// names first, path slugs second.
async fn locate_by_hook(state: &AppState, hook: &Hook) -> Result<Engagement, AppError> {
    for (customer, project) in hook.name_candidates() {
        if let Some(engagement) =
            EngagementRepo::find_by_customer_and_project(&state.pool, &customer, &project).await?
        {
            return Ok(engagement);
        }
    }
    Err(AppError::Core(CoreError::NotFound(
        HOOK_TARGET_MISSING.to_string(),
    )))
}

// --- operator triggers ---------------------------------------------------

/// PUT /api/v1/engagements/refresh
///
/// Emit the resync event matching the parameters: `uuid` resyncs one
/// record by its git project id, `projectId` resyncs a project,
/// `purgeFirst` drops local state before reloading, and no parameters
/// at all means a plain reload. Responds 202; the work happens in the
/// consumer.
pub async fn refresh(
    State(state): State<AppState>,
    Query(params): Query<RefreshParams>,
) -> AppResult<impl IntoResponse> {
    let message = if let Some(uuid) = params.uuid.as_deref() {
        let engagement = EngagementRepo::find_by_uuid(&state.pool, uuid)
            .await?
            .ok_or_else(|| engagement_not_found(uuid))?;
        let project_id = engagement
            .project_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        SyncMessage::FullResyncById(project_id)
    } else if let Some(project_id) = params.project_id.clone() {
        SyncMessage::FullResyncByProject(project_id)
    } else if params.purge_first {
        SyncMessage::PurgeAndReload
    } else {
        SyncMessage::Load
    };

    tracing::info!(address = message.address(), "Refresh requested");
    state.event_bus.publish(message);

    Ok(StatusCode::ACCEPTED)
}

/// PUT /api/v1/engagements/uuids
///
/// Assign uuids to engagements and users imported without them. The
/// scan pages through the collection in fixed-size batches and repairs
/// each record independently, so an interrupted pass leaves prior
/// repairs committed and a rerun picks up the rest. Each repaired
/// record gets a fresh token attributed to the backend bot and an
/// `update` event. Responds with the number of records changed.
pub async fn backfill_uuids(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let mut changed = 0u64;
    let mut skip = 0i64;
    loop {
        let window = PageWindow {
            skip: Some(skip),
            take: Some(BACKFILL_BATCH_SIZE),
        };
        let rows = EngagementRepo::find_all(&state.pool, window).await?;
        let fetched = rows.len() as i64;

        for row in rows {
            if backfill_record(&state, row).await? {
                changed += 1;
            }
        }

        if fetched < BACKFILL_BATCH_SIZE {
            break;
        }
        skip += BACKFILL_BATCH_SIZE;
    }

    tracing::info!(changed, "Uuid backfill completed");
    Ok(Json(changed))
}

/// Repair one record: mint the missing uuids, write them back with bot
/// attribution, publish the refreshed document. Returns whether the row
/// needed anything.
async fn backfill_record(state: &AppState, row: Engagement) -> Result<bool, AppError> {
    let record_needs_uuid = row.uuid.is_none();
    let record_uuid = match row.uuid.clone() {
        Some(uuid) => uuid,
        None => uuid::Uuid::new_v4().to_string(),
    };

    let mut users = row.users();
    let users_need_uuids = users.iter().any(|user| user.uuid.is_none());
    for user in users.iter_mut().filter(|user| user.uuid.is_none()) {
        user.uuid = Some(uuid::Uuid::new_v4().to_string());
    }

    if !record_needs_uuid && !users_need_uuids {
        return Ok(false);
    }

    let repaired_users = if users_need_uuids {
        Some(document_json(&users)?)
    } else {
        None
    };

    let updated = EngagementRepo::apply_uuid_backfill(
        &state.pool,
        row.id,
        &record_uuid,
        repaired_users.as_ref(),
        &next_last_update_token(),
        BACKEND_BOT,
        BACKEND_BOT_EMAIL,
    )
    .await?;

    match updated {
        Some(updated) => {
            state
                .event_bus
                .publish(SyncMessage::Update(document_json(&updated)?));
            Ok(true)
        }
        None => Ok(false),
    }
}

// --- worker write-backs --------------------------------------------------

/// PUT /api/v1/engagements/{id}/status
///
/// Replace the mirrored status document for the given uuid.
pub async fn set_status(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Json(status): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let updated = EngagementRepo::set_status(&state.pool, &uuid, &status)
        .await?
        .ok_or_else(|| engagement_not_found(&uuid))?;

    tracing::info!(uuid = %uuid, "Status mirror updated");
    Ok(Json(updated))
}

/// PUT /api/v1/engagements/{id}/commits
///
/// Replace the mirrored commit log for the given uuid.
pub async fn set_commits(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Json(commits): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let updated = EngagementRepo::set_commits(&state.pool, &uuid, &commits)
        .await?
        .ok_or_else(|| engagement_not_found(&uuid))?;

    tracing::info!(uuid = %uuid, "Commit mirror updated");
    Ok(Json(updated))
}

/// PUT /api/v1/engagements/{id}/project/{project_id}
///
/// Record the git project id backing the given engagement.
pub async fn set_project_id(
    State(state): State<AppState>,
    Path((uuid, project_id)): Path<(String, DbId)>,
) -> AppResult<impl IntoResponse> {
    let updated = EngagementRepo::set_project_id(&state.pool, &uuid, project_id)
        .await?
        .ok_or_else(|| engagement_not_found(&uuid))?;

    tracing::info!(uuid = %uuid, project_id, "Project id recorded");
    Ok(Json(updated))
}
