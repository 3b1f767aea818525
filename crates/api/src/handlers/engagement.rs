//! Handlers for the engagement document surface.
//!
//! Create, replace, launch, and delete share one shape: validate before
//! any write, take the event snapshot before the transport fields are
//! cleared, persist, then publish. Single-record responses carry the
//! record's concurrency token in the `last-update` header.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;

use caravel_core::engagement::{self, CreationDetails, HostingEnvironment, Launch};
use caravel_core::error::CoreError;
use caravel_db::models::engagement::{Engagement, EngagementPayload};
use caravel_db::repositories::EngagementRepo;
use caravel_events::SyncMessage;

use crate::error::{AppError, AppResult};
use crate::handlers::{
    document_json, engagement_not_found, last_update_headers, next_last_update_token,
};
use crate::identity::Author;
use crate::query::{ListParams, ProjectionParams};
use crate::state::AppState;

const ALREADY_EXISTS: &str = "engagement already exists, use PUT to update resource";
const UPDATE_TARGET_MISSING: &str = "no engagement found, use POST to create";
const STALE_DATA: &str =
    "Failed to modify engagement because request contained stale data.  Please refresh and try again.";
const ALREADY_LAUNCHED: &str = "engagement has already been launched.";
const DELETE_AFTER_LAUNCH: &str = "cannot delete engagement that has already been launched.";

// --- reads ---------------------------------------------------------------

/// GET /api/v1/engagements
///
/// List engagements ordered by customer and project name. `categories`
/// narrows to records whose category names match any of the given
/// case-insensitive patterns; `include`/`exclude` trim the returned
/// documents.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let selection = params.selection()?;
    let window = params.options().window();

    let rows = match category_patterns(params.categories.as_deref()) {
        Some(patterns) => {
            EngagementRepo::find_by_categories(&state.pool, &patterns, window).await?
        }
        None => EngagementRepo::find_all(&state.pool, window).await?,
    };

    let mut documents = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut document = document_json(row)?;
        selection.apply(&mut document);
        documents.push(document);
    }

    Ok(Json(documents))
}

/// GET /api/v1/engagements/{id}
pub async fn get_by_uuid(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Query(params): Query<ProjectionParams>,
) -> AppResult<impl IntoResponse> {
    let selection = params.selection()?;
    let engagement = EngagementRepo::find_by_uuid(&state.pool, &uuid)
        .await?
        .ok_or_else(|| engagement_not_found(&uuid))?;

    let mut document = document_json(&engagement)?;
    selection.apply(&mut document);

    Ok((
        last_update_headers(engagement.last_update.as_deref()),
        Json(document),
    ))
}

/// GET /api/v1/engagements/customers/{customer}/projects/{project}
pub async fn get_by_customer_and_project(
    State(state): State<AppState>,
    Path((customer, project)): Path<(String, String)>,
    Query(params): Query<ProjectionParams>,
) -> AppResult<impl IntoResponse> {
    let selection = params.selection()?;
    let engagement =
        EngagementRepo::find_by_customer_and_project(&state.pool, &customer, &project)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::NotFound(format!(
                    "no engagement found with customer:project {customer}:{project}"
                )))
            })?;

    let mut document = document_json(&engagement)?;
    selection.apply(&mut document);

    Ok((
        last_update_headers(engagement.last_update.as_deref()),
        Json(document),
    ))
}

// --- writes --------------------------------------------------------------

/// POST /api/v1/engagements
///
/// Create an engagement. The server assigns the uuid, the first
/// last-update token, and the creation details; the submitted commit
/// message rides on the `create` event only and is never persisted.
pub async fn create(
    State(state): State<AppState>,
    author: Author,
    Json(payload): Json<EngagementPayload>,
) -> AppResult<impl IntoResponse> {
    let customer_name = trimmed(&payload.customer_name);
    let project_name = trimmed(&payload.project_name);
    engagement::validate_names(&customer_name, &project_name)?;

    let exists = EngagementRepo::exists_by_uuid_or_names(
        &state.pool,
        payload.uuid.as_deref(),
        &customer_name,
        &project_name,
    )
    .await?;
    if exists {
        return Err(AppError::Core(CoreError::Conflict(ALREADY_EXISTS.to_string())));
    }

    validate_hosting_environments(payload.hosting_environments.as_deref())?;
    check_subdomains_available(&state, payload.hosting_environments.as_deref(), None).await?;

    let mut document = payload.into_document(customer_name, project_name)?;
    document.uuid = Some(uuid::Uuid::new_v4().to_string());
    document.last_update = Some(next_last_update_token());
    document.last_update_by_name = Some(author.name.clone());
    document.last_update_by_email = Some(author.email.clone());
    document.creation_details =
        Some(document_json(&CreationDetails::new(&author.name, &author.email))?);

    // The submitted commit message travels on the event, not the row.
    let snapshot = document_json(&document)?;
    document.commit_message = None;

    let created = EngagementRepo::insert(&state.pool, &document).await?;
    state.event_bus.publish(SyncMessage::Create(snapshot));

    tracing::info!(
        uuid = created.uuid.as_deref().unwrap_or_default(),
        customer = %created.customer_name,
        project = %created.project_name,
        "Engagement created"
    );

    Ok((
        StatusCode::CREATED,
        last_update_headers(created.last_update.as_deref()),
        Json(created),
    ))
}

/// PUT /api/v1/engagements/customers/{customer}/projects/{project}
///
/// Full-document replace guarded by the last-update token embedded in
/// the body. The path names are the resulting business key, so a rename
/// is a PUT to the new path with the record's uuid in the body.
pub async fn update(
    State(state): State<AppState>,
    Path((customer, project)): Path<(String, String)>,
    author: Author,
    Json(payload): Json<EngagementPayload>,
) -> AppResult<impl IntoResponse> {
    let existing =
        locate_for_update(&state, payload.uuid.as_deref(), &customer, &project).await?;
    let (updated, snapshot) =
        guarded_update(&state, &author, existing, payload, customer, project).await?;

    state.event_bus.publish(SyncMessage::Update(snapshot));

    tracing::info!(
        uuid = updated.uuid.as_deref().unwrap_or_default(),
        customer = %updated.customer_name,
        project = %updated.project_name,
        "Engagement updated"
    );

    Ok((
        last_update_headers(updated.last_update.as_deref()),
        Json(updated),
    ))
}

/// PUT /api/v1/engagements/launch
///
/// Mark an engagement as launched. Launch data is set-once: a body that
/// already carries it is rejected up front, and the guarded replace
/// leaves the stored launch column untouched once set.
pub async fn launch(
    State(state): State<AppState>,
    author: Author,
    Json(mut payload): Json<EngagementPayload>,
) -> AppResult<impl IntoResponse> {
    if payload.launch.is_some() {
        return Err(AppError::Core(CoreError::InvalidState(
            ALREADY_LAUNCHED.to_string(),
        )));
    }
    payload.launch = Some(Launch::new(&author.name, &author.email));

    let customer = payload.customer_name.clone().unwrap_or_default();
    let project = payload.project_name.clone().unwrap_or_default();
    let existing =
        locate_for_update(&state, payload.uuid.as_deref(), &customer, &project).await?;

    // The body can omit the names when it identifies the record by uuid.
    let customer_name = if customer.is_empty() {
        existing.customer_name.clone()
    } else {
        customer
    };
    let project_name = if project.is_empty() {
        existing.project_name.clone()
    } else {
        project
    };

    let (updated, snapshot) =
        guarded_update(&state, &author, existing, payload, customer_name, project_name).await?;

    state.event_bus.publish(SyncMessage::Update(snapshot));

    tracing::info!(
        uuid = updated.uuid.as_deref().unwrap_or_default(),
        customer = %updated.customer_name,
        project = %updated.project_name,
        "Engagement launched"
    );

    Ok((
        last_update_headers(updated.last_update.as_deref()),
        Json(updated),
    ))
}

/// DELETE /api/v1/engagements/{id}
///
/// Remove an unlaunched engagement and publish `delete` with the final
/// document.
pub async fn delete(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> AppResult<impl IntoResponse> {
    let engagement = EngagementRepo::find_by_uuid(&state.pool, &uuid)
        .await?
        .ok_or_else(|| engagement_not_found(&uuid))?;

    if engagement.is_launched() {
        return Err(AppError::Core(CoreError::InvalidState(
            DELETE_AFTER_LAUNCH.to_string(),
        )));
    }

    let snapshot = document_json(&engagement)?;
    EngagementRepo::delete_by_uuid(&state.pool, &uuid).await?;
    state.event_bus.publish(SyncMessage::Delete(snapshot));

    tracing::info!(uuid = %uuid, "Engagement deleted");

    Ok(StatusCode::NO_CONTENT)
}

// --- shared write plumbing -----------------------------------------------

/// Find the record a replace targets: by the body's uuid when present,
/// otherwise by the business key.
async fn locate_for_update(
    state: &AppState,
    uuid: Option<&str>,
    customer: &str,
    project: &str,
) -> Result<Engagement, AppError> {
    let found = match uuid {
        Some(uuid) => EngagementRepo::find_by_uuid(&state.pool, uuid).await?,
        None => {
            EngagementRepo::find_by_customer_and_project(&state.pool, customer, project).await?
        }
    };
    found.ok_or_else(|| AppError::Core(CoreError::NotFound(UPDATE_TARGET_MISSING.to_string())))
}

/// Run the guarded replace: validate, reconcile, snapshot, persist.
///
/// Returns the persisted row and the event snapshot. The snapshot keeps
/// the merged commit message and the submitted reset flags; the row is
/// persisted with both cleared.
async fn guarded_update(
    state: &AppState,
    author: &Author,
    existing: Engagement,
    mut payload: EngagementPayload,
    customer_name: String,
    project_name: String,
) -> Result<(Engagement, Value), AppError> {
    let expected_token = payload.last_update.clone();

    validate_hosting_environments(payload.hosting_environments.as_deref())?;
    check_subdomains_available(
        state,
        payload.hosting_environments.as_deref(),
        existing.uuid.as_deref(),
    )
    .await?;
    check_rename_target_free(state, &existing, &customer_name, &project_name).await?;

    // Users keep their stored uuid, matched by email; new ones get a
    // fresh one. Reset flags ride on the event only.
    let mut cleared_users = None;
    if let Some(users) = payload
        .engagement_users
        .as_mut()
        .filter(|users| !users.is_empty())
    {
        engagement::reconcile_user_uuids(users, &existing.users());
        let mut cleared = users.clone();
        engagement::clear_reset_flags(&mut cleared);
        cleared_users = Some(cleared);
    }

    let merged_message = engagement::merge_commit_message(
        existing.commit_message.as_deref(),
        payload.commit_message.as_deref(),
    );
    let skip_launch = existing.is_launched();

    let mut document = payload.into_document(customer_name, project_name)?;
    document.id = existing.id;
    document.uuid = existing.uuid.clone();
    document.project_id = existing.project_id;
    document.status = existing.status.clone();
    document.commits = existing.commits.clone();
    document.creation_details = existing.creation_details.clone();
    document.last_update = Some(next_last_update_token());
    document.last_update_by_name = Some(author.name.clone());
    document.last_update_by_email = Some(author.email.clone());
    document.commit_message = merged_message;
    if skip_launch {
        document.launch = existing.launch.clone();
    }

    // Snapshot before the transport fields are cleared.
    let snapshot = document_json(&document)?;
    document.commit_message = None;
    if let Some(users) = cleared_users {
        document.engagement_users = Some(document_json(&users)?);
    }

    let updated = EngagementRepo::update_if_last_update_matches(
        &state.pool,
        &document,
        expected_token.as_deref(),
        skip_launch,
    )
    .await?
    .ok_or_else(|| AppError::Core(CoreError::Conflict(STALE_DATA.to_string())))?;

    Ok((updated, snapshot))
}

/// Validate the resulting names and, when they differ from the stored
/// key, make sure no other engagement already claims them.
async fn check_rename_target_free(
    state: &AppState,
    existing: &Engagement,
    customer_name: &str,
    project_name: &str,
) -> Result<(), AppError> {
    engagement::validate_names(customer_name, project_name)?;

    if customer_name == existing.customer_name && project_name == existing.project_name {
        return Ok(());
    }

    let taken =
        EngagementRepo::find_by_customer_and_project(&state.pool, customer_name, project_name)
            .await?
            .is_some();
    if taken {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "failed to change name(s).  engagement with customer name '{customer_name}' and project '{project_name}' already exists."
        ))));
    }
    Ok(())
}

/// Reject hosting environments that reuse a subdomain within the same
/// submission.
fn validate_hosting_environments(
    environments: Option<&[HostingEnvironment]>,
) -> Result<(), AppError> {
    let Some(environments) = environments else {
        return Ok(());
    };
    let duplicates = engagement::duplicate_subdomains(environments);
    if !duplicates.is_empty() {
        return Err(AppError::Core(CoreError::Validation(format!(
            "supplied hosting environments has duplicate subdomains for entries {}",
            duplicates.join(", ")
        ))));
    }
    Ok(())
}

/// Reject subdomains another engagement already claims. On update the
/// record's own uuid is excluded so re-submitting its own subdomains
/// stays legal.
async fn check_subdomains_available(
    state: &AppState,
    environments: Option<&[HostingEnvironment]>,
    own_uuid: Option<&str>,
) -> Result<(), AppError> {
    let Some(environments) = environments else {
        return Ok(());
    };

    let mut in_use = Vec::new();
    for environment in environments {
        let Some(subdomain) = environment.ocp_sub_domain.as_deref() else {
            continue;
        };
        if EngagementRepo::exists_by_subdomain(&state.pool, subdomain, own_uuid).await? {
            in_use.push(subdomain.to_string());
        }
    }

    if !in_use.is_empty() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "The following subdomains are already in use: {}",
            in_use.join(", ")
        ))));
    }
    Ok(())
}

fn trimmed(name: &Option<String>) -> String {
    name.as_deref().unwrap_or_default().trim().to_string()
}

fn category_patterns(raw: Option<&str>) -> Option<Vec<String>> {
    let patterns: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(str::to_string)
        .collect();
    (!patterns.is_empty()).then_some(patterns)
}
