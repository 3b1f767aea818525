//! HTTP-level integration tests for the engagement document surface:
//! create, lookup, guarded replace, launch, and delete.
//!
//! Uses Axum's tower::ServiceExt to send requests directly to the router
//! without an actual TCP listener.

mod common;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, delete, get, post_json, put_json};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;

fn engagement(customer: &str, project: &str) -> serde_json::Value {
    json!({
        "customerName": customer,
        "projectName": project,
        "description": "kickoff"
    })
}

/// Create an engagement and return its response document.
async fn create_engagement(pool: &PgPool, customer: &str, project: &str) -> serde_json::Value {
    let app = common::build_test_app(pool.clone());
    let response = post_json(app, "/api/v1/engagements", engagement(customer, project)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

fn replace_uri(customer: &str, project: &str) -> String {
    format!("/api/v1/engagements/customers/{customer}/projects/{project}")
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_returns_201_with_server_owned_fields(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(app, "/api/v1/engagements", engagement("Acme", "Rocket")).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let header = response
        .headers()
        .get("last-update")
        .expect("create response must carry the last-update header")
        .clone();

    let json = body_json(response).await;
    assert_eq!(json["customerName"], "Acme");
    assert_eq!(json["projectName"], "Rocket");
    assert!(json["uuid"].is_string(), "server must assign the uuid");
    assert!(json["lastUpdate"].is_string());
    assert_eq!(header.to_str().unwrap(), json["lastUpdate"].as_str().unwrap());
    assert!(json["creationDetails"]["createdOn"].is_string());
    // The row id and bookkeeping timestamps never leave the database layer.
    assert!(json.get("id").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_trims_names(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/engagements",
        engagement("  Acme  ", "  Rocket  "),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["customerName"], "Acme");
    assert_eq!(json["projectName"], "Rocket");

    let app = common::build_test_app(pool);
    let response = get(app, &replace_uri("Acme", "Rocket")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_duplicate_returns_409(pool: PgPool) {
    create_engagement(&pool, "Acme", "Rocket").await;

    let app = common::build_test_app(pool);
    let response = post_json(app, "/api/v1/engagements", engagement("Acme", "Rocket")).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "engagement already exists, use PUT to update resource"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_rejects_overlong_names(pool: PgPool) {
    let app = common::build_test_app(pool);
    let long = "x".repeat(256);
    let response = post_json(app, "/api/v1/engagements", engagement(&long, "Rocket")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "names cannot be greater than 255 characters.");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_rejects_duplicate_subdomains_within_submission(pool: PgPool) {
    let app = common::build_test_app(pool);
    let mut payload = engagement("Acme", "Rocket");
    payload["hostingEnvironments"] = json!([
        {"environmentName": "dev", "ocpSubDomain": "Apps"},
        {"environmentName": "prod", "ocpSubDomain": "apps"}
    ]);

    let response = post_json(app, "/api/v1/engagements", payload).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "supplied hosting environments has duplicate subdomains for entries apps"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_rejects_subdomain_claimed_by_another_engagement(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let mut first = engagement("Acme", "Rocket");
    first["hostingEnvironments"] = json!([{"environmentName": "dev", "ocpSubDomain": "alpha"}]);
    let response = post_json(app, "/api/v1/engagements", first).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let app = common::build_test_app(pool);
    let mut second = engagement("Globex", "Comet");
    second["hostingEnvironments"] = json!([{"environmentName": "dev", "ocpSubDomain": "alpha"}]);
    let response = post_json(app, "/api/v1/engagements", second).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "The following subdomains are already in use: alpha"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_never_persists_the_commit_message(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let mut payload = engagement("Acme", "Rocket");
    payload["commitMessage"] = json!("initial import");

    let response = post_json(app, "/api/v1/engagements", payload).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert!(created["commitMessage"].is_null());

    let app = common::build_test_app(pool);
    let response = get(
        app,
        &format!("/api/v1/engagements/{}", created["uuid"].as_str().unwrap()),
    )
    .await;
    let fetched = body_json(response).await;
    assert!(fetched["commitMessage"].is_null());
}

// ---------------------------------------------------------------------------
// Attribution
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_stamps_author_headers_into_attribution(pool: PgPool) {
    let app = common::build_test_app(pool);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/engagements")
        .header(CONTENT_TYPE, "application/json")
        .header("x-author-name", "Morgan")
        .header("x-author-email", "morgan@example.com")
        .body(Body::from(engagement("Acme", "Rocket").to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["lastUpdateByName"], "Morgan");
    assert_eq!(json["lastUpdateByEmail"], "morgan@example.com");
    assert_eq!(json["creationDetails"]["createdByUser"], "Morgan");
    assert_eq!(json["creationDetails"]["createdByEmail"], "morgan@example.com");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_author_headers_fall_back_to_defaults(pool: PgPool) {
    let json = create_engagement(&pool, "Acme", "Rocket").await;
    assert_eq!(json["lastUpdateByName"], "caravel-user");
    assert_eq!(json["lastUpdateByEmail"], "caravel-email");
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn get_by_uuid_returns_document_and_token_header(pool: PgPool) {
    let created = create_engagement(&pool, "Acme", "Rocket").await;
    let uuid = created["uuid"].as_str().unwrap();

    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/engagements/{uuid}")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let header = response
        .headers()
        .get("last-update")
        .expect("single-record GET must carry the last-update header")
        .clone();
    let json = body_json(response).await;
    assert_eq!(json["uuid"], created["uuid"]);
    assert_eq!(header.to_str().unwrap(), json["lastUpdate"].as_str().unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn get_by_unknown_uuid_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/engagements/no-such-uuid").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "no engagement found with id no-such-uuid");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn get_by_customer_and_project(pool: PgPool) {
    create_engagement(&pool, "Acme", "Rocket").await;

    let app = common::build_test_app(pool);
    let response = get(app, &replace_uri("Acme", "Rocket")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["customerName"], "Acme");
    assert_eq!(json["projectName"], "Rocket");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn get_by_unknown_business_key_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, &replace_uri("Ghost", "Ship")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "no engagement found with customer:project Ghost:Ship"
    );
}

// ---------------------------------------------------------------------------
// Guarded replace
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_replaces_document_and_advances_token(pool: PgPool) {
    let mut doc = create_engagement(&pool, "Acme", "Rocket").await;
    let first_token = doc["lastUpdate"].as_str().unwrap().to_string();
    doc["description"] = json!("revised scope");

    let app = common::build_test_app(pool.clone());
    let response = put_json(app, &replace_uri("Acme", "Rocket"), doc).await;

    assert_eq!(response.status(), StatusCode::OK);
    let header = response.headers().get("last-update").cloned();
    let json = body_json(response).await;
    assert_eq!(json["description"], "revised scope");

    let new_token = json["lastUpdate"].as_str().unwrap();
    assert_ne!(new_token, first_token, "every replace must mint a new token");
    assert_eq!(header.unwrap().to_str().unwrap(), new_token);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_with_stale_token_returns_409_and_leaves_row_alone(pool: PgPool) {
    let created = create_engagement(&pool, "Acme", "Rocket").await;
    let uuid = created["uuid"].as_str().unwrap().to_string();
    let stale_token = created["lastUpdate"].clone();

    // First replace succeeds and moves the token on.
    let mut doc = created.clone();
    doc["description"] = json!("first revision");
    let app = common::build_test_app(pool.clone());
    let response = put_json(app, &replace_uri("Acme", "Rocket"), doc).await;
    assert_eq!(response.status(), StatusCode::OK);
    let current = body_json(response).await;

    // Second replace still carries the original token.
    let mut stale = created.clone();
    stale["description"] = json!("lost update");
    stale["lastUpdate"] = stale_token;
    let app = common::build_test_app(pool.clone());
    let response = put_json(app, &replace_uri("Acme", "Rocket"), stale).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "Failed to modify engagement because request contained stale data.  Please refresh and try again."
    );

    // The stored row is untouched by the losing write.
    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/engagements/{uuid}")).await;
    let stored = body_json(response).await;
    assert_eq!(stored["description"], "first revision");
    assert_eq!(stored["lastUpdate"], current["lastUpdate"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_of_missing_engagement_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = put_json(
        app,
        &replace_uri("Ghost", "Ship"),
        engagement("Ghost", "Ship"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "no engagement found, use POST to create");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rename_via_uuid_moves_the_business_key(pool: PgPool) {
    let mut doc = create_engagement(&pool, "Acme", "Rocket").await;
    doc["projectName"] = json!("Falcon");

    let app = common::build_test_app(pool.clone());
    let response = put_json(app, &replace_uri("Acme", "Falcon"), doc).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["projectName"], "Falcon");

    let app = common::build_test_app(pool.clone());
    let response = get(app, &replace_uri("Acme", "Rocket")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let app = common::build_test_app(pool);
    let response = get(app, &replace_uri("Acme", "Falcon")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rename_onto_existing_key_returns_409(pool: PgPool) {
    create_engagement(&pool, "Acme", "Rocket").await;
    let other = create_engagement(&pool, "Globex", "Comet").await;

    // Try to move Globex/Comet onto Acme/Rocket.
    let app = common::build_test_app(pool);
    let response = put_json(app, &replace_uri("Acme", "Rocket"), other).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "failed to change name(s).  engagement with customer name 'Acme' and project 'Rocket' already exists."
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_may_resubmit_its_own_subdomains(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let mut payload = engagement("Acme", "Rocket");
    payload["hostingEnvironments"] = json!([{"environmentName": "dev", "ocpSubDomain": "alpha"}]);
    let response = post_json(app, "/api/v1/engagements", payload).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let doc = body_json(response).await;

    // Round-tripping the document keeps its own subdomain without conflict.
    let app = common::build_test_app(pool);
    let response = put_json(app, &replace_uri("Acme", "Rocket"), doc).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_reconciles_user_uuids_and_clears_reset_flags(pool: PgPool) {
    let created = create_engagement(&pool, "Acme", "Rocket").await;

    // First replace introduces a user; the server mints their uuid.
    let mut doc = created.clone();
    doc["engagementUsers"] = json!([
        {"firstName": "Ada", "email": "ada@example.com", "role": "developer"}
    ]);
    let app = common::build_test_app(pool.clone());
    let response = put_json(app, &replace_uri("Acme", "Rocket"), doc).await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    let minted = first["engagementUsers"][0]["uuid"]
        .as_str()
        .expect("server must assign the user uuid")
        .to_string();

    // Second replace spoofs the uuid and raises the reset flag; the
    // stored uuid wins and the flag never reaches the row.
    let mut doc = first.clone();
    doc["engagementUsers"] = json!([
        {"firstName": "Ada", "email": "ada@example.com", "uuid": "spoofed", "reset": true},
        {"firstName": "Grace", "email": "grace@example.com"}
    ]);
    let app = common::build_test_app(pool);
    let response = put_json(app, &replace_uri("Acme", "Rocket"), doc).await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = body_json(response).await;

    let users = second["engagementUsers"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["uuid"], minted.as_str());
    assert!(users[1]["uuid"].is_string());
    assert_ne!(users[1]["uuid"], users[0]["uuid"]);
    assert_eq!(users[0]["reset"], false);
    assert_eq!(users[1]["reset"], false);
}

// ---------------------------------------------------------------------------
// Launch
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn launch_stamps_launch_data(pool: PgPool) {
    let doc = create_engagement(&pool, "Acme", "Rocket").await;

    let app = common::build_test_app(pool.clone());
    let response = put_json(app, "/api/v1/engagements/launch", doc).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["launch"]["launchedDateTime"].is_string());
    assert_eq!(json["launch"]["launchedBy"], "caravel-user");
    assert_eq!(json["launch"]["launchedByEmail"], "caravel-email");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn launch_of_already_launched_body_returns_400(pool: PgPool) {
    let doc = create_engagement(&pool, "Acme", "Rocket").await;

    let app = common::build_test_app(pool.clone());
    let response = put_json(app, "/api/v1/engagements/launch", doc).await;
    assert_eq!(response.status(), StatusCode::OK);
    let launched = body_json(response).await;

    let app = common::build_test_app(pool);
    let response = put_json(app, "/api/v1/engagements/launch", launched).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "engagement has already been launched.");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn launch_data_is_immutable_once_set(pool: PgPool) {
    let doc = create_engagement(&pool, "Acme", "Rocket").await;

    let app = common::build_test_app(pool.clone());
    let response = put_json(app, "/api/v1/engagements/launch", doc).await;
    assert_eq!(response.status(), StatusCode::OK);
    let launched = body_json(response).await;
    let launch_time = launched["launch"]["launchedDateTime"].clone();

    // A later replace cannot overwrite or clear the launch column, even
    // when its body says otherwise.
    let mut doc = launched.clone();
    doc["launch"] = serde_json::Value::Null;
    doc["description"] = json!("post-launch edit");
    let app = common::build_test_app(pool);
    let response = put_json(app, &replace_uri("Acme", "Rocket"), doc).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["description"], "post-launch edit");
    assert_eq!(json["launch"]["launchedDateTime"], launch_time);
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_removes_the_engagement(pool: PgPool) {
    let created = create_engagement(&pool, "Acme", "Rocket").await;
    let uuid = created["uuid"].as_str().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = delete(app, &format!("/api/v1/engagements/{uuid}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/engagements/{uuid}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_of_launched_engagement_returns_400(pool: PgPool) {
    let doc = create_engagement(&pool, "Acme", "Rocket").await;
    let uuid = doc["uuid"].as_str().unwrap().to_string();

    let app = common::build_test_app(pool.clone());
    let response = put_json(app, "/api/v1/engagements/launch", doc).await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool);
    let response = delete(app, &format!("/api/v1/engagements/{uuid}")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "cannot delete engagement that has already been launched."
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_of_unknown_uuid_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = delete(app, "/api/v1/engagements/no-such-uuid").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "no engagement found with id no-such-uuid");
}
