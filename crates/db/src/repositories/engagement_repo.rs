//! Repository for the `engagements` table.
//!
//! Writes follow two distinct shapes: inserts persist a fully prepared
//! document, and updates are full-document replacements guarded by the
//! last-update token. Columns the server owns (identity, creation
//! details, status and commit mirrors) are never part of an update.

use sqlx::PgPool;

use caravel_core::filter::PageWindow;
use caravel_core::types::DbId;

use crate::models::engagement::{CategorySummary, Engagement};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, uuid, customer_name, project_name, project_id, description, location, \
     start_date, end_date, archive_date, \
     engagement_lead_name, engagement_lead_email, \
     technical_lead_name, technical_lead_email, \
     customer_contact_name, customer_contact_email, \
     last_update, last_update_by_name, last_update_by_email, \
     commit_message, launch, status, commits, creation_details, \
     engagement_users, hosting_environments, categories, artifacts, \
     created_at, updated_at";

/// Columns replaced on every guarded update, in bind order. `$1` is the
/// row id and `$2` the expected last-update token, so assignments start
/// at `$3`.
const UPDATED_COLUMNS: &[&str] = &[
    "customer_name",
    "project_name",
    "description",
    "location",
    "start_date",
    "end_date",
    "archive_date",
    "engagement_lead_name",
    "engagement_lead_email",
    "technical_lead_name",
    "technical_lead_email",
    "customer_contact_name",
    "customer_contact_email",
    "last_update",
    "last_update_by_name",
    "last_update_by_email",
    "commit_message",
    "engagement_users",
    "hosting_environments",
    "categories",
    "artifacts",
];

/// Columns a guarded update must never touch.
const PROTECTED_COLUMNS: &[&str] = &[
    "id",
    "uuid",
    "project_id",
    "creation_details",
    "status",
    "commits",
    "created_at",
];

/// Build the SET clause for a guarded update. The launch column is
/// included only while the stored row is unlaunched; once set, launch
/// data is immutable.
fn update_assignments(skip_launch: bool) -> String {
    let mut assignments: Vec<String> = Vec::new();
    let mut bind_idx = 3u32;

    for column in UPDATED_COLUMNS {
        assignments.push(format!("{column} = ${bind_idx}"));
        bind_idx += 1;
    }

    if !skip_launch {
        assignments.push(format!("launch = ${bind_idx}"));
    }

    assignments.push("updated_at = NOW()".to_string());
    assignments.join(", ")
}

/// Provides persistence operations for engagements.
pub struct EngagementRepo;

impl EngagementRepo {
    /// Insert a prepared engagement document, returning the created row.
    pub async fn insert(pool: &PgPool, engagement: &Engagement) -> Result<Engagement, sqlx::Error> {
        let query = format!(
            "INSERT INTO engagements (
                uuid, customer_name, project_name, project_id, description, location,
                start_date, end_date, archive_date,
                engagement_lead_name, engagement_lead_email,
                technical_lead_name, technical_lead_email,
                customer_contact_name, customer_contact_email,
                last_update, last_update_by_name, last_update_by_email,
                commit_message, launch, status, commits, creation_details,
                engagement_users, hosting_environments, categories, artifacts
             ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(&engagement.uuid)
            .bind(&engagement.customer_name)
            .bind(&engagement.project_name)
            .bind(engagement.project_id)
            .bind(&engagement.description)
            .bind(&engagement.location)
            .bind(&engagement.start_date)
            .bind(&engagement.end_date)
            .bind(&engagement.archive_date)
            .bind(&engagement.engagement_lead_name)
            .bind(&engagement.engagement_lead_email)
            .bind(&engagement.technical_lead_name)
            .bind(&engagement.technical_lead_email)
            .bind(&engagement.customer_contact_name)
            .bind(&engagement.customer_contact_email)
            .bind(&engagement.last_update)
            .bind(&engagement.last_update_by_name)
            .bind(&engagement.last_update_by_email)
            .bind(&engagement.commit_message)
            .bind(&engagement.launch)
            .bind(&engagement.status)
            .bind(&engagement.commits)
            .bind(&engagement.creation_details)
            .bind(&engagement.engagement_users)
            .bind(&engagement.hosting_environments)
            .bind(&engagement.categories)
            .bind(&engagement.artifacts)
            .fetch_one(pool)
            .await
    }

    /// Find an engagement by its public uuid.
    pub async fn find_by_uuid(pool: &PgPool, uuid: &str) -> Result<Option<Engagement>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM engagements WHERE uuid = $1");
        sqlx::query_as::<_, Engagement>(&query)
            .bind(uuid)
            .fetch_optional(pool)
            .await
    }

    /// Find an engagement by its customer/project business key.
    pub async fn find_by_customer_and_project(
        pool: &PgPool,
        customer_name: &str,
        project_name: &str,
    ) -> Result<Option<Engagement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM engagements WHERE customer_name = $1 AND project_name = $2"
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(customer_name)
            .bind(project_name)
            .fetch_optional(pool)
            .await
    }

    /// List engagements ordered by business key, optionally windowed.
    pub async fn find_all(
        pool: &PgPool,
        window: PageWindow,
    ) -> Result<Vec<Engagement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM engagements
             ORDER BY customer_name, project_name
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(window.take)
            .bind(window.skip)
            .fetch_all(pool)
            .await
    }

    /// List engagements carrying at least one category whose name
    /// matches any of the given patterns (case-insensitive).
    pub async fn find_by_categories(
        pool: &PgPool,
        patterns: &[String],
        window: PageWindow,
    ) -> Result<Vec<Engagement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM engagements e
             WHERE EXISTS (
                 SELECT 1
                 FROM jsonb_array_elements(COALESCE(e.categories, '[]'::jsonb)) AS c
                 WHERE c->>'name' ~* ANY($1)
             )
             ORDER BY customer_name, project_name
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(patterns)
            .bind(window.take)
            .bind(window.skip)
            .fetch_all(pool)
            .await
    }

    /// Whether any engagement matches the given uuid or business key.
    pub async fn exists_by_uuid_or_names(
        pool: &PgPool,
        uuid: Option<&str>,
        customer_name: &str,
        project_name: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                 SELECT 1 FROM engagements
                 WHERE uuid = $1 OR (customer_name = $2 AND project_name = $3)
             )",
        )
        .bind(uuid)
        .bind(customer_name)
        .bind(project_name)
        .fetch_one(pool)
        .await
    }

    /// Whether any engagement other than `excluding_uuid` uses the given
    /// subdomain (case-insensitive exact match).
    pub async fn exists_by_subdomain(
        pool: &PgPool,
        subdomain: &str,
        excluding_uuid: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                 SELECT 1 FROM engagements e
                 WHERE ($2::text IS NULL OR e.uuid IS DISTINCT FROM $2)
                   AND EXISTS (
                       SELECT 1
                       FROM jsonb_array_elements(COALESCE(e.hosting_environments, '[]'::jsonb)) AS he
                       WHERE LOWER(he->>'ocpSubDomain') = LOWER($1)
                   )
             )",
        )
        .bind(subdomain)
        .bind(excluding_uuid)
        .fetch_one(pool)
        .await
    }

    /// Distinct customer names matching the pattern, sorted ascending.
    pub async fn customer_suggestions(
        pool: &PgPool,
        pattern: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT customer_name FROM engagements
             WHERE customer_name ~* $1
             ORDER BY customer_name",
        )
        .bind(pattern)
        .fetch_all(pool)
        .await
    }

    /// Aggregate category usage across all engagements.
    ///
    /// Names are folded to lowercase before grouping; ties on count are
    /// broken by name. `suggestion` filters names case-insensitively.
    pub async fn category_counts(
        pool: &PgPool,
        suggestion: Option<&str>,
        ascending: bool,
        window: PageWindow,
    ) -> Result<Vec<CategorySummary>, sqlx::Error> {
        let direction = if ascending { "ASC" } else { "DESC" };
        let query = format!(
            "SELECT LOWER(c->>'name') AS name, COUNT(*) AS count
             FROM engagements e
             CROSS JOIN jsonb_array_elements(COALESCE(e.categories, '[]'::jsonb)) AS c
             WHERE c->>'name' IS NOT NULL
               AND ($1::text IS NULL OR c->>'name' ~* $1)
             GROUP BY LOWER(c->>'name')
             ORDER BY count {direction}, name ASC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, CategorySummary>(&query)
            .bind(suggestion)
            .bind(window.take)
            .bind(window.skip)
            .fetch_all(pool)
            .await
    }

    /// Distinct artifact types in use, folded to lowercase.
    pub async fn artifact_types(
        pool: &PgPool,
        suggestion: Option<&str>,
        ascending: bool,
        window: PageWindow,
    ) -> Result<Vec<String>, sqlx::Error> {
        let direction = if ascending { "ASC" } else { "DESC" };
        let query = format!(
            "SELECT DISTINCT LOWER(a->>'type') AS artifact_type
             FROM engagements e
             CROSS JOIN jsonb_array_elements(COALESCE(e.artifacts, '[]'::jsonb)) AS a
             WHERE a->>'type' IS NOT NULL
               AND ($1::text IS NULL OR a->>'type' ~* $1)
             ORDER BY artifact_type {direction}
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_scalar::<_, String>(&query)
            .bind(suggestion)
            .bind(window.take)
            .bind(window.skip)
            .fetch_all(pool)
            .await
    }

    /// Replace an engagement document if the stored last-update token
    /// still matches `expected`.
    ///
    /// Returns `None` when the row is gone or the token has moved on,
    /// which callers surface as a stale-data conflict.
    pub async fn update_if_last_update_matches(
        pool: &PgPool,
        engagement: &Engagement,
        expected: Option<&str>,
        skip_launch: bool,
    ) -> Result<Option<Engagement>, sqlx::Error> {
        let assignments = update_assignments(skip_launch);
        let query = format!(
            "UPDATE engagements SET {assignments}
             WHERE id = $1 AND last_update IS NOT DISTINCT FROM $2
             RETURNING {COLUMNS}"
        );

        // Bind order mirrors UPDATED_COLUMNS.
        let mut q = sqlx::query_as::<_, Engagement>(&query)
            .bind(engagement.id)
            .bind(expected)
            .bind(&engagement.customer_name)
            .bind(&engagement.project_name)
            .bind(&engagement.description)
            .bind(&engagement.location)
            .bind(&engagement.start_date)
            .bind(&engagement.end_date)
            .bind(&engagement.archive_date)
            .bind(&engagement.engagement_lead_name)
            .bind(&engagement.engagement_lead_email)
            .bind(&engagement.technical_lead_name)
            .bind(&engagement.technical_lead_email)
            .bind(&engagement.customer_contact_name)
            .bind(&engagement.customer_contact_email)
            .bind(&engagement.last_update)
            .bind(&engagement.last_update_by_name)
            .bind(&engagement.last_update_by_email)
            .bind(&engagement.commit_message)
            .bind(&engagement.engagement_users)
            .bind(&engagement.hosting_environments)
            .bind(&engagement.categories)
            .bind(&engagement.artifacts);

        if !skip_launch {
            q = q.bind(&engagement.launch);
        }

        q.fetch_optional(pool).await
    }

    /// Set the mirrored git project id. Returns the updated row.
    pub async fn set_project_id(
        pool: &PgPool,
        uuid: &str,
        project_id: DbId,
    ) -> Result<Option<Engagement>, sqlx::Error> {
        let query = format!(
            "UPDATE engagements SET project_id = $2, updated_at = NOW()
             WHERE uuid = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(uuid)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// Replace the mirrored status document. Returns the updated row.
    pub async fn set_status(
        pool: &PgPool,
        uuid: &str,
        status: &serde_json::Value,
    ) -> Result<Option<Engagement>, sqlx::Error> {
        let query = format!(
            "UPDATE engagements SET status = $2, updated_at = NOW()
             WHERE uuid = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(uuid)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Replace the mirrored commit list. Returns the updated row.
    pub async fn set_commits(
        pool: &PgPool,
        uuid: &str,
        commits: &serde_json::Value,
    ) -> Result<Option<Engagement>, sqlx::Error> {
        let query = format!(
            "UPDATE engagements SET commits = $2, updated_at = NOW()
             WHERE uuid = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(uuid)
            .bind(commits)
            .fetch_optional(pool)
            .await
    }

    /// Repair a row that was imported without uuids.
    ///
    /// Writes the assigned uuid, optionally a repaired user list, and
    /// stamps the update attribution. Passing `None` for `users` leaves
    /// the stored list untouched.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_uuid_backfill(
        pool: &PgPool,
        id: DbId,
        uuid: &str,
        users: Option<&serde_json::Value>,
        last_update: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<Option<Engagement>, sqlx::Error> {
        let query = format!(
            "UPDATE engagements
             SET uuid = $2,
                 engagement_users = COALESCE($3, engagement_users),
                 last_update = $4,
                 last_update_by_name = $5,
                 last_update_by_email = $6,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(id)
            .bind(uuid)
            .bind(users)
            .bind(last_update)
            .bind(author_name)
            .bind(author_email)
            .fetch_optional(pool)
            .await
    }

    /// Delete an engagement by uuid. Returns `true` if a row was removed.
    pub async fn delete_by_uuid(pool: &PgPool, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM engagements WHERE uuid = $1")
            .bind(uuid)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
