//! Engagement entity model and DTOs.

use caravel_core::engagement::{Artifact, Category, Commit, EngagementUser, HostingEnvironment, Launch};
use caravel_core::error::CoreError;
use caravel_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An engagement row from the `engagements` table.
///
/// Nested collections are stored as JSONB and surface here as raw
/// values; the row id and bookkeeping timestamps are internal and never
/// serialized to callers.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    #[serde(skip)]
    pub id: DbId,
    pub uuid: Option<String>,
    pub customer_name: String,
    pub project_name: String,
    pub project_id: Option<DbId>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub archive_date: Option<String>,
    pub engagement_lead_name: Option<String>,
    pub engagement_lead_email: Option<String>,
    pub technical_lead_name: Option<String>,
    pub technical_lead_email: Option<String>,
    pub customer_contact_name: Option<String>,
    pub customer_contact_email: Option<String>,
    pub last_update: Option<String>,
    pub last_update_by_name: Option<String>,
    pub last_update_by_email: Option<String>,
    pub commit_message: Option<String>,
    pub launch: Option<serde_json::Value>,
    pub status: Option<serde_json::Value>,
    pub commits: Option<serde_json::Value>,
    pub creation_details: Option<serde_json::Value>,
    pub engagement_users: Option<serde_json::Value>,
    pub hosting_environments: Option<serde_json::Value>,
    pub categories: Option<serde_json::Value>,
    pub artifacts: Option<serde_json::Value>,
    #[serde(skip)]
    pub created_at: Timestamp,
    #[serde(skip)]
    pub updated_at: Timestamp,
}

impl Engagement {
    /// Whether this engagement has been launched.
    pub fn is_launched(&self) -> bool {
        self.launch.is_some()
    }

    /// Parse the stored user list. Rows written through the API always
    /// parse; anything else yields an empty list.
    pub fn users(&self) -> Vec<EngagementUser> {
        self.engagement_users
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }
}

/// DTO for creating or replacing an engagement document.
///
/// Nested collections are typed so malformed entries are rejected at
/// deserialization. Control fields the server owns (uuid, project id,
/// creation details, status, commits) are accepted here but overwritten
/// or ignored by the create and update flows.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementPayload {
    pub uuid: Option<String>,
    pub customer_name: Option<String>,
    pub project_name: Option<String>,
    pub project_id: Option<DbId>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub archive_date: Option<String>,
    pub engagement_lead_name: Option<String>,
    pub engagement_lead_email: Option<String>,
    pub technical_lead_name: Option<String>,
    pub technical_lead_email: Option<String>,
    pub customer_contact_name: Option<String>,
    pub customer_contact_email: Option<String>,
    pub last_update: Option<String>,
    pub last_update_by_name: Option<String>,
    pub last_update_by_email: Option<String>,
    pub commit_message: Option<String>,
    pub launch: Option<Launch>,
    pub status: Option<serde_json::Value>,
    pub commits: Option<Vec<Commit>>,
    pub engagement_users: Option<Vec<EngagementUser>>,
    pub hosting_environments: Option<Vec<HostingEnvironment>>,
    pub categories: Option<Vec<Category>>,
    pub artifacts: Option<Vec<Artifact>>,
}

impl EngagementPayload {
    /// Assemble a persistable document from this payload under the given
    /// resolved names.
    ///
    /// The row id and timestamps are placeholders; the database assigns
    /// the real values on insert and they are never written on update.
    pub fn into_document(
        self,
        customer_name: String,
        project_name: String,
    ) -> Result<Engagement, CoreError> {
        let now = chrono::Utc::now();
        Ok(Engagement {
            id: 0,
            uuid: self.uuid,
            customer_name,
            project_name,
            project_id: self.project_id,
            description: self.description,
            location: self.location,
            start_date: self.start_date,
            end_date: self.end_date,
            archive_date: self.archive_date,
            engagement_lead_name: self.engagement_lead_name,
            engagement_lead_email: self.engagement_lead_email,
            technical_lead_name: self.technical_lead_name,
            technical_lead_email: self.technical_lead_email,
            customer_contact_name: self.customer_contact_name,
            customer_contact_email: self.customer_contact_email,
            last_update: self.last_update,
            last_update_by_name: self.last_update_by_name,
            last_update_by_email: self.last_update_by_email,
            commit_message: self.commit_message,
            launch: to_json(&self.launch)?,
            status: self.status,
            commits: to_json(&self.commits)?,
            creation_details: None,
            engagement_users: to_json(&self.engagement_users)?,
            hosting_environments: to_json(&self.hosting_environments)?,
            categories: to_json(&self.categories)?,
            artifacts: to_json(&self.artifacts)?,
            created_at: now,
            updated_at: now,
        })
    }
}

/// One aggregated category name with its usage count.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub count: i64,
}

fn to_json<T: Serialize>(value: &Option<T>) -> Result<Option<serde_json::Value>, CoreError> {
    value
        .as_ref()
        .map(|inner| serde_json::to_value(inner).map_err(|e| CoreError::Internal(e.to_string())))
        .transpose()
}
