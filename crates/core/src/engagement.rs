//! Engagement value types and domain rules.
//!
//! The nested collections an engagement carries (users, hosting
//! environments, categories, artifacts, commits) are stored as JSON
//! documents, so everything here serializes with camelCase attribute
//! names. Validation and reconciliation helpers used by the DB and API
//! layers live alongside the types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length for a customer or project name.
pub const MAX_NAME_LENGTH: usize = 255;

/// Author name recorded when the backend itself modifies an engagement.
pub const BACKEND_BOT: &str = "caravel-backend-bot";

/// Author email recorded when the backend itself modifies an engagement.
pub const BACKEND_BOT_EMAIL: &str = "caravel-backend-bot@bot.com";

/// Fallback author name when a request carries no author header.
pub const DEFAULT_AUTHOR_NAME: &str = "caravel-user";

/// Fallback author email when a request carries no author header.
pub const DEFAULT_AUTHOR_EMAIL: &str = "caravel-email";

// ---------------------------------------------------------------------------
// Nested value types
// ---------------------------------------------------------------------------

/// A user granted access to an engagement.
///
/// The `reset` flag is a request-scoped signal asking downstream systems
/// to reset the user's credentials; it is cleared before persisting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub uuid: Option<String>,
    #[serde(default)]
    pub reset: bool,
}

/// An OpenShift hosting environment attached to an engagement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostingEnvironment {
    pub environment_name: Option<String>,
    pub ocp_cloud_provider_name: Option<String>,
    pub ocp_cloud_provider_region: Option<String>,
    pub ocp_cluster_size: Option<String>,
    pub ocp_persistent_storage_size: Option<String>,
    pub ocp_sub_domain: Option<String>,
    pub ocp_version: Option<String>,
}

/// A free-form label applied to an engagement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
}

/// A link to an external deliverable (demo, report, repository, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub artifact_type: Option<String>,
    pub link_address: Option<String>,
    pub description: Option<String>,
}

/// A source-control commit mirrored from the engagement's project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub id: Option<String>,
    pub message: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub timestamp: Option<String>,
    pub url: Option<String>,
    pub web_url: Option<String>,
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

// ---------------------------------------------------------------------------
// Launch and creation metadata
// ---------------------------------------------------------------------------

/// Launch marker. Presence of this value means the engagement has been
/// launched and must no longer be deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Launch {
    pub launched_date_time: Option<Timestamp>,
    pub launched_by: Option<String>,
    pub launched_by_email: Option<String>,
}

impl Launch {
    /// Build a launch marker stamped with the current time and the
    /// launching author.
    pub fn new(author_name: &str, author_email: &str) -> Self {
        Launch {
            launched_date_time: Some(chrono::Utc::now()),
            launched_by: Some(author_name.to_string()),
            launched_by_email: Some(author_email.to_string()),
        }
    }
}

/// Who created the engagement, and when. Written once on create and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationDetails {
    pub created_by_user: Option<String>,
    pub created_by_email: Option<String>,
    pub created_on: Option<Timestamp>,
}

impl CreationDetails {
    pub fn new(author_name: &str, author_email: &str) -> Self {
        CreationDetails {
            created_by_user: Some(author_name.to_string()),
            created_by_email: Some(author_email.to_string()),
            created_on: Some(chrono::Utc::now()),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate customer and project name lengths. The limit counts
/// characters, not bytes.
pub fn validate_names(customer_name: &str, project_name: &str) -> Result<(), CoreError> {
    if customer_name.chars().count() > MAX_NAME_LENGTH
        || project_name.chars().count() > MAX_NAME_LENGTH
    {
        return Err(CoreError::Validation(format!(
            "names cannot be greater than {MAX_NAME_LENGTH} characters."
        )));
    }

    Ok(())
}

/// Collect subdomains that appear more than once within a single
/// engagement's hosting environments.
///
/// Comparison is case-insensitive; the returned names are lowercased and
/// sorted. An empty result means the environments are consistent.
pub fn duplicate_subdomains(environments: &[HostingEnvironment]) -> Vec<String> {
    let mut counts = std::collections::BTreeMap::<String, usize>::new();
    for environment in environments {
        if let Some(subdomain) = &environment.ocp_sub_domain {
            *counts.entry(subdomain.to_lowercase()).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name)
        .collect()
}

// ---------------------------------------------------------------------------
// Reconciliation helpers
// ---------------------------------------------------------------------------

/// Reconcile incoming user uuids against the stored record.
///
/// Caller-supplied uuids are never trusted: a user whose email matches a
/// stored user inherits the stored uuid, everyone else gets a fresh one.
pub fn reconcile_user_uuids(users: &mut [EngagementUser], existing: &[EngagementUser]) {
    for user in users.iter_mut() {
        let stored_uuid = user
            .email
            .as_deref()
            .and_then(|email| {
                existing
                    .iter()
                    .find(|candidate| candidate.email.as_deref() == Some(email))
            })
            .and_then(|matched| matched.uuid.clone());

        user.uuid = match stored_uuid {
            Some(uuid) => Some(uuid),
            None => Some(Uuid::new_v4().to_string()),
        };
    }
}

/// Clear the request-scoped `reset` flag on every user.
pub fn clear_reset_flags(users: &mut [EngagementUser]) {
    for user in users.iter_mut() {
        user.reset = false;
    }
}

/// Merge a stored commit message with an incoming one.
///
/// Both present: the stored message comes first, separated by a blank
/// line. Blank strings count as absent.
pub fn merge_commit_message(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    let existing = existing.filter(|message| !message.trim().is_empty());
    let incoming = incoming.filter(|message| !message.trim().is_empty());

    match (existing, incoming) {
        (Some(stored), Some(new)) => Some(format!("{stored}\n\n{new}")),
        (Some(stored), None) => Some(stored.to_string()),
        (None, new) => new.map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
