//! Request handlers for the engagement API.
//!
//! Each submodule groups related endpoints: `engagement` for the
//! document surface, `suggestion` for the aggregations, `sync` for the
//! hook/refresh/write-back surface. Handlers delegate to the
//! repositories in `caravel_db`, map errors via [`AppError`], and
//! publish a sync event for every committed mutation.

pub mod engagement;
pub mod suggestion;
pub mod sync;

use axum::response::AppendHeaders;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use caravel_core::error::CoreError;

use crate::error::{AppError, AppResult};

/// Response header carrying the record's current last-update token.
pub const LAST_UPDATE_HEADER: &str = "last-update";

/// Mint a fresh last-update token.
///
/// Tokens are zulu timestamps with microsecond precision. They are
/// compared as opaque strings, so the format only has to change on
/// every mutation.
pub(crate) fn next_last_update_token() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Advertise the current token on a single-record response.
pub(crate) fn last_update_headers(
    token: Option<&str>,
) -> AppendHeaders<Vec<(&'static str, String)>> {
    AppendHeaders(
        token
            .map(|value| vec![(LAST_UPDATE_HEADER, value.to_string())])
            .unwrap_or_default(),
    )
}

/// Serialize a document for a response body or an event payload.
pub(crate) fn document_json<T: serde::Serialize>(document: &T) -> AppResult<Value> {
    serde_json::to_value(document).map_err(|err| AppError::InternalError(err.to_string()))
}

/// The standard by-uuid miss.
pub(crate) fn engagement_not_found(uuid: &str) -> AppError {
    AppError::Core(CoreError::NotFound(format!(
        "no engagement found with id {uuid}"
    )))
}
