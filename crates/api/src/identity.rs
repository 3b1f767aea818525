//! Caller-attribution extractor for Axum handlers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use caravel_core::engagement::{DEFAULT_AUTHOR_EMAIL, DEFAULT_AUTHOR_NAME};

use crate::state::AppState;

/// Request header naming the acting user.
pub const AUTHOR_NAME_HEADER: &str = "x-author-name";

/// Request header carrying the acting user's email.
pub const AUTHOR_EMAIL_HEADER: &str = "x-author-email";

/// The acting user, taken from the `x-author-name` / `x-author-email`
/// request headers.
///
/// Mutations stamp this identity into the record's update attribution
/// (and, on create, into the creation details). Missing or blank headers
/// fall back to the anonymous defaults, so extraction never fails:
///
/// ```ignore
/// async fn my_handler(author: Author) -> AppResult<Json<()>> {
///     tracing::info!(author = %author.name, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl FromRequestParts<AppState> for Author {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Author {
            name: header_value(parts, AUTHOR_NAME_HEADER, DEFAULT_AUTHOR_NAME),
            email: header_value(parts, AUTHOR_EMAIL_HEADER, DEFAULT_AUTHOR_EMAIL),
        })
    }
}

/// Read a trimmed header value, falling back when absent or blank.
fn header_value(parts: &Parts, name: &str, default: &str) -> String {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}
