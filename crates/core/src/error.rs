//! Core domain error type shared across the workspace.

use thiserror::Error;

/// Domain-level errors raised by engagement operations.
///
/// The API layer maps each variant onto an HTTP status; the messages are
/// caller-facing and pass through to the response body unchanged.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested engagement (or related resource) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input failed a domain validation rule.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The request conflicts with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The operation is not allowed in the engagement's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// An unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}
