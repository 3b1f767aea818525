use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: caravel_db::DbPool,
    /// Server configuration (status file name, hook message filters, ...).
    pub config: Arc<ServerConfig>,
    /// Event bus carrying sync events to the git worker relay.
    pub event_bus: Arc<caravel_events::EventBus>,
}
