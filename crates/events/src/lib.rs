//! Synchronization events for the engagement store.
//!
//! Local mutations publish a [`SyncMessage`] on the in-process
//! [`EventBus`]; the [`GitSyncRelay`] forwards every event to the
//! external git synchronization worker over HTTP.

pub mod bus;
pub mod relay;

pub use bus::{EventBus, SyncEvent, SyncMessage};
pub use relay::GitSyncRelay;
