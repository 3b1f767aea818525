//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`SyncEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// SyncMessage
// ---------------------------------------------------------------------------

/// A message to the git synchronization worker, one variant per event
/// address.
///
/// Record mutations carry a detached copy of the full document; resync
/// triggers carry the relevant identifier; the remaining control
/// messages have no payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "address", content = "payload", rename_all = "kebab-case")]
pub enum SyncMessage {
    /// A new engagement was persisted.
    Create(serde_json::Value),
    /// An engagement document was replaced.
    Update(serde_json::Value),
    /// An engagement was removed.
    Delete(serde_json::Value),
    /// The tracked status file changed in the backing repository.
    StatusUpdate(serde_json::Value),
    /// New commits landed in the backing repository.
    CommitsUpdate(serde_json::Value),
    /// Re-sync a single engagement, identified by its git project id.
    FullResyncById(String),
    /// Re-sync every engagement under a git project id.
    FullResyncByProject(String),
    /// Drop all local records, then reload from the system of record.
    PurgeAndReload,
    /// Reload from the system of record without purging.
    Load,
}

impl SyncMessage {
    /// The event address this message is published under.
    pub fn address(&self) -> &'static str {
        match self {
            SyncMessage::Create(_) => "create",
            SyncMessage::Update(_) => "update",
            SyncMessage::Delete(_) => "delete",
            SyncMessage::StatusUpdate(_) => "status-update",
            SyncMessage::CommitsUpdate(_) => "commits-update",
            SyncMessage::FullResyncById(_) => "full-resync-by-id",
            SyncMessage::FullResyncByProject(_) => "full-resync-by-project",
            SyncMessage::PurgeAndReload => "purge-and-reload",
            SyncMessage::Load => "load",
        }
    }
}

/// A published message together with its publication time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    #[serde(flatten)]
    pub message: SyncMessage,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`SyncEvent`].
///
/// # Usage
///
/// ```rust
/// use caravel_events::bus::{EventBus, SyncMessage};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(SyncMessage::Load);
/// ```
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a message to all current subscribers, stamped with the
    /// current time.
    ///
    /// Publication is fire-and-forget: if there are no active
    /// subscribers the event is silently dropped, and delivery failures
    /// downstream are never surfaced to the caller.
    pub fn publish(&self, message: SyncMessage) {
        let event = SyncEvent {
            message,
            timestamp: Utc::now(),
        };
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(SyncMessage::Create(json!({"uuid": "u-1"})));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.message.address(), "create");
        match received.message {
            SyncMessage::Create(payload) => assert_eq!(payload["uuid"], "u-1"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(SyncMessage::PurgeAndReload);

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.message.address(), "purge-and-reload");
        assert_eq!(e2.message.address(), "purge-and-reload");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        // No subscribers, must not panic.
        bus.publish(SyncMessage::Load);
    }

    #[test]
    fn events_serialize_with_address_and_payload() {
        let event = SyncEvent {
            message: SyncMessage::FullResyncByProject("42".to_string()),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["address"], "full-resync-by-project");
        assert_eq!(value["payload"], "42");
        assert!(value.get("timestamp").is_some());
    }

    #[test]
    fn control_messages_serialize_without_payload() {
        let event = SyncEvent {
            message: SyncMessage::Load,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["address"], "load");
        assert!(value.get("payload").is_none());
    }
}
