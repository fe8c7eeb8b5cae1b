//! Event types and broadcast bus
//!
//! Services publish domain events on an in-process `EventBus`; background
//! workers subscribe to the events they react to (for example, a course
//! certificate being awarded triggers a program credential reconciliation).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Events exchanged between LMS components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LmsEvent {
    /// A passing course certificate was awarded to a user
    ///
    /// Triggers:
    /// - Program credential reconciliation for `username`
    CourseCertificateAwarded {
        username: String,
        course_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The credentials service accepted a program credential for a user
    ProgramCredentialAwarded {
        username: String,
        /// Program identifier as rendered by the programs service
        program_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A reconciliation gave up after exhausting its retries
    ReconciliationFailed {
        username: String,
        error: String,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },
}

impl LmsEvent {
    /// Short event name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            LmsEvent::CourseCertificateAwarded { .. } => "CourseCertificateAwarded",
            LmsEvent::ProgramCredentialAwarded { .. } => "ProgramCredentialAwarded",
            LmsEvent::ReconciliationFailed { .. } => "ReconciliationFailed",
        }
    }
}

/// Broadcast channel for `LmsEvent`s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LmsEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<LmsEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; `Err` when nobody is subscribed
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: LmsEvent) -> Result<usize, broadcast::error::SendError<LmsEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: LmsEvent) {
        let event_type = event.event_type();
        if self.tx.send(event).is_err() {
            debug!(event_type, "No subscribers for event");
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let event = LmsEvent::CourseCertificateAwarded {
            username: "alice".to_string(),
            course_id: "course-v1:edX+DemoX+Demo".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(bus.emit(event.clone()).unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        let event = LmsEvent::ReconciliationFailed {
            username: "bob".to_string(),
            error: "boom".to_string(),
            attempts: 3,
            timestamp: Utc::now(),
        };
        assert!(bus.emit(event.clone()).is_err());
        bus.emit_lossy(event);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 4);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = LmsEvent::ProgramCredentialAwarded {
            username: "carol".to_string(),
            program_id: "7".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ProgramCredentialAwarded");
        assert_eq!(json["program_id"], "7");
    }
}
