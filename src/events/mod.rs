//! Event system for observability notifications
//!
//! This module provides an event bus for broadcasting throughput reports and
//! connection lifecycle events to in-process subscribers.

pub mod types;

pub use types::{ServiceKind, SystemEvent};

use tokio::sync::broadcast;

/// Event channel capacity (ring buffer size)
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Event bus for broadcasting system events
///
/// Publishing never blocks. A subscriber that falls behind receives a
/// `Lagged` error and misses events; publishers are unaffected.
pub struct EventBus {
    tx: broadcast::Sender<SystemEvent>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an event to all subscribers
    ///
    /// If there are no active subscribers, the event is dropped.
    pub fn publish(&self, event: SystemEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.tx.subscribe()
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(SystemEvent::RenderFps {
            fps: 24.0,
            generation: 48,
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SystemEvent::RenderFps { generation: 48, .. }));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(SystemEvent::ControlRejected {
            client_id: "c1".to_string(),
            reason: "bad json".to_string(),
        });

        assert!(matches!(
            rx1.recv().await.unwrap(),
            SystemEvent::ControlRejected { .. }
        ));
        assert!(matches!(
            rx2.recv().await.unwrap(),
            SystemEvent::ControlRejected { .. }
        ));
    }

    #[test]
    fn test_no_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(SystemEvent::StreamFps {
            client_id: "c1".to_string(),
            fps: 1.0,
        });
    }
}
