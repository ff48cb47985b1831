//! System event types
//!
//! Defines all event types that can be broadcast through the event bus.

use serde::{Deserialize, Serialize};

/// Which listener a connection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Outbound frame streaming
    Stream,
    /// Inbound camera control
    Control,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceKind::Stream => write!(f, "stream"),
            ServiceKind::Control => write!(f, "control"),
        }
    }
}

/// System event enumeration
///
/// Serialized as `{"event": "<name>", "data": {...}}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum SystemEvent {
    // ============================================================================
    // Render Events
    // ============================================================================
    /// Render throughput over the last reporting window
    #[serde(rename = "render.fps")]
    RenderFps {
        fps: f64,
        /// Latest published generation
        generation: u64,
    },

    /// Render loop terminated
    #[serde(rename = "render.stopped")]
    RenderStopped {
        /// Frames published before stopping
        frames: u64,
        /// Failure description, None on clean shutdown
        error: Option<String>,
    },

    // ============================================================================
    // Stream Events
    // ============================================================================
    /// Send throughput of one streaming connection
    #[serde(rename = "stream.fps")]
    StreamFps { client_id: String, fps: f64 },

    // ============================================================================
    // Client Events
    // ============================================================================
    /// A client connected to one of the services
    #[serde(rename = "client.connected")]
    ClientConnected {
        service: ServiceKind,
        client_id: String,
        /// Clients connected to this service after the change
        total: usize,
    },

    /// A client disconnected
    #[serde(rename = "client.disconnected")]
    ClientDisconnected {
        service: ServiceKind,
        client_id: String,
        /// Frames sent or messages received
        messages: u64,
        connected_secs: f64,
    },

    // ============================================================================
    // Control Events
    // ============================================================================
    /// Camera state changed through the control service
    #[serde(rename = "control.camera_updated")]
    CameraUpdated { client_id: String, version: u64 },

    /// Control message rejected
    #[serde(rename = "control.rejected")]
    ControlRejected { client_id: String, reason: String },
}

impl SystemEvent {
    /// Get the event name (for topic filtering)
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::RenderFps { .. } => "render.fps",
            Self::RenderStopped { .. } => "render.stopped",
            Self::StreamFps { .. } => "stream.fps",
            Self::ClientConnected { .. } => "client.connected",
            Self::ClientDisconnected { .. } => "client.disconnected",
            Self::CameraUpdated { .. } => "control.camera_updated",
            Self::ControlRejected { .. } => "control.rejected",
        }
    }

    /// Check if event matches a topic pattern
    ///
    /// Supports `*` (everything), `prefix.*` and exact names.
    pub fn matches_topic(&self, topic: &str) -> bool {
        if topic == "*" {
            return true;
        }

        let event_name = self.event_name();

        if let Some(prefix) = topic.strip_suffix(".*") {
            event_name
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('.'))
        } else {
            event_name == topic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name() {
        let event = SystemEvent::RenderFps {
            fps: 30.0,
            generation: 60,
        };
        assert_eq!(event.event_name(), "render.fps");
    }

    #[test]
    fn test_matches_topic() {
        let event = SystemEvent::StreamFps {
            client_id: "a".to_string(),
            fps: 12.5,
        };

        assert!(event.matches_topic("*"));
        assert!(event.matches_topic("stream.*"));
        assert!(event.matches_topic("stream.fps"));
        assert!(!event.matches_topic("render.*"));
        assert!(!event.matches_topic("str.*"));
        assert!(!event.matches_topic("stream.client"));
    }

    #[test]
    fn test_serialization_shape() {
        let event = SystemEvent::ClientConnected {
            service: ServiceKind::Control,
            client_id: "abc".to_string(),
            total: 1,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "client.connected");
        assert_eq!(json["data"]["service"], "control");
        assert_eq!(json["data"]["total"], 1);
    }
}
