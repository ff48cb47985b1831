//! Camera control wire format
//!
//! Control messages are JSON, carried in either text or binary WebSocket
//! messages:
//!
//! ```json
//! {"type": "update", "payload": {"translation": [0.0, 0.0, -3.0], "exposure": 1.5}}
//! {"type": "reset"}
//! ```
//!
//! Every `update` field is optional; only the fields present are merged into
//! the camera. Unknown fields and message types are rejected.

use serde::{Deserialize, Serialize};

use super::state::Mat3;
use crate::error::{AppError, Result};

/// Largest accepted control message
pub const MAX_CONTROL_MESSAGE_LEN: usize = 64 * 1024;

/// Partial camera update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// World-to-camera rotation, row-major
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Mat3>,
    /// World-to-camera translation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<[f32; 3]>,
    /// Pinhole intrinsics, row-major
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrinsics: Option<Mat3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub near: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub far: Option<f32>,
    /// Playback time for volumetric video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f32>,
}

impl CameraUpdate {
    /// Whether the update carries no fields
    pub fn is_empty(&self) -> bool {
        *self == CameraUpdate::default()
    }
}

/// Inbound control message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Merge the given fields into the camera
    Update(CameraUpdate),
    /// Restore startup defaults
    Reset,
}

impl ControlMessage {
    /// Decode a message from raw bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() > MAX_CONTROL_MESSAGE_LEN {
            return Err(AppError::InvalidControl(format!(
                "message too large: {} bytes",
                data.len()
            )));
        }
        serde_json::from_slice(data).map_err(|e| AppError::InvalidControl(e.to_string()))
    }

    /// Encode to the JSON wire form
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
