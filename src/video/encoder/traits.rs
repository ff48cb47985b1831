//! Encoder traits and common types

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::Result;
use crate::video::format::Resolution;
use crate::video::frame::HostFrame;

/// Encoder configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    /// Target resolution
    pub resolution: Resolution,
    /// Output quality (0-100, JPEG only)
    pub quality: u32,
}

impl EncoderConfig {
    pub fn new(resolution: Resolution, quality: u32) -> Self {
        Self {
            resolution,
            quality,
        }
    }
}

/// Encoded frame output
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Encoded data
    pub data: Bytes,
    /// Output format
    pub format: EncodedFormat,
    /// Resolution
    pub resolution: Resolution,
    /// Generation of the source frame
    pub generation: u64,
    /// Encoding timestamp
    pub timestamp: Instant,
}

impl EncodedFrame {
    pub fn new(data: Bytes, format: EncodedFormat, resolution: Resolution, generation: u64) -> Self {
        Self {
            data,
            format,
            resolution,
            generation,
            timestamp: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Encoded output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodedFormat {
    /// Baseline JPEG via libjpeg-turbo
    #[default]
    Jpeg,
    /// Uncompressed RGBA8 bytes
    Rgba,
}

impl std::fmt::Display for EncodedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodedFormat::Jpeg => write!(f, "JPEG"),
            EncodedFormat::Rgba => write!(f, "RGBA"),
        }
    }
}

impl std::str::FromStr for EncodedFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(EncodedFormat::Jpeg),
            "rgba" | "raw" => Ok(EncodedFormat::Rgba),
            other => Err(format!("unknown encoding: {}", other)),
        }
    }
}

/// Frame encoder
/// Note: Not Sync because turbojpeg handles are not thread-safe
pub trait FrameEncoder: Send {
    /// Get encoder name
    fn name(&self) -> &str;

    /// Get output format
    fn output_format(&self) -> EncodedFormat;

    /// Encode one host frame
    fn encode(&mut self, frame: &HostFrame) -> Result<EncodedFrame>;

    /// Get current configuration
    fn config(&self) -> &EncoderConfig;
}
