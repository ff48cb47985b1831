//! Uncompressed RGBA pass-through

use super::traits::{EncodedFormat, EncodedFrame, EncoderConfig, FrameEncoder};
use crate::error::{AppError, Result};
use crate::video::frame::HostFrame;

/// Sends host frames as raw RGBA8 bytes
///
/// Useful on fast local links where compression costs more than bandwidth.
pub struct RgbaEncoder {
    config: EncoderConfig,
}

impl RgbaEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }
}

impl FrameEncoder for RgbaEncoder {
    fn name(&self) -> &str {
        "RGBA (raw)"
    }

    fn output_format(&self) -> EncodedFormat {
        EncodedFormat::Rgba
    }

    fn encode(&mut self, frame: &HostFrame) -> Result<EncodedFrame> {
        if frame.resolution != self.config.resolution {
            return Err(AppError::EncodeError(format!(
                "frame is {} but encoder is configured for {}",
                frame.resolution, self.config.resolution
            )));
        }
        Ok(EncodedFrame::new(
            frame.data_bytes(),
            EncodedFormat::Rgba,
            frame.resolution,
            frame.generation,
        ))
    }

    fn config(&self) -> &EncoderConfig {
        &self.config
    }
}
