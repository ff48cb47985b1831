//! JPEG encoder implementation
//!
//! Compresses RGBA8 host frames with turbojpeg. The alpha channel is
//! dropped by the codec; rows are encoded in buffer order, which is already
//! the display order after the render loop's flip.

use super::traits::{EncodedFormat, EncodedFrame, EncoderConfig, FrameEncoder};
use crate::error::{AppError, Result};
use crate::video::format::Resolution;
use crate::video::frame::HostFrame;

/// JPEG encoder using turbojpeg
///
/// Note: This encoder is NOT thread-safe due to turbojpeg limitations.
/// Each stream connection owns its own instance.
pub struct JpegEncoder {
    config: EncoderConfig,
    compressor: turbojpeg::Compressor,
}

impl JpegEncoder {
    /// Create a new JPEG encoder
    ///
    /// Quality is clamped to 1-100, the range libjpeg accepts.
    pub fn new(mut config: EncoderConfig) -> Result<Self> {
        let mut compressor = turbojpeg::Compressor::new().map_err(|e| {
            AppError::EncodeError(format!("Failed to create turbojpeg compressor: {}", e))
        })?;

        config.quality = config.quality.clamp(1, 100);
        compressor
            .set_quality(config.quality as i32)
            .map_err(|e| AppError::EncodeError(format!("Failed to set JPEG quality: {}", e)))?;
        compressor
            .set_subsamp(turbojpeg::Subsamp::Sub2x2)
            .map_err(|e| AppError::EncodeError(format!("Failed to set JPEG subsampling: {}", e)))?;

        Ok(Self { config, compressor })
    }

    /// Create with specific quality
    pub fn with_quality(resolution: Resolution, quality: u32) -> Result<Self> {
        Self::new(EncoderConfig::new(resolution, quality))
    }
}

impl FrameEncoder for JpegEncoder {
    fn name(&self) -> &str {
        "JPEG (turbojpeg)"
    }

    fn output_format(&self) -> EncodedFormat {
        EncodedFormat::Jpeg
    }

    fn encode(&mut self, frame: &HostFrame) -> Result<EncodedFrame> {
        let resolution = frame.resolution;
        if resolution != self.config.resolution {
            return Err(AppError::EncodeError(format!(
                "frame is {} but encoder is configured for {}",
                resolution, self.config.resolution
            )));
        }

        let image = turbojpeg::Image {
            pixels: frame.data(),
            width: resolution.width as usize,
            pitch: resolution.rgba_pitch(),
            height: resolution.height as usize,
            format: turbojpeg::PixelFormat::RGBA,
        };

        let jpeg = self
            .compressor
            .compress_to_vec(image)
            .map_err(|e| AppError::EncodeError(format!("JPEG compression failed: {}", e)))?;

        Ok(EncodedFrame::new(
            jpeg.into(),
            EncodedFormat::Jpeg,
            resolution,
            frame.generation,
        ))
    }

    fn config(&self) -> &EncoderConfig {
        &self.config
    }
}
