//! Frame encoder implementations
//!
//! - JPEG encoding for RGBA frames (turbojpeg)
//! - Raw RGBA pass-through

pub mod jpeg;
pub mod rgba;
pub mod traits;

pub use jpeg::JpegEncoder;
pub use rgba::RgbaEncoder;
pub use traits::{EncodedFormat, EncodedFrame, EncoderConfig, FrameEncoder};

use crate::error::Result;

/// Create an encoder for the given output format
pub fn create_encoder(format: EncodedFormat, config: EncoderConfig) -> Result<Box<dyn FrameEncoder>> {
    match format {
        EncodedFormat::Jpeg => Ok(Box::new(JpegEncoder::new(config)?)),
        EncodedFormat::Rgba => Ok(Box::new(RgbaEncoder::new(config))),
    }
}
