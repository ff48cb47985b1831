//! Device-resident image buffers
//!
//! These types stand for memory owned by the rendering device. Host code
//! only touches their contents through the correction kernel and the
//! transfer stream.

use crate::error::{AppError, Result};
use crate::video::format::{Resolution, RGBA_CHANNELS};

/// Normalized float RGBA image produced by a renderer
///
/// Row-major, `height * width * 4` channels, nominal range `[0, 1]`.
#[derive(Debug, Clone)]
pub struct DeviceImage {
    resolution: Resolution,
    pixels: Vec<f32>,
}

impl DeviceImage {
    pub fn new(resolution: Resolution, pixels: Vec<f32>) -> Result<Self> {
        let expected = resolution.pixels() * RGBA_CHANNELS;
        if pixels.len() != expected {
            return Err(AppError::RenderError(format!(
                "renderer produced {} channels for {}, expected {}",
                pixels.len(),
                resolution,
                expected
            )));
        }
        Ok(Self { resolution, pixels })
    }

    /// Image filled with one RGBA value
    pub fn filled(resolution: Resolution, rgba: [f32; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(resolution.pixels() * RGBA_CHANNELS)
            .collect();
        Self { resolution, pixels }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }
}

/// Quantized RGBA8 buffer awaiting transfer to the host
#[derive(Debug)]
pub struct DeviceBuffer {
    data: Vec<u8>,
    resolution: Resolution,
}

impl DeviceBuffer {
    pub fn new(data: Vec<u8>, resolution: Resolution) -> Self {
        Self { data, resolution }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_size_checked() {
        let res = Resolution::new(2, 2);
        assert!(DeviceImage::new(res, vec![0.0; 16]).is_ok());
        let err = DeviceImage::new(res, vec![0.0; 12]).unwrap_err();
        assert!(matches!(err, AppError::RenderError(_)));
    }

    #[test]
    fn test_filled() {
        let image = DeviceImage::filled(Resolution::new(3, 1), [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(image.pixels().len(), 12);
        assert_eq!(&image.pixels()[8..12], &[0.1, 0.2, 0.3, 1.0]);
    }
}
