//! Renderer boundary
//!
//! The renderer is an external collaborator: it turns a camera snapshot into
//! a device-resident RGBA image. `PatternRenderer` is a synthetic
//! implementation used when no model is attached and in tests.

use super::device::DeviceImage;
use crate::camera::CameraParameters;
use crate::error::Result;
use crate::video::format::RGBA_CHANNELS;

/// Produces device images from camera snapshots
///
/// Runs on the render thread only, so implementations need `Send` but not
/// `Sync`. An error is fatal to the render loop.
pub trait Renderer: Send {
    /// Renderer name for logs
    fn name(&self) -> &str;

    /// Render one frame at `camera.resolution`
    fn render(&mut self, camera: &CameraParameters, frame_index: u64) -> Result<DeviceImage>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn render(&mut self, camera: &CameraParameters, frame_index: u64) -> Result<DeviceImage> {
        (**self).render(camera, frame_index)
    }
}

/// Deterministic synthetic renderer
///
/// Draws a color gradient whose hue follows the camera translation and whose
/// blue channel pulses with the frame index and playback time, so camera
/// updates are visible in the stream.
#[derive(Debug, Default)]
pub struct PatternRenderer;

impl PatternRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for PatternRenderer {
    fn name(&self) -> &str {
        "pattern"
    }

    fn render(&mut self, camera: &CameraParameters, frame_index: u64) -> Result<DeviceImage> {
        let resolution = camera.resolution;
        let width = resolution.width as usize;
        let height = resolution.height as usize;
        let [tx, ty, tz] = camera.translation;
        let phase = frame_index as f32 * 0.05 + camera.time + tz;
        let blue = 0.5 + 0.5 * phase.sin();

        let mut pixels = Vec::with_capacity(resolution.pixels() * RGBA_CHANNELS);
        for y in 0..height {
            let v = (y as f32 + 0.5) / height as f32;
            for x in 0..width {
                let u = (x as f32 + 0.5) / width as f32;
                pixels.push((u + tx).rem_euclid(1.0));
                pixels.push((v + ty).rem_euclid(1.0));
                pixels.push(blue);
                pixels.push(1.0);
            }
        }

        DeviceImage::new(resolution, pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::Resolution;

    #[test]
    fn test_pattern_matches_resolution() {
        let camera = CameraParameters::with_resolution(Resolution::new(8, 4));
        let image = PatternRenderer::new().render(&camera, 0).unwrap();
        assert_eq!(image.resolution(), camera.resolution);
        assert!(image.pixels().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_pattern_follows_camera() {
        let mut renderer = PatternRenderer::new();
        let camera = CameraParameters::with_resolution(Resolution::new(4, 4));
        let mut moved = camera;
        moved.translation = [0.25, 0.0, 0.0];

        let a = renderer.render(&camera, 0).unwrap();
        let b = renderer.render(&moved, 0).unwrap();
        assert_ne!(a.pixels(), b.pixels());
    }
}
