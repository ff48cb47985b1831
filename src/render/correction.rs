//! Linear color correction, quantization and vertical flip
//!
//! `out_rgb = clip(in_rgb * exposure + offset, 0, 1)`, alpha untouched by the
//! linear term. Every channel is then clipped and truncated to 8 bits
//! (`floor(v * 255)`), and rows are emitted bottom-up so the first output row
//! is the last rendered row. Viewers expect this row order; the flip must
//! happen before compression.

use super::device::{DeviceBuffer, DeviceImage};
use crate::video::format::RGBA_CHANNELS;

/// Exposure/offset pair applied to color channels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    pub exposure: f32,
    pub offset: f32,
}

impl Correction {
    pub const IDENTITY: Correction = Correction {
        exposure: 1.0,
        offset: 0.0,
    };

    pub fn new(exposure: f32, offset: f32) -> Self {
        Self { exposure, offset }
    }

    /// Whether the linear term can be skipped
    pub fn is_identity(&self) -> bool {
        self.exposure == 1.0 && self.offset == 0.0
    }

    #[inline]
    fn apply(&self, value: f32) -> f32 {
        value * self.exposure + self.offset
    }
}

impl Default for Correction {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Map a normalized channel value to 8 bits
#[inline]
pub fn quantize(value: f32) -> u8 {
    // NaN saturates to 0
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Run the correction kernel over a rendered image
pub fn correct_and_flip(image: &DeviceImage, correction: Correction) -> DeviceBuffer {
    let resolution = image.resolution();
    let width = resolution.width as usize;
    let height = resolution.height as usize;
    let row_len = width * RGBA_CHANNELS;
    let src = image.pixels();
    let identity = correction.is_identity();

    let mut out = vec![0u8; resolution.rgba_len()];
    for (dst_row, out_row) in out.chunks_exact_mut(row_len).enumerate() {
        let src_row = height - 1 - dst_row;
        let input = &src[src_row * row_len..(src_row + 1) * row_len];
        for (px_in, px_out) in input
            .chunks_exact(RGBA_CHANNELS)
            .zip(out_row.chunks_exact_mut(RGBA_CHANNELS))
        {
            for c in 0..3 {
                let v = if identity {
                    px_in[c]
                } else {
                    correction.apply(px_in[c])
                };
                px_out[c] = quantize(v);
            }
            px_out[3] = quantize(px_in[3]);
        }
    }

    DeviceBuffer::new(out, resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::Resolution;

    #[test]
    fn test_exposure_offset_formula() {
        let image = DeviceImage::filled(Resolution::new(1, 1), [0.4, 0.4, 0.4, 0.4]);
        let out = correct_and_flip(&image, Correction::new(1.5, 0.1));
        // clip(0.4 * 1.5 + 0.1) = 0.7 -> 178; alpha keeps 0.4 -> 102
        assert_eq!(out.as_slice(), &[178, 178, 178, 102]);
    }

    #[test]
    fn test_clipping() {
        let image = DeviceImage::filled(Resolution::new(1, 1), [0.9, 0.0, -0.5, 1.5]);
        let out = correct_and_flip(&image, Correction::new(2.0, -0.2));
        // 1.6 -> 1.0, -0.2 -> 0.0, -1.2 -> 0.0, alpha 1.5 -> 1.0
        assert_eq!(out.as_slice(), &[255, 0, 0, 255]);
    }

    #[test]
    fn test_identity_is_quantize_and_flip() {
        let res = Resolution::new(2, 3);
        let pixels: Vec<f32> = (0..res.rgba_len()).map(|i| i as f32 / 24.0).collect();
        let image = DeviceImage::new(res, pixels.clone()).unwrap();
        let out = correct_and_flip(&image, Correction::IDENTITY);

        let row_len = res.rgba_pitch();
        for dst_row in 0..3 {
            let src_row = 2 - dst_row;
            let expected: Vec<u8> = pixels[src_row * row_len..(src_row + 1) * row_len]
                .iter()
                .map(|&v| quantize(v))
                .collect();
            assert_eq!(
                &out.as_slice()[dst_row * row_len..(dst_row + 1) * row_len],
                expected.as_slice()
            );
        }
    }

    #[test]
    fn test_flip_row_order() {
        let res = Resolution::new(1, 2);
        // top row black, bottom row white
        let image = DeviceImage::new(res, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
        let out = correct_and_flip(&image, Correction::IDENTITY);
        assert_eq!(out.as_slice(), &[255, 255, 255, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn test_quantize_truncates() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), 255);
        assert_eq!(quantize(0.5), 127);
        assert_eq!(quantize(f32::NAN), 0);
    }
}
