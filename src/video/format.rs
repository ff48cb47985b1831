//! Frame geometry definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes per RGBA8 pixel
pub const RGBA_CHANNELS: usize = 4;

/// Resolution (width x height)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Largest accepted width
    pub const MAX_WIDTH: u32 = 15360;
    /// Largest accepted height
    pub const MAX_HEIGHT: u32 = 8640;

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Check if resolution is valid
    pub fn is_valid(&self) -> bool {
        self.width >= 1
            && self.width <= Self::MAX_WIDTH
            && self.height >= 1
            && self.height <= Self::MAX_HEIGHT
    }

    /// Check both dimensions are no larger than `max`
    pub fn fits_within(&self, max: Resolution) -> bool {
        self.width <= max.width && self.height <= max.height
    }

    /// Get total pixels
    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of an RGBA8 buffer at this resolution
    pub fn rgba_len(&self) -> usize {
        self.pixels() * RGBA_CHANNELS
    }

    /// Bytes per RGBA8 row
    pub fn rgba_pitch(&self) -> usize {
        self.width as usize * RGBA_CHANNELS
    }

    /// Common resolutions
    pub const VGA: Resolution = Resolution {
        width: 640,
        height: 480,
    };
    pub const HD720: Resolution = Resolution {
        width: 1280,
        height: 720,
    };
    pub const HD1080: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_validity() {
        assert!(Resolution::HD1080.is_valid());
        assert!(Resolution::new(1, 1).is_valid());
        assert!(!Resolution::new(0, 1080).is_valid());
        assert!(!Resolution::new(1920, 0).is_valid());
        assert!(!Resolution::new(Resolution::MAX_WIDTH + 1, 1080).is_valid());
    }

    #[test]
    fn test_rgba_sizes() {
        let res = Resolution::new(4, 2);
        assert_eq!(res.pixels(), 8);
        assert_eq!(res.rgba_len(), 32);
        assert_eq!(res.rgba_pitch(), 16);
        assert_eq!(res.to_string(), "4x2");
    }
}
