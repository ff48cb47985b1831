//! Host-side frame data structures

use bytes::Bytes;
use rand::RngCore;

use super::format::Resolution;
use crate::error::{AppError, Result};

/// A completed RGBA8 frame in host memory
///
/// Rows are stored top-to-bottom in display order (the render loop has
/// already applied the vertical flip).
#[derive(Debug, Clone)]
pub struct HostFrame {
    /// Raw RGBA bytes (cheap clone)
    data: Bytes,
    /// Frame resolution
    pub resolution: Resolution,
    /// Generation this frame was published under
    pub generation: u64,
}

impl HostFrame {
    /// Create a frame, checking the buffer matches the resolution
    pub fn new(data: Bytes, resolution: Resolution, generation: u64) -> Result<Self> {
        if data.len() != resolution.rgba_len() {
            return Err(AppError::TransferError(format!(
                "host buffer size mismatch for {}: {} != {}",
                resolution,
                data.len(),
                resolution.rgba_len()
            )));
        }
        Ok(Self {
            data,
            resolution,
            generation,
        })
    }

    /// Placeholder shown before the first render completes
    ///
    /// Filled with random noise so a connected viewer can tell the stream is
    /// alive but not yet rendering.
    pub fn placeholder(resolution: Resolution) -> Self {
        let mut data = vec![0u8; resolution.rgba_len()];
        rand::thread_rng().fill_bytes(&mut data);
        Self {
            data: Bytes::from(data),
            resolution,
            generation: 0,
        }
    }

    /// Get frame data as bytes slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get frame data as Bytes (cheap clone)
    pub fn data_bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Get data length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if frame is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_mismatch_rejected() {
        let res = Resolution::new(2, 2);
        let err = HostFrame::new(Bytes::from(vec![0u8; 15]), res, 1).unwrap_err();
        assert!(matches!(err, AppError::TransferError(_)));
    }

    #[test]
    fn test_shares_buffer() {
        let res = Resolution::new(2, 2);
        let data: Vec<u8> = (0..16).collect();
        let frame = HostFrame::new(Bytes::from(data), res, 3).unwrap();
        assert_eq!(frame.data_bytes(), frame.data());
        assert_eq!(frame.generation, 3);
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_placeholder() {
        let frame = HostFrame::placeholder(Resolution::new(8, 4));
        assert_eq!(frame.len(), 8 * 4 * 4);
        assert_eq!(frame.generation, 0);
    }
}
