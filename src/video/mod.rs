//! Frame buffers, the latest-frame slot and frame encoders

pub mod encoder;
pub mod format;
pub mod frame;
pub mod frame_slot;

pub use encoder::{create_encoder, EncodedFormat, EncodedFrame, FrameEncoder, JpegEncoder};
pub use format::Resolution;
pub use frame::HostFrame;
pub use frame_slot::{FrameSlot, PublishedFrame};
