//! Render side of the pipeline
//!
//! The render loop produces frames on its own thread; device buffers are
//! color corrected and handed to a transfer stream whose completion tokens
//! are published through the frame slot.

pub mod correction;
pub mod device;
pub mod render_loop;
pub mod renderer;
pub mod transfer;

pub use correction::{correct_and_flip, quantize, Correction};
pub use device::{DeviceBuffer, DeviceImage};
pub use render_loop::{spawn_render_loop, RenderHandle, RenderLoop};
pub use renderer::{PatternRenderer, Renderer};
pub use transfer::{
    completion_pair, CompletionSignal, CompletionToken, ThreadedTransferStream, TransferStatus,
    TransferStream,
};
