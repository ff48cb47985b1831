//! Network services
//!
//! Two independent WebSocket listeners share the pipeline state:
//!
//! - [`FrameStreamingService`]: pushes the latest frame to every client
//! - [`CameraControlService`]: applies inbound camera updates

pub mod clients;
pub mod control;
pub mod frame_stream;

pub use clients::{ClientGuard, ClientId, ClientRegistry, ConnectionStats};
pub use control::CameraControlService;
pub use frame_stream::{FrameStreamingService, StreamSettings};
