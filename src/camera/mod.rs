//! Camera state and remote control messages

pub mod control;
pub mod state;

pub use control::{CameraUpdate, ControlMessage};
pub use state::{CameraParameters, CameraState, Mat3, IDENTITY3};
