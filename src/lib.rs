//! livecast - live render streaming with remote camera control
//!
//! A render loop produces frames on its own thread and publishes them into a
//! single latest-frame slot. One WebSocket listener streams the latest frame
//! to any number of viewers; a second listener accepts camera updates that
//! the next rendered frame picks up.

pub mod camera;
pub mod config;
pub mod error;
pub mod events;
pub mod render;
pub mod server;
pub mod stream;
pub mod utils;
pub mod video;

pub use error::{AppError, Result};
pub use server::{Orchestrator, RunningPipeline};
