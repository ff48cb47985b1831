//! Utility modules
//!
//! Frame-rate measurement and log throttling shared by the render loop and
//! the connection loops.

pub mod fps;
pub mod throttle;

pub use fps::{FpsMeter, FPS_REPORT_WINDOW};
pub use throttle::LogThrottler;
