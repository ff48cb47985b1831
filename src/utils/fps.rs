//! Windowed frame-rate measurement
//!
//! Counts frames since the last report; once the elapsed time exceeds the
//! window, yields `frames / elapsed_seconds` and starts a new window.

use std::time::{Duration, Instant};

/// Default reporting window
pub const FPS_REPORT_WINDOW: Duration = Duration::from_secs(2);

/// Frame counter that reports once per window
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: Duration,
    frames: u64,
    window_start: Instant,
}

impl FpsMeter {
    /// Create a meter with the default 2 second window
    pub fn new() -> Self {
        Self::with_window(FPS_REPORT_WINDOW)
    }

    /// Create a meter with a custom window
    pub fn with_window(window: Duration) -> Self {
        Self::starting_at(Instant::now(), window)
    }

    /// Create a meter whose first window starts at `start`
    pub fn starting_at(start: Instant, window: Duration) -> Self {
        Self {
            window,
            frames: 0,
            window_start: start,
        }
    }

    /// Record a frame now
    pub fn tick(&mut self) -> Option<f64> {
        self.tick_at(Instant::now())
    }

    /// Record a frame at `now`
    ///
    /// Returns the measured rate when the window has been exceeded, then
    /// resets the counter.
    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed <= self.window {
            return None;
        }

        let fps = self.frames as f64 / elapsed.as_secs_f64();
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }

    /// Frames counted in the current window
    pub fn pending_frames(&self) -> u64 {
        self.frames
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_report_inside_window() {
        let start = Instant::now();
        let mut meter = FpsMeter::starting_at(start, FPS_REPORT_WINDOW);
        for i in 1..=60 {
            // 30 fps for exactly two seconds
            let now = start + Duration::from_millis(i * 2000 / 60);
            assert_eq!(meter.tick_at(now), None);
        }
        assert_eq!(meter.pending_frames(), 60);
    }

    #[test]
    fn test_report_after_window() {
        let start = Instant::now();
        let mut meter = FpsMeter::starting_at(start, FPS_REPORT_WINDOW);
        for i in 1..=49 {
            assert_eq!(meter.tick_at(start + Duration::from_millis(i * 40)), None);
        }
        // 50th frame lands at 2.5s
        let fps = meter.tick_at(start + Duration::from_millis(2500)).unwrap();
        assert!((fps - 20.0).abs() < 1e-9, "fps = {}", fps);
        assert_eq!(meter.pending_frames(), 0);
    }

    #[test]
    fn test_resets_after_report() {
        let start = Instant::now();
        let mut meter = FpsMeter::starting_at(start, FPS_REPORT_WINDOW);
        assert!(meter.tick_at(start + Duration::from_secs(3)).is_some());

        let second = start + Duration::from_secs(3);
        assert_eq!(meter.tick_at(second + Duration::from_secs(1)), None);
        let fps = meter.tick_at(second + Duration::from_secs(4)).unwrap();
        assert!((fps - 0.5).abs() < 1e-9);
    }
}
