//! Log throttling utility
//!
//! Limits how often the same log message is recorded, so a client spamming
//! malformed messages or a repeating transfer error cannot flood the log.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Log throttler that limits how often the same message is logged
pub struct LogThrottler {
    /// Map of message key to last log time and suppressed count
    last_logged: Mutex<HashMap<String, (Instant, u64)>>,
    /// Throttle interval
    interval: Duration,
}

impl LogThrottler {
    /// Create a new log throttler with the specified interval
    pub fn new(interval: Duration) -> Self {
        Self {
            last_logged: Mutex::new(HashMap::new()),
            interval,
        }
    }

    /// Create a new log throttler with interval specified in seconds
    pub fn with_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Check if a message should be logged
    ///
    /// Returns `Some(suppressed)` with the number of messages dropped since
    /// the last emitted one, or `None` while throttled.
    pub fn check(&self, key: &str) -> Option<u64> {
        let now = Instant::now();
        let mut map = self.last_logged.lock();
        match map.get_mut(key) {
            Some((last, suppressed)) if now.duration_since(*last) < self.interval => {
                *suppressed += 1;
                None
            }
            Some((last, suppressed)) => {
                let dropped = *suppressed;
                *last = now;
                *suppressed = 0;
                Some(dropped)
            }
            None => {
                map.insert(key.to_string(), (now, 0));
                Some(0)
            }
        }
    }

    /// Clear throttle state for a specific key
    pub fn clear(&self, key: &str) {
        self.last_logged.lock().remove(key);
    }

    /// Get the number of tracked keys
    pub fn len(&self) -> usize {
        self.last_logged.lock().len()
    }

    /// Check if the throttler is empty
    pub fn is_empty(&self) -> bool {
        self.last_logged.lock().is_empty()
    }
}

impl Default for LogThrottler {
    /// Create a default log throttler with 5 second interval
    fn default() -> Self {
        Self::with_secs(5)
    }
}

/// Macro for throttled warning logging
///
/// Messages dropped since the last emitted one are reported in the
/// `suppressed` field.
#[macro_export]
macro_rules! warn_throttled {
    ($throttler:expr, $key:expr, $($arg:tt)*) => {
        if let Some(suppressed) = $throttler.check($key) {
            if suppressed > 0 {
                tracing::warn!(suppressed, $($arg)*);
            } else {
                tracing::warn!($($arg)*);
            }
        }
    };
}
