//! Failure backoff for empty polls
//!
//! An empty listing usually means the source is unavailable rather than that
//! the inbox is empty, so repeated empty polls stretch the wait up to a cap.

use crate::config::PollingConfig;
use std::time::Duration;

/// Configuration for empty-poll backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Wait used while failures stay at or below the threshold
    pub empty_interval: Duration,

    /// Per-failure increment once past the threshold
    pub base: Duration,

    /// Upper bound on any delay
    pub cap: Duration,

    /// Consecutive failures tolerated before backing off
    pub threshold: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_polling(&PollingConfig::default())
    }
}

impl BackoffPolicy {
    pub fn from_polling(polling: &PollingConfig) -> Self {
        Self {
            empty_interval: polling.empty_interval(),
            base: polling.backoff_base(),
            cap: polling.backoff_cap(),
            threshold: polling.backoff_threshold,
        }
    }

    /// Delay after `failures` consecutive empty polls
    ///
    /// Non-decreasing in `failures` and never above `cap`.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures <= self.threshold {
            return self.empty_interval.min(self.cap);
        }
        let scaled = self.base.saturating_mul(failures);
        scaled.max(self.empty_interval).min(self.cap)
    }

    /// Whether `failures` puts the relay in backoff
    pub fn is_backing_off(&self, failures: u32) -> bool {
        failures > self.threshold
    }
}
