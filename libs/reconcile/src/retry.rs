//! Retry bookkeeping for failed reconciliation triggers.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Default first retry delay after a failure.
pub const BASE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Upper bound on the retry delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Exponential backoff delay for the given (1-based) attempt, starting at
/// `base` and capped at [`MAX_RETRY_DELAY`].
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent).min(MAX_RETRY_DELAY)
}

/// Retry tracker for failed operations.
#[derive(Debug, Clone)]
pub struct RetryTracker {
    /// Maximum retries per resource.
    max_retries: u32,

    /// Retry window duration.
    window: Duration,

    /// Tracked failures: resource_key -> (count, first_failure_time).
    failures: BTreeMap<String, (u32, Instant)>,
}

impl RetryTracker {
    /// Create a new retry tracker.
    pub fn new(max_retries: u32, window: Duration) -> Self {
        Self {
            max_retries,
            window,
            failures: BTreeMap::new(),
        }
    }

    /// Record a failure for a resource.
    ///
    /// Returns true if retries are exhausted.
    pub fn record_failure(&mut self, resource_key: &str) -> bool {
        self.record_failure_at(resource_key, Instant::now())
    }

    fn record_failure_at(&mut self, resource_key: &str, now: Instant) -> bool {
        let (count, first) = self
            .failures
            .entry(resource_key.to_string())
            .or_insert((0, now));

        // Reset if outside window
        if now.duration_since(*first) > self.window {
            *count = 0;
            *first = now;
        }

        *count += 1;
        *count > self.max_retries
    }

    /// Failures recorded for a resource within the current window.
    pub fn attempts(&self, resource_key: &str) -> u32 {
        self.failures
            .get(resource_key)
            .map(|(count, _)| *count)
            .unwrap_or(0)
    }

    /// Clear failure tracking for a resource (on success).
    pub fn clear(&mut self, resource_key: &str) {
        self.failures.remove(resource_key);
    }
}
