use std::time::Duration;

use crate::types::{DEFAULT_MAX_RETRIES, DEFAULT_RECONNECT_INTERVAL_MS};

/// Reconnection backoff policy: linear-scaled delays with a hard attempt cap.
///
/// The Nth attempt waits `base * N`. This deliberately preserves the linear
/// growth curve of the original portal client (not true exponential backoff);
/// downstream retry budgets depend on it.
pub struct ReconnectPolicy {
    base: Duration,
    max_retries: u32,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base: Duration, max_retries: u32) -> Self {
        Self {
            base,
            max_retries,
            attempts: 0,
        }
    }

    /// Advance to the next attempt and return its delay, or `None` once the
    /// attempt cap is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_retries {
            return None;
        }
        self.attempts += 1;
        Some(self.base * self.attempts)
    }

    /// Attempts consumed since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Reset after a successful connection or an explicit `connect()`
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS),
            DEFAULT_MAX_RETRIES,
        )
    }
}
