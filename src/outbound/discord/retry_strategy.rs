use std::time::Duration;

/// Ceiling for a single backoff wait.
const MAX_DELAY_MS: u64 = 30_000;

/// Retry strategy for Discord delivery
///
/// Every attempt counts against `max_attempts`, including attempts answered
/// with 429. Rate-limit waits are additionally capped by `max_rate_limit_wait`
/// so a receiver that keeps answering 429 cannot hold the request open
/// indefinitely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryStrategy {
    max_attempts: u32,

    base_delay_ms: u64,

    rate_limit_margin: Duration,

    max_rate_limit_wait: Duration,
}

impl RetryStrategy {
    /// Create a new retry strategy
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            rate_limit_margin: Duration::from_secs(1),
            max_rate_limit_wait: Duration::from_secs(30),
        }
    }

    /// Create default retry strategy: 3 attempts, 1s, 2s between them
    pub fn default_strategy() -> Self {
        Self::new(3, 1000)
    }

    /// Extra time added on top of a receiver's retry-after hint
    pub fn with_rate_limit_margin(mut self, margin: Duration) -> Self {
        self.rate_limit_margin = margin;
        self
    }

    /// Total time one delivery may spend waiting on 429 responses
    pub fn with_max_rate_limit_wait(mut self, budget: Duration) -> Self {
        self.max_rate_limit_wait = budget;
        self
    }

    /// Get maximum number of attempts
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn max_rate_limit_wait(&self) -> Duration {
        self.max_rate_limit_wait
    }

    /// Delay after the given failed attempt (1-based), growing linearly:
    /// `base * attempt`.
    ///
    /// Returns `None` once the attempt budget is spent.
    pub fn backoff_delay(&self, attempt: u32) -> Option<Duration> {
        if !self.should_retry(attempt) {
            return None;
        }

        let delay_ms = self
            .base_delay_ms
            .saturating_mul(u64::from(attempt))
            .min(MAX_DELAY_MS);

        Some(Duration::from_millis(delay_ms))
    }

    /// Wait to honour a 429, given the receiver's hint
    pub fn rate_limit_delay(&self, retry_after: Duration) -> Duration {
        retry_after.saturating_add(self.rate_limit_margin)
    }

    /// Check if another attempt may follow the given one (1-based)
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::default_strategy()
    }
}
