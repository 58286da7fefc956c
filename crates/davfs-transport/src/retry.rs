use std::time::Duration;

/// Bounded exponential-backoff configuration, shared read-only by every
/// request a client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first try.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub growth_factor: u32,
    pub delay_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            growth_factor: 2,
            delay_cap: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    #[must_use]
    pub fn growth_factor(mut self, growth_factor: u32) -> Self {
        self.growth_factor = growth_factor;
        self
    }

    #[must_use]
    pub fn delay_cap(mut self, delay_cap: Duration) -> Self {
        self.delay_cap = delay_cap;
        self
    }

    /// Delay before the retry following attempt number `attempt` (0-indexed):
    /// `base * growth^attempt`, capped. Saturating arithmetic keeps large
    /// attempt counts from overflowing.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.growth_factor.saturating_pow(attempt);
        self.base_delay.saturating_mul(multiplier).min(self.delay_cap)
    }
}

/// Statuses indicating a transient server-side condition worth retrying:
/// rate limiting and temporary upstream failures.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}
