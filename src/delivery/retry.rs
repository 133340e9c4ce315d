use std::time::Duration;

/// How often and how patiently a destination is retried.
///
/// Delays grow linearly: the wait before attempt `n + 1` is `base_delay × n`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per destination, including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    /// Fraction of the delay added or removed at random (0.0 disables jitter)
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            jitter_factor: 0.0,
        }
    }
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            jitter_factor: 0.0,
        }
    }

    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    /// At least one attempt is always made.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_ms as f64 * f64::from(attempt);

        if self.jitter_factor <= 0.0 {
            return Duration::from_millis(delay as u64);
        }

        let jitter = delay * self.jitter_factor * (rand::random::<f64>() - 0.5);
        Duration::from_millis((delay + jitter).max(0.0) as u64)
    }
}
