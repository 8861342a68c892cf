//! Retry policy with exponential backoff.

use std::time::Duration;

/// Status codes that are retried automatically.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Upper bound for any single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Bounded automatic retry for transient failures.
///
/// The delay before retry `n` (0-based) is `base * 2^n`, capped at
/// [`MAX_BACKOFF`]. A `Retry-After` value sent with 429 or 503 responses
/// replaces the computed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt.
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given retry budget and base delay.
    #[must_use]
    pub const fn new(max_retries: u32, base: Duration) -> Self {
        Self { max_retries, base }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base: Duration::ZERO,
        }
    }

    /// Check if a given HTTP status code should trigger a retry.
    #[must_use]
    pub fn should_retry_status(status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    /// Total number of attempts allowed by this policy.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Calculate the delay before retry `attempt` (0-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scale = 2f64.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let seconds = (self.base.as_secs_f64() * scale).min(MAX_BACKOFF.as_secs_f64());
        Duration::from_secs_f64(seconds)
    }

    /// Delay before retry `attempt` for a response with `status`, honoring
    /// `Retry-After` on 429 and 503.
    #[must_use]
    pub fn delay_for_status(&self, attempt: u32, status: u16, retry_after: Option<f64>) -> Duration {
        match retry_after {
            Some(secs) if status == 429 || status == 503 => {
                Duration::from_secs_f64(secs.min(MAX_BACKOFF.as_secs_f64()))
            }
            _ => self.delay_for_attempt(attempt),
        }
    }
}
