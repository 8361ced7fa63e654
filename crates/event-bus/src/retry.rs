//! Exponential backoff between delivery attempts.

use std::time::Duration;

/// Backoff schedule applied between failed attempts.
///
/// The wait after the `n`th failure is `initial_delay * multiplier^(n-1)`,
/// capped at `max_delay`.
///
/// # Default Values
///
/// - `initial_delay`: 100ms
/// - `max_delay`: 30 seconds
/// - `multiplier`: 2.0
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl BackoffPolicy {
    pub fn new(initial_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier,
        }
    }

    /// A constant delay between attempts.
    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay, 1.0)
    }

    /// How long to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);

        if !delay_ms.is_finite() || delay_ms >= self.max_delay.as_millis() as f64 {
            return self.max_delay;
        }
        Duration::from_millis(delay_ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_retry_waits_initial_delay() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
    }

    #[test]
    fn delay_grows_exponentially() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(30), 2.0);
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(4), Duration::from_millis(800));
    }

    #[test]
    fn delay_is_capped() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(1), 2.0);
        assert_eq!(policy.delay_after(10), Duration::from_secs(1));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn fixed_policy_never_grows() {
        let policy = BackoffPolicy::fixed(Duration::from_millis(5));
        assert_eq!(policy.delay_after(1), Duration::from_millis(5));
        assert_eq!(policy.delay_after(7), Duration::from_millis(5));
    }
}
