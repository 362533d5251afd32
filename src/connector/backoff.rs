//! Back-off configuration for the connect loop.

use std::time::Duration;

/// Configuration for exponential back-off between failed handshakes.
///
/// The connect loop retries immediately by default. When a `BackoffConfig`
/// is set on the builder, the loop sleeps `initial_delay` after the first
/// failure and doubles the delay on each consecutive failure, capped at
/// `max_delay`. A successful handshake resets the delay.
///
/// # Default Values
/// - `initial_delay`: 10 milliseconds
/// - `max_delay`: 1 second
///
/// # Invariants
/// - `initial_delay` must not exceed `max_delay`
/// - `initial_delay` must be at least 1 millisecond
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay used after the first failed handshake.
    pub initial_delay: Duration,
    /// Maximum delay once retries have increased exponentially.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl BackoffConfig {
    /// Clamp delays to sane bounds and ensure `initial_delay <= max_delay`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use socketlink::BackoffConfig;
    ///
    /// let cfg = BackoffConfig {
    ///     initial_delay: Duration::from_millis(5),
    ///     max_delay: Duration::ZERO,
    /// };
    ///
    /// let normalized = cfg.normalized();
    /// assert_eq!(normalized.initial_delay, Duration::from_millis(1));
    /// assert_eq!(normalized.max_delay, Duration::from_millis(5));
    /// ```
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.initial_delay = self.initial_delay.max(Duration::from_millis(1));
        self.max_delay = self.max_delay.max(Duration::from_millis(1));
        if self.initial_delay > self.max_delay {
            std::mem::swap(&mut self.initial_delay, &mut self.max_delay);
        }
        self
    }

    /// Delay to use after `delay`, doubling up to `max_delay`.
    #[must_use]
    pub(crate) fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Duration::from_millis(10), Duration::from_millis(20))]
    #[case(Duration::from_millis(600), Duration::from_secs(1))]
    #[case(Duration::from_secs(1), Duration::from_secs(1))]
    fn delay_doubles_up_to_cap(#[case] current: Duration, #[case] expected: Duration) {
        assert_eq!(BackoffConfig::default().next_delay(current), expected);
    }

    #[test]
    fn zero_delays_are_raised_to_one_millisecond() {
        let cfg = BackoffConfig {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
        .normalized();
        assert_eq!(cfg.initial_delay, Duration::from_millis(1));
        assert_eq!(cfg.max_delay, Duration::from_millis(1));
    }
}
