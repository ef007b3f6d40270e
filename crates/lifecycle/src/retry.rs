use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry discipline for conditional-update conflicts
///
/// A conflict means another writer won the race since we read the record;
/// the operation refetches, revalidates and tries again up to
/// `max_attempts` total tries with exponential delays in between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 25,  // 25ms
            max_backoff_ms: 250,     // 250ms
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no second chances
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn backoff(&self) -> ConflictBackoff {
        ConflictBackoff::new(
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}

/// Exponential delay sequence between conflict retries
pub struct ConflictBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    current_attempt: u32,
}

impl ConflictBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            multiplier: 2.0,
            current_attempt: 0,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = if self.current_attempt == 0 {
            self.initial
        } else {
            let multiplier = self.multiplier.powi(self.current_attempt as i32);
            let delay_ms = self.initial.as_millis() as f64 * multiplier;
            let delay_ms = delay_ms.min(self.max.as_millis() as f64);
            Duration::from_millis(delay_ms as u64)
        };

        self.current_attempt += 1;
        delay
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }

    pub fn current_attempt(&self) -> u32 {
        self.current_attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_progression() {
        let mut backoff = ConflictBackoff::new(Duration::from_millis(25), Duration::from_secs(1));

        assert_eq!(backoff.next_delay(), Duration::from_millis(25));
        assert_eq!(backoff.next_delay(), Duration::from_millis(50));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.current_attempt(), 3);
    }

    #[test]
    fn test_backoff_caps_at_max() {
        let mut backoff = ConflictBackoff::new(Duration::from_millis(25), Duration::from_millis(250));

        for _ in 0..20 {
            assert!(backoff.next_delay() <= Duration::from_millis(250));
        }
        assert_eq!(backoff.next_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = ConflictBackoff::new(Duration::from_millis(25), Duration::from_secs(1));
        backoff.next_delay();
        backoff.next_delay();

        backoff.reset();
        assert_eq!(backoff.current_attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(25));
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);

        let mut backoff = policy.backoff();
        assert_eq!(backoff.next_delay(), Duration::from_millis(25));

        assert_eq!(RetryPolicy::no_retry().max_attempts, 1);
    }
}
