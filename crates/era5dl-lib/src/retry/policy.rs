use crate::config::DownloadConfig;
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Lower bound of the base delay in seconds.
    pub min_delay_secs: u64,
    /// Upper bound of the base delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay_secs: 30,
            max_delay_secs: 180,
        }
    }
}

impl From<&DownloadConfig> for RetryPolicy {
    fn from(download: &DownloadConfig) -> Self {
        Self {
            max_attempts: download.max_retries,
            min_delay_secs: download.retry_delay.min_secs,
            max_delay_secs: download.retry_delay.max_secs,
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempt` failed attempts.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    ///
    /// A whole number of seconds drawn uniformly from the base range, then
    /// multiplied by `attempt`: the bound grows linearly with each failure.
    pub fn backoff_delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let (low, high) = if self.min_delay_secs <= self.max_delay_secs {
            (self.min_delay_secs, self.max_delay_secs)
        } else {
            (self.max_delay_secs, self.min_delay_secs)
        };
        let base = rng.random_range(low..=high);
        Duration::from_secs(base.saturating_mul(u64::from(attempt.max(1))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_default_matches_documented_limits() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.min_delay_secs, 30);
        assert_eq!(policy.max_delay_secs, 180);
    }

    #[test]
    fn test_backoff_delay_within_linear_bounds() {
        let policy = RetryPolicy {
            max_attempts: 10,
            ..RetryPolicy::default()
        };
        let mut rng = StdRng::seed_from_u64(7);

        for attempt in 1..=10u32 {
            for _ in 0..200 {
                let delay = policy.backoff_delay(attempt, &mut rng).as_secs();
                let n = u64::from(attempt);
                assert!(
                    (30 * n..=180 * n).contains(&delay),
                    "attempt {attempt}: {delay}s outside [{}, {}]",
                    30 * n,
                    180 * n
                );
            }
        }
    }

    #[test]
    fn test_backoff_delay_is_multiple_of_attempt() {
        let policy = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(policy.backoff_delay(3, &mut rng).as_secs() % 3, 0);
        }
    }

    #[test]
    fn test_zero_width_range_is_deterministic() {
        let policy = RetryPolicy {
            max_attempts: 3,
            min_delay_secs: 5,
            max_delay_secs: 5,
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(policy.backoff_delay(1, &mut rng), Duration::from_secs(5));
        assert_eq!(policy.backoff_delay(2, &mut rng), Duration::from_secs(10));
        assert_eq!(policy.backoff_delay(3, &mut rng), Duration::from_secs(15));
    }

    #[test]
    fn test_should_retry_respects_max_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }
}
