//! Retry scheduling after failed sync cycles.

use std::time::Duration;

use rand::Rng;

/// Decides how long to wait before the next cycle after consecutive
/// failures. A count of zero means the last cycle succeeded.
pub trait RetryPolicy: Send + Sync {
    fn delay_after(&self, consecutive_failures: u32) -> Duration;
}

/// One fixed delay regardless of the failure count.
#[derive(Clone, Debug)]
pub struct FixedInterval(pub Duration);

impl Default for FixedInterval {
    fn default() -> Self {
        Self(Duration::from_secs(60))
    }
}

impl RetryPolicy for FixedInterval {
    fn delay_after(&self, _consecutive_failures: u32) -> Duration {
        self.0
    }
}

/// Doubling delay with +/-20% jitter, capped at `max`.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(5),
            max: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn delay_after(&self, consecutive_failures: u32) -> Duration {
        let exponent = consecutive_failures.saturating_sub(1).min(16);
        let raw = self.base.saturating_mul(1u32 << exponent).min(self.max);
        let jitter = rand::thread_rng().gen_range(0.8..1.2);
        raw.mul_f64(jitter).min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_interval_ignores_failure_count() {
        let policy = FixedInterval(Duration::from_secs(60));
        assert_eq!(policy.delay_after(1), Duration::from_secs(60));
        assert_eq!(policy.delay_after(10), Duration::from_secs(60));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = ExponentialBackoff {
            base: Duration::from_secs(5),
            max: Duration::from_secs(300),
        };
        assert!(policy.delay_after(1) <= Duration::from_secs(6));
        assert!(policy.delay_after(3) >= Duration::from_secs(16));
        assert!(policy.delay_after(30) <= Duration::from_secs(300));
    }
}
