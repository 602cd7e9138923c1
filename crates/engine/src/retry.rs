//! Retry policies for contended acquisition
//!
//! A policy decides, after each busy attempt, whether the acquisition loop
//! runs again, and implements backoff by sleeping inside
//! [`allow_retry`](RetryPolicy::allow_retry). The configured policy is a
//! template: every acquisition starts from a
//! [`duplicate`](RetryPolicy::duplicate) with reset progress.

use std::time::Duration;

use rand::Rng;
use rowlock_core::traits::RetryPolicy;

/// Never retries: contention fails fast. The default policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOnce;

impl RetryPolicy for RunOnce {
    fn duplicate(&self) -> Box<dyn RetryPolicy> {
        Box::new(RunOnce)
    }

    fn allow_retry(&mut self) -> bool {
        false
    }
}

/// Fixed delay between attempts, bounded attempt count.
#[derive(Debug, Clone)]
pub struct ConstantBackoff {
    delay: Duration,
    max_retries: u32,
    attempted: u32,
}

impl ConstantBackoff {
    /// A policy that sleeps `delay` and retries, at most `max_retries`
    /// times.
    pub fn new(delay: Duration, max_retries: u32) -> Self {
        Self {
            delay,
            max_retries,
            attempted: 0,
        }
    }
}

impl RetryPolicy for ConstantBackoff {
    fn duplicate(&self) -> Box<dyn RetryPolicy> {
        Box::new(Self::new(self.delay, self.max_retries))
    }

    fn allow_retry(&mut self) -> bool {
        if self.attempted >= self.max_retries {
            return false;
        }
        self.attempted += 1;
        std::thread::sleep(self.delay);
        true
    }
}

/// Doubling delay from a base, capped, with optional jitter.
///
/// The nth retry sleeps `min(base << n, max_delay)`, halved-to-full at
/// random when jitter is on. Jitter spreads out contenders that all saw
/// the same busy row at the same instant.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max_delay: Duration,
    max_retries: u32,
    jitter: bool,
    attempted: u32,
}

impl ExponentialBackoff {
    /// A policy starting at `base`, doubling up to `max_delay`, retrying
    /// at most `max_retries` times, with jitter enabled.
    pub fn new(base: Duration, max_delay: Duration, max_retries: u32) -> Self {
        Self {
            base,
            max_delay,
            max_retries,
            jitter: true,
            attempted: 0,
        }
    }

    /// Disable jitter. Deterministic delays, mostly useful in tests.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    fn next_delay(&self) -> Duration {
        let doubled = self
            .base
            .checked_mul(1u32.checked_shl(self.attempted).unwrap_or(u32::MAX))
            .unwrap_or(self.max_delay);
        let capped = doubled.min(self.max_delay);
        if self.jitter && !capped.is_zero() {
            rand::thread_rng().gen_range(capped / 2..=capped)
        } else {
            capped
        }
    }
}

impl Default for ExponentialBackoff {
    /// 50 ms base, 5 s cap, 10 retries, jitter on.
    fn default() -> Self {
        Self::new(Duration::from_millis(50), Duration::from_secs(5), 10)
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn duplicate(&self) -> Box<dyn RetryPolicy> {
        let mut fresh = self.clone();
        fresh.attempted = 0;
        Box::new(fresh)
    }

    fn allow_retry(&mut self) -> bool {
        if self.attempted >= self.max_retries {
            return false;
        }
        let delay = self.next_delay();
        self.attempted += 1;
        std::thread::sleep(delay);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn run_once_never_retries() {
        let mut policy = RunOnce;
        assert!(!policy.allow_retry());
        assert!(!policy.duplicate().allow_retry());
    }

    #[test]
    fn constant_backoff_respects_budget() {
        let mut policy = ConstantBackoff::new(Duration::from_millis(1), 3);
        assert!(policy.allow_retry());
        assert!(policy.allow_retry());
        assert!(policy.allow_retry());
        assert!(!policy.allow_retry());
        assert!(!policy.allow_retry());
    }

    #[test]
    fn constant_backoff_sleeps() {
        let mut policy = ConstantBackoff::new(Duration::from_millis(20), 1);
        let start = Instant::now();
        assert!(policy.allow_retry());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn duplicate_resets_progress() {
        let mut policy = ConstantBackoff::new(Duration::from_millis(1), 1);
        assert!(policy.allow_retry());
        assert!(!policy.allow_retry());

        let mut fresh = policy.duplicate();
        assert!(fresh.allow_retry());
        assert!(!fresh.allow_retry());
    }

    #[test]
    fn exponential_backoff_caps_delay() {
        let policy = ExponentialBackoff::new(
            Duration::from_millis(10),
            Duration::from_millis(15),
            40,
        )
        .without_jitter();
        let mut capped = policy.clone();
        capped.attempted = 30;
        assert_eq!(capped.next_delay(), Duration::from_millis(15));
    }

    #[test]
    fn exponential_backoff_respects_budget() {
        let mut policy =
            ExponentialBackoff::new(Duration::from_micros(1), Duration::from_micros(2), 2)
                .without_jitter();
        assert!(policy.allow_retry());
        assert!(policy.allow_retry());
        assert!(!policy.allow_retry());

        let mut fresh = policy.duplicate();
        assert!(fresh.allow_retry());
    }

    #[test]
    fn jittered_delay_stays_in_bounds() {
        let mut policy =
            ExponentialBackoff::new(Duration::from_millis(8), Duration::from_millis(8), 1);
        policy.attempted = 0;
        for _ in 0..16 {
            let d = policy.next_delay();
            assert!(d >= Duration::from_millis(4));
            assert!(d <= Duration::from_millis(8));
        }
    }
}
