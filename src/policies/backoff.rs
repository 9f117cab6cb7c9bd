//! # Backoff policy for restarting failed manifolds.
//!
//! [`BackoffPolicy`] controls how retry delays grow after repeated failures.
//! It is parameterized by:
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The base delay after `n` consecutive failures is `first × factor^n`, clamped
//! to `max`. Jitter is applied to the clamped base.
//!
//! [`RetryState`] carries the per-manifold side: how many failures in a row,
//! and the delay used last time. Delays handed out by one `RetryState` never
//! shrink while failures continue, and the counter resets once an instance
//! stays up for the engine's minimum uptime.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use depvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.base(0), Duration::from_millis(100));
//! assert_eq!(backoff.base(1), Duration::from_millis(200));
//! // 100ms × 2^10 = 102_400ms → capped at max=10s
//! assert_eq!(backoff.base(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Maximum delay cap for retries.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` for growing delays).
    pub factor: f64,
    /// Jitter policy to prevent thundering herd.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `first = 3s`;
    /// - `factor = 1.2`;
    /// - `max = 2min`;
    /// - `jitter = Equal`.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(3),
            max: Duration::from_secs(120),
            factor: 1.2,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl BackoffPolicy {
    /// Base delay (no jitter) after `failures` consecutive failures (0-indexed).
    pub fn base(&self, failures: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = failures.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Jittered delay after `failures` consecutive failures, never above `max`.
    pub fn delay(&self, failures: u32, prev: Option<Duration>) -> Duration {
        let base = self.base(failures);
        self.jitter
            .apply(base, self.first, prev, self.max)
            .min(self.max)
    }
}

/// Consecutive-failure bookkeeping for one manifold.
#[derive(Clone, Debug, Default)]
pub struct RetryState {
    failures: u32,
    last_delay: Option<Duration>,
}

impl RetryState {
    /// Records a failure and returns the delay to wait before restarting.
    ///
    /// `uptime` is how long the failed instance ran (`None` when the factory
    /// itself failed). An uptime of at least `min_uptime` resets the counter
    /// first, so the returned delay starts from `first` again.
    pub fn record_failure(
        &mut self,
        policy: &BackoffPolicy,
        uptime: Option<Duration>,
        min_uptime: Duration,
    ) -> Duration {
        if uptime.is_some_and(|u| u >= min_uptime) {
            self.reset();
        }

        let jittered = policy.delay(self.failures, self.last_delay);
        let delay = match self.last_delay {
            Some(prev) => jittered.max(prev),
            None => jittered,
        }
        .min(policy.max);

        self.failures = self.failures.saturating_add(1);
        self.last_delay = Some(delay);
        delay
    }

    /// Forgets previous failures.
    pub fn reset(&mut self) {
        self.failures = 0;
        self.last_delay = None;
    }

    /// Number of consecutive failures recorded since the last reset.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Delay handed out for the most recent failure.
    pub fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(jitter: JitterPolicy) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_secs(1),
            factor: 2.0,
            jitter,
        }
    }

    #[test]
    fn base_grows_exponentially_until_max() {
        let p = policy(JitterPolicy::None);
        assert_eq!(p.base(0), Duration::from_millis(100));
        assert_eq!(p.base(1), Duration::from_millis(200));
        assert_eq!(p.base(2), Duration::from_millis(400));
        assert_eq!(p.base(3), Duration::from_millis(800));
        assert_eq!(p.base(4), Duration::from_secs(1));
        assert_eq!(p.base(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn first_above_max_is_clamped() {
        let p = BackoffPolicy {
            first: Duration::from_secs(10),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: JitterPolicy::None,
        };
        assert_eq!(p.delay(0, None), Duration::from_secs(5));
    }

    #[test]
    fn repeated_failures_never_shrink_and_cap_at_max() {
        for jitter in [
            JitterPolicy::None,
            JitterPolicy::Full,
            JitterPolicy::Equal,
            JitterPolicy::Decorrelated,
        ] {
            let p = policy(jitter);
            let mut retry = RetryState::default();
            let mut prev = Duration::ZERO;
            for _ in 0..20 {
                let d = retry.record_failure(&p, Some(Duration::ZERO), Duration::from_secs(60));
                assert!(d >= prev, "{jitter:?}: {d:?} < {prev:?}");
                assert!(d <= p.max);
                prev = d;
            }
        }
    }

    #[test]
    fn exact_sequence_without_jitter() {
        let p = policy(JitterPolicy::None);
        let mut retry = RetryState::default();
        let min_uptime = Duration::from_secs(60);
        let delays: Vec<_> = (0..6)
            .map(|_| retry.record_failure(&p, None, min_uptime))
            .collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
                Duration::from_secs(1),
                Duration::from_secs(1),
            ]
        );
        assert_eq!(retry.failures(), 6);
    }

    #[test]
    fn long_uptime_resets_to_first() {
        let p = policy(JitterPolicy::None);
        let mut retry = RetryState::default();
        let min_uptime = Duration::from_secs(5);

        retry.record_failure(&p, None, min_uptime);
        retry.record_failure(&p, Some(Duration::from_secs(1)), min_uptime);
        assert_eq!(retry.last_delay(), Some(Duration::from_millis(200)));

        let d = retry.record_failure(&p, Some(Duration::from_secs(5)), min_uptime);
        assert_eq!(d, Duration::from_millis(100));
        assert_eq!(retry.failures(), 1);
    }
}
