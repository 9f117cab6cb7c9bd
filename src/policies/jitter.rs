//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that manifolds which
//! failed together (a shared dependency went away) do not all come back in
//! the same instant.
//!
//! - [`JitterPolicy::None`]: exact delays, used by tests
//! - [`JitterPolicy::Full`]: random delay in `[0, base]`
//! - [`JitterPolicy::Equal`]: `base/2 + random[0, base/2]`
//! - [`JitterPolicy::Decorrelated`]: random in `[floor, prev × 3]`, capped

use std::time::Duration;

use rand::Rng;

/// Policy controlling randomization of retry delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use the exact backoff delay.
    #[default]
    None,

    /// Full jitter: random delay in `[0, base]`.
    Full,

    /// Equal jitter: `base/2 + random[0, base/2]`.
    ///
    /// Preserves ~75% of the base delay on average.
    Equal,

    /// Decorrelated jitter: random in `[floor, prev × 3]`, capped at `max`.
    ///
    /// Needs the previous delay, which [`RetryState`](crate::RetryState) keeps.
    Decorrelated,
}

impl JitterPolicy {
    /// Applies jitter to `base`.
    ///
    /// `floor` and `max` bound the decorrelated variant; `prev` is the delay
    /// used for the previous retry of the same manifold (if any).
    pub fn apply(
        &self,
        base: Duration,
        floor: Duration,
        prev: Option<Duration>,
        max: Duration,
    ) -> Duration {
        match self {
            JitterPolicy::None => base,
            JitterPolicy::Full => random_between(0, millis(base)),
            JitterPolicy::Equal => {
                let ms = millis(base);
                let half = ms / 2;
                random_between(half, ms)
            }
            JitterPolicy::Decorrelated => {
                let floor_ms = millis(floor.min(max));
                let prev_ms = millis(prev.unwrap_or(base));
                let upper = prev_ms.saturating_mul(3).min(millis(max)).max(floor_ms);
                random_between(floor_ms, upper)
            }
        }
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

fn random_between(low: u64, high: u64) -> Duration {
    if low >= high {
        return Duration::from_millis(low);
    }
    Duration::from_millis(rand::rng().random_range(low..=high))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: Duration = Duration::from_secs(30);

    #[test]
    fn none_is_identity() {
        let d = Duration::from_millis(1234);
        assert_eq!(JitterPolicy::None.apply(d, d, None, MAX), d);
    }

    #[test]
    fn full_stays_below_base() {
        let base = Duration::from_millis(800);
        for _ in 0..100 {
            assert!(JitterPolicy::Full.apply(base, base, None, MAX) <= base);
        }
    }

    #[test]
    fn equal_keeps_half() {
        let base = Duration::from_millis(1000);
        for _ in 0..100 {
            let d = JitterPolicy::Equal.apply(base, base, None, MAX);
            assert!(d >= Duration::from_millis(500));
            assert!(d <= base);
        }
    }

    #[test]
    fn equal_on_zero_is_zero() {
        assert_eq!(
            JitterPolicy::Equal.apply(Duration::ZERO, Duration::ZERO, None, MAX),
            Duration::ZERO
        );
    }

    #[test]
    fn decorrelated_respects_floor_and_cap() {
        let floor = Duration::from_millis(100);
        let prev = Some(Duration::from_secs(20));
        for _ in 0..100 {
            let d = JitterPolicy::Decorrelated.apply(floor, floor, prev, MAX);
            assert!(d >= floor);
            assert!(d <= MAX);
        }
    }
}
