//! # Engine configuration.
//!
//! Provides [`EngineConfig`], the settings for one [`Engine`](crate::Engine).
//!
//! All fields are public. Use [`EngineConfig::validate`] (called by the
//! builder) to reject values the control loop cannot work with.

use std::time::Duration;

use crate::error::EngineError;
use crate::policies::BackoffPolicy;

/// Configuration for one engine.
///
/// ## Field semantics
/// - `min_uptime`: a worker that ran at least this long before failing
///   restarts with the initial backoff delay again
/// - `backoff`: restart delay growth after consecutive failures; `backoff.max`
///   caps every delay
/// - `bounce_delay`: delay before restarting a worker that asked to bounce
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Uptime after which the failure counter resets.
    pub min_uptime: Duration,

    /// Restart backoff after failures.
    pub backoff: BackoffPolicy,

    /// Delay before restarting a bounced worker.
    pub bounce_delay: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Receivers lagging more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,
}

impl EngineConfig {
    /// Maximum delay between restarts.
    #[inline]
    pub fn max_backoff_delay(&self) -> Duration {
        self.backoff.max
    }

    /// Returns the config with a different maximum restart delay.
    pub fn with_max_backoff_delay(mut self, max: Duration) -> Self {
        self.backoff.max = max;
        self
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Checks that the configuration is usable.
    ///
    /// ### Errors
    /// [`EngineError::InvalidConfig`] if the backoff factor is not a finite
    /// number `>= 1.0`, or if `backoff.max` is zero.
    pub fn validate(&self) -> Result<(), EngineError> {
        let factor = self.backoff.factor;
        if !factor.is_finite() || factor < 1.0 {
            return Err(EngineError::InvalidConfig {
                reason: format!("backoff factor must be finite and >= 1.0, got {factor}"),
            });
        }
        if self.backoff.max.is_zero() {
            return Err(EngineError::InvalidConfig {
                reason: "maximum backoff delay must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `min_uptime = 60s`
    /// - `backoff = BackoffPolicy::default()` (3s, ×1.2, max 2min, equal jitter)
    /// - `bounce_delay = 10ms`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            min_uptime: Duration::from_secs(60),
            backoff: BackoffPolicy::default(),
            bounce_delay: Duration::from_millis(10),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_backoff_delay(), Duration::from_secs(120));
    }

    #[test]
    fn shrinking_factor_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.backoff.factor = 0.5;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.as_label(), "engine_invalid_config");

        cfg.backoff.factor = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_max_is_rejected() {
        let cfg = EngineConfig::default().with_max_backoff_delay(Duration::ZERO);
        assert!(cfg.validate().is_err());
    }
}
