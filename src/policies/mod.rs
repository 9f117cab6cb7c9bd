//! Retry policies.
//!
//! This module groups the knobs that control **how long** the engine waits
//! before restarting a manifold whose worker failed.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid thundering herd
//! - [`RetryState`]    per-manifold failure bookkeeping (owned by the control loop)
//!
//! ## Quick wiring
//! ```text
//! EngineConfig { backoff: BackoffPolicy, min_uptime: Duration, .. }
//!      └─► control loop, on worker failure:
//!           - retry.record_failure(&backoff, uptime, min_uptime) → delay
//!           - park the manifold in Backoff until `now + delay`
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=3s, factor=1.2, max=2min, jitter=Equal.
//! - `JitterPolicy::Equal` keeps at least half of each base delay.

mod backoff;
mod jitter;

pub use backoff::{BackoffPolicy, RetryState};
pub use jitter::JitterPolicy;
