//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for plugging custom event handlers
//! (metrics, audit trails, alerting) into the engine.
//!
//! Each subscriber gets a dedicated worker task, a bounded queue
//! ([`Subscribe::queue_capacity`]) and panic isolation: a panic is caught and
//! reported as `EventKind::SubscriberPanicked`.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use depvisor::{Event, EventKind, Subscribe};
//!
//! struct Restarts;
//!
//! #[async_trait]
//! impl Subscribe for Restarts {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::BackoffScheduled) {
//!             // bump a restart counter, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "restarts" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for engine observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing affects only this subscriber's queue.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event, in FIFO order per subscriber.
    async fn on_event(&self, event: &Event);

    /// Subscriber name used in overflow/panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
