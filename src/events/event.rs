//! # Runtime events emitted by the engine.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Registry events**: manifolds entering or leaving the graph
//! - **Worker lifecycle events**: starting, started, stopping, stopped, failed
//! - **Scheduling events**: missing dependencies, backoff
//! - **Engine events**: shutdown, subscriber health
//!
//! The [`Event`] struct carries the metadata: timestamp, manifold name,
//! generation, delay and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. The control loop publishes from a single task, so events
//! about the graph arrive in the order they were applied.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use depvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_manifold("api-caller")
//!     .with_reason("connection refused")
//!     .with_delay(Duration::from_secs(3));
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.manifold.as_deref(), Some("api-caller"));
//! assert_eq!(ev.delay_ms, Some(3000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registry events ===
    /// A manifold was accepted into the graph.
    ///
    /// Sets: `manifold`.
    ManifoldInstalled,

    /// A manifold asked to be removed and its worker has exited.
    ///
    /// Sets: `manifold`.
    ManifoldUninstalled,

    // === Worker lifecycle ===
    /// The factory was spawned with a fresh context.
    ///
    /// Sets: `manifold`.
    WorkerStarting,

    /// The factory returned a worker; the manifold's generation advanced.
    ///
    /// Sets: `manifold`, `generation`.
    WorkerStarted,

    /// The engine signalled the worker to stop.
    ///
    /// Sets: `manifold`, `generation`, `reason` (why it is being stopped).
    WorkerStopping,

    /// The worker exited without an error.
    ///
    /// Sets: `manifold`, `generation`.
    WorkerStopped,

    /// The factory or worker failed.
    ///
    /// Sets: `manifold`, `reason`, `generation` (if a worker had started).
    WorkerFailed,

    // === Scheduling ===
    /// The factory or worker reported a missing dependency.
    ///
    /// Sets: `manifold`, `reason`.
    DependencyMissing,

    /// A restart was scheduled after a failure (or a bounce).
    ///
    /// Sets: `manifold`, `delay_ms`, `reason`.
    BackoffScheduled,

    // === Engine ===
    /// Shutdown was requested.
    ShutdownRequested,

    /// Every worker has exited; the control loop is about to finish.
    AllStopped,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `manifold` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `manifold` (subscriber name), `reason`.
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Manifold (or subscriber) name, if applicable.
    pub manifold: Option<Arc<str>>,
    /// Generation of the manifold's worker, if applicable.
    pub generation: Option<u64>,
    /// Delay before the next start in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, stop causes, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            manifold: None,
            generation: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a manifold name.
    #[inline]
    pub fn with_manifold(mut self, name: impl Into<Arc<str>>) -> Self {
        self.manifold = Some(name.into());
        self
    }

    /// Attaches a worker generation.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_manifold(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_manifold(subscriber)
            .with_reason(info)
    }
}
