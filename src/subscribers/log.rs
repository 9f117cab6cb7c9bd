//! # LogWriter: engine events rendered through `tracing`.
//!
//! Everything the control loop already logs itself (failures, restart
//! delays, missing dependencies) is rendered at `debug`, so each failure
//! shows up once at `warn` or above. Worker transitions are `debug`, engine
//! milestones `info` and subscriber trouble `error`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG depvisor: worker started manifold="agent" generation=1
//! DEBUG depvisor: worker failed manifold="api-caller" reason="connection refused"
//! DEBUG depvisor: restart scheduled manifold="api-caller" delay_ms=3000
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that forwards every event to `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let manifold = e.manifold.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::ManifoldInstalled => debug!(manifold, "manifold installed"),
            EventKind::ManifoldUninstalled => info!(manifold, "manifold uninstalled"),
            EventKind::WorkerStarting => debug!(manifold, "worker starting"),
            EventKind::WorkerStarted => {
                debug!(manifold, generation = ?e.generation, "worker started")
            }
            EventKind::WorkerStopping => {
                debug!(manifold, generation = ?e.generation, reason, "worker stopping")
            }
            EventKind::WorkerStopped => {
                debug!(manifold, generation = ?e.generation, "worker stopped")
            }
            EventKind::WorkerFailed => debug!(manifold, reason, "worker failed"),
            EventKind::DependencyMissing => debug!(manifold, reason, "dependency missing"),
            EventKind::BackoffScheduled => {
                debug!(manifold, delay_ms = ?e.delay_ms, reason, "restart scheduled")
            }
            EventKind::ShutdownRequested => info!("shutdown requested"),
            EventKind::AllStopped => info!("all workers stopped"),
            EventKind::SubscriberOverflow => {
                error!(subscriber = manifold, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                error!(subscriber = manifold, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn render_at_warn(events: &[Event]) -> String {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            for ev in events {
                futures::executor::block_on(LogWriter::new().on_event(ev));
            }
        });
        let bytes = out.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn failures_are_not_repeated_above_debug() {
        let failed = Event::new(EventKind::WorkerFailed)
            .with_manifold("api")
            .with_reason("connection refused");
        let backoff = Event::new(EventKind::BackoffScheduled)
            .with_manifold("api")
            .with_delay(Duration::from_millis(30))
            .with_reason("connection refused");

        assert_eq!(render_at_warn(&[failed, backoff]), "");
    }

    #[test]
    fn subscriber_trouble_is_an_error() {
        let out = render_at_warn(&[Event::subscriber_panicked("metrics", "boom".into())]);
        assert!(out.contains("subscriber panicked"));
        assert!(out.contains("metrics"));
    }
}
