//! # Example: custom_subscriber
//!
//! Implements [`Subscribe`] to count restarts per manifold, the kind of thing
//! you would export as a metric.
//!
//! ## Flow
//! ```text
//! ControlLoop ──► Bus ──► fan-out ──► SubscriberSet ──► RestartCounter::on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use depvisor::{Engine, EngineConfig, Event, EventKind, Manifold, Subscribe, WorkerError, WorkerFn};

/// Counts `WorkerStarted` events by manifold.
#[derive(Default)]
struct RestartCounter {
    starts: Mutex<HashMap<String, u64>>,
}

#[async_trait::async_trait]
impl Subscribe for RestartCounter {
    async fn on_event(&self, ev: &Event) {
        let name = ev.manifold.as_deref().unwrap_or("<unknown>");
        match ev.kind {
            EventKind::WorkerStarted => {
                let mut starts = self.starts.lock().unwrap_or_else(|e| e.into_inner());
                *starts.entry(name.to_string()).or_default() += 1;
            }
            EventKind::WorkerFailed => {
                println!(
                    "[sub] {name} failed: {}",
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::AllStopped => {
                let starts = self.starts.lock().unwrap_or_else(|e| e.into_inner());
                println!("[sub] starts per manifold: {starts:?}");
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "restart-counter"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::builder(EngineConfig::default())
        .with_subscriber(Arc::new(RestartCounter::default()))
        .build()?;

    engine
        .install(
            "heartbeat",
            Manifold::new(|_ctx| async {
                Ok::<_, WorkerError>(WorkerFn::spawn(|stop| async move {
                    tokio::select! {
                        _ = stop.cancelled() => Ok(()),
                        _ = tokio::time::sleep(Duration::from_millis(200)) => {
                            Err(WorkerError::fail("missed a beat"))
                        }
                    }
                }))
            }),
        )
        .await?;

    tokio::time::sleep(Duration::from_secs(8)).await;
    engine.kill();
    engine.wait().await?;
    Ok(())
}
