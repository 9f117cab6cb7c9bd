//! # Example: retry_with_backoff
//!
//! A flaky worker fails three times, then stays up. Restart delays grow
//! by `factor` up to `max`, with jitter disabled so the numbers are exact.
//!
//! ## Run
//! ```bash
//! cargo run --example retry_with_backoff
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use depvisor::{
    BackoffPolicy, Engine, EngineConfig, EventKind, JitterPolicy, Manifold, Phase, WorkerError,
    WorkerFn,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = EngineConfig {
        backoff: BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_millis(400),
            factor: 2.0,
            jitter: JitterPolicy::None,
        },
        ..EngineConfig::default()
    };
    let engine = Engine::new(cfg)?;

    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(ev) = events.recv().await {
            match ev.kind {
                EventKind::WorkerFailed => println!(
                    "[events] failed: {}",
                    ev.reason.as_deref().unwrap_or("<none>")
                ),
                EventKind::BackoffScheduled => {
                    println!("[events] retry in {}ms", ev.delay_ms.unwrap_or(0))
                }
                EventKind::WorkerStarted => println!(
                    "[events] started, generation {}",
                    ev.generation.unwrap_or(0)
                ),
                _ => {}
            }
        }
    });

    let attempts = Arc::new(AtomicU32::new(0));
    engine
        .install(
            "flaky",
            Manifold::new(move |_ctx| {
                let attempts = Arc::clone(&attempts);
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok::<_, WorkerError>(WorkerFn::spawn(move |stop| async move {
                        if n <= 3 {
                            return Err(WorkerError::fail(format!("attempt {n} failed")));
                        }
                        stop.cancelled().await;
                        Ok(())
                    }))
                }
            }),
        )
        .await?;

    loop {
        let report = engine.report().await?;
        if report.get("flaky").is_some_and(|m| m.phase == Phase::Running) {
            println!("[main] up after {} attempts", report.get("flaky").map_or(0, |m| m.attempts));
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    engine.kill();
    engine.wait().await?;
    Ok(())
}
