#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use depvisor::{
    BackoffPolicy, Engine, EngineConfig, JitterPolicy, Manifold, Phase, Report, Worker,
    WorkerError, WorkerFn, output,
};
use tokio::sync::Notify;
use tokio::time::Instant;

/// Deterministic, fast restart delays.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        min_uptime: Duration::from_secs(60),
        backoff: BackoffPolicy {
            first: Duration::from_millis(10),
            max: Duration::from_millis(50),
            factor: 2.0,
            jitter: JitterPolicy::None,
        },
        bounce_delay: Duration::from_millis(5),
        bus_capacity: 1024,
    }
}

/// Polls the engine report until `pred` holds.
pub async fn wait_for(engine: &Engine, what: &str, pred: impl Fn(&Report) -> bool) -> Report {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let report = engine.report().await.expect("engine is running");
        if pred(&report) {
            return report;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {what}: {report:#?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn phase(report: &Report, name: &str) -> Option<Phase> {
    report.get(name).map(|m| m.phase)
}

pub fn generation(report: &Report, name: &str) -> u64 {
    report.get(name).map_or(0, |m| m.generation)
}

pub fn running(name: &'static str) -> impl Fn(&Report) -> bool {
    move |r| phase(r, name) == Some(Phase::Running)
}

/// Worker exposing a number, failing when its crash signal fires.
pub struct Source {
    pub value: u32,
    inner: WorkerFn,
}

#[async_trait]
impl Worker for Source {
    fn kill(&self) {
        self.inner.kill();
    }

    async fn wait(&self) -> Result<(), WorkerError> {
        self.inner.wait().await
    }
}

/// Input-less manifold whose running worker fails on `crash.notify_one()`.
pub fn crashable(value: u32, crash: Arc<Notify>) -> Manifold {
    Manifold::new(move |_ctx| {
        let crash = Arc::clone(&crash);
        async move {
            Ok::<_, WorkerError>(Source {
                value,
                inner: WorkerFn::spawn(move |stop| async move {
                    tokio::select! {
                        _ = stop.cancelled() => Ok(()),
                        _ = crash.notified() => Err(WorkerError::fail("crashed")),
                    }
                }),
            })
        }
    })
    .with_output(output::typed(|w: &Source| w.value))
}

/// Worker that runs until killed.
pub fn idle() -> WorkerFn {
    WorkerFn::spawn(|stop| async move {
        stop.cancelled().await;
        Ok(())
    })
}
