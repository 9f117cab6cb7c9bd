//! # Example: dynamic_install
//!
//! Manifolds can be installed at any time, and a worker can remove its own
//! manifold by exiting with [`WorkerError::Uninstall`]. Cycles are rejected
//! at install time.
//!
//! ## Run
//! ```bash
//! cargo run --example dynamic_install
//! ```

use std::time::Duration;

use depvisor::{Context, Engine, EngineConfig, InstallError, Manifold, WorkerError, WorkerFn};

fn stage(inputs: &'static [&'static str]) -> Manifold {
    Manifold::new(|ctx: Context| async move {
        let name = ctx.name().to_string();
        Ok::<_, WorkerError>(WorkerFn::spawn(move |stop| async move {
            println!("[{name}] up");
            stop.cancelled().await;
            Ok(())
        }))
    })
    .with_inputs(inputs.iter().copied())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::new(EngineConfig::default())?;

    engine.install("ingest", stage(&[])).await?;
    engine.install("parse", stage(&["ingest"])).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    engine.install("store", stage(&["parse"])).await?;

    let attempts: [(&str, &'static [&'static str]); 2] =
        [("parse", &["store"]), ("echo", &["echo"])];
    for (name, inputs) in attempts {
        match engine.install(name, stage(inputs)).await {
            Err(err @ InstallError::DuplicateName { .. }) => println!("[main] duplicate: {err}"),
            Err(err @ InstallError::CycleDetected { .. }) => println!("[main] cycle: {err}"),
            Err(err) => return Err(err.into()),
            Ok(()) => println!("[main] {name} installed"),
        }
    }

    engine
        .install(
            "migration",
            Manifold::new(|_ctx| async {
                Ok::<_, WorkerError>(WorkerFn::spawn(|_stop| async {
                    println!("[migration] done, removing myself");
                    Err(WorkerError::Uninstall)
                }))
            }),
        )
        .await?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    let report = engine.report().await?;
    println!("[main] installed: {:?}", report.manifolds.keys().collect::<Vec<_>>());

    engine.kill();
    engine.wait().await?;
    Ok(())
}
