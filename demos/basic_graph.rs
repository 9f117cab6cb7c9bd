//! # Example: basic_graph
//!
//! Three components wired by name: a config value, a "database" that reads
//! it, and an API that needs the database.
//!
//! ```text
//! config ──► db ──► api
//! ```
//!
//! The API is installed first on purpose: it simply waits until its inputs
//! are running. Press Ctrl-C to stop; the API stops before the database.
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example basic_graph
//! ```

use std::sync::Arc;
use std::time::Duration;

use depvisor::{
    Context, Engine, EngineConfig, LogWriter, Manifold, WorkerError, WorkerFn, output,
    value_manifold,
};
use tracing_subscriber::EnvFilter;

/// Pretend connection pool.
struct Database {
    url: String,
    inner: WorkerFn,
}

#[async_trait::async_trait]
impl depvisor::Worker for Database {
    fn kill(&self) {
        self.inner.kill();
    }

    async fn wait(&self) -> Result<(), WorkerError> {
        self.inner.wait().await
    }
}

fn database() -> Manifold {
    Manifold::new(|ctx: Context| async move {
        let url: String = ctx.get("config")?;
        println!("[db] connecting to {url}");
        Ok::<_, WorkerError>(Database {
            url,
            inner: WorkerFn::spawn(|stop| async move {
                stop.cancelled().await;
                println!("[db] closed");
                Ok(())
            }),
        })
    })
    .with_inputs(["config"])
    .with_output(output::typed(|db: &Database| db.url.clone()))
}

fn api() -> Manifold {
    Manifold::new(|ctx: Context| async move {
        let db: String = ctx.get("db")?;
        Ok::<_, WorkerError>(WorkerFn::spawn(move |stop| async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = tick.tick() => println!("[api] serving with {db}"),
                }
            }
            println!("[api] stopped");
            Ok(())
        }))
    })
    .with_inputs(["db"])
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let engine = Engine::builder(EngineConfig::default())
        .with_subscriber(Arc::new(LogWriter::new()))
        .build()?;
    engine.kill_on_signal();

    engine.install("api", api()).await?;
    engine.install("db", database()).await?;
    engine
        .install("config", value_manifold(String::from("postgres://localhost/app")))
        .await?;

    tokio::time::sleep(Duration::from_millis(3500)).await;
    println!("{:#?}", engine.report().await?);

    engine.kill();
    engine.wait().await?;
    Ok(())
}
