//! # Example: storage_server
//!
//! Serves a directory over HTTP until Ctrl-C.
//!
//! ```bash
//! RUST_LOG=info cargo run --example storage_server -- /tmp/depvisor-store 8040
//! curl -X PUT --data-binary @Cargo.toml localhost:8040/docs/Cargo.toml
//! curl localhost:8040/docs/*
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use depvisor::storage::{StorageConfig, storage_manifold};
use depvisor::{Context, Engine, EngineConfig, LogWriter, Manifold, WorkerError, WorkerFn, value_manifold};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let data_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("depvisor-store"));
    let port = args.next().map(|p| p.parse()).transpose()?.unwrap_or(8040);

    let engine = Engine::builder(EngineConfig::default())
        .with_subscriber(Arc::new(LogWriter::new()))
        .build()?;
    engine.kill_on_signal();

    engine
        .install(
            "storage-config",
            value_manifold(StorageConfig {
                data_path,
                address: "127.0.0.1".into(),
                port,
            }),
        )
        .await?;
    engine
        .install("storage", storage_manifold("storage-config"))
        .await?;
    engine
        .install(
            "announce",
            Manifold::new(|ctx: Context| async move {
                let addr: SocketAddr = ctx.get("storage")?;
                println!("storage listening on http://{addr}");
                Ok::<_, WorkerError>(WorkerFn::spawn(|stop| async move {
                    stop.cancelled().await;
                    Ok(())
                }))
            })
            .with_inputs(["storage"]),
        )
        .await?;

    engine.wait().await?;
    Ok(())
}
