//! # Storage server worker.
//!
//! Binds the listener up front (so bind errors fail the factory, and the
//! bound address is known before dependents start), then serves on a
//! [`WorkerFn`] until killed.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::WorkerError;
use crate::manifold::Worker;
use crate::storage::StorageConfig;
use crate::storage::backend::router;
use crate::storage::error::StorageError;
use crate::workers::WorkerFn;

/// Running storage HTTP server.
pub struct StorageServer {
    addr: SocketAddr,
    worker: WorkerFn,
}

impl StorageServer {
    /// Creates the data directory, binds the listener and starts serving.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn bind(cfg: &StorageConfig) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(&cfg.data_path).await?;

        let address = format!("{}:{}", cfg.address, cfg.port);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StorageError::Bind {
                address: address.clone(),
                source,
            })?;
        let addr = listener.local_addr()?;
        let app = router(cfg.data_path.clone());
        info!(%addr, data_path = %cfg.data_path.display(), "storage server listening");

        let worker = WorkerFn::spawn(move |stop| async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await
                .map_err(WorkerError::fail)
        });
        Ok(Self { addr, worker })
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl Worker for StorageServer {
    fn kill(&self) {
        self.worker.kill();
    }

    async fn wait(&self) -> Result<(), WorkerError> {
        self.worker.wait().await
    }
}
