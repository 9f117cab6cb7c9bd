//! # File-backed HTTP storage.
//!
//! A leaf worker serving a directory over HTTP (see [`router`] for the
//! protocol). Its address and data directory come from an input:
//!
//! ```text
//! "storage-config" (value_manifold(StorageConfig)) ──► "storage" (storage_manifold)
//!                                                          └─► SocketAddr
//! ```
//!
//! Changing the config (reinstalling it under a new generation) restarts the
//! server on the new address.

mod backend;
mod error;
mod server;

pub use backend::router;
pub use error::StorageError;
pub use server::StorageServer;

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::WorkerError;
use crate::manifold::{Context, Manifold, output};

/// Where to store files and where to listen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    /// Root directory of the store; created if missing.
    pub data_path: PathBuf,
    /// IP address or host name to bind.
    pub address: String,
    /// TCP port; `0` picks a free one.
    pub port: u16,
}

/// Manifold running a [`StorageServer`] configured by the `config` input,
/// exposing the bound [`SocketAddr`].
pub fn storage_manifold(config: &str) -> Manifold {
    let input = config.to_string();
    Manifold::new(move |ctx: Context| {
        let input = input.clone();
        async move {
            let cfg: StorageConfig = ctx.get(&input)?;
            StorageServer::bind(&cfg).await.map_err(WorkerError::fail)
        }
    })
    .with_inputs([config])
    .with_output(output::typed(|w: &StorageServer| w.local_addr()))
}
