//! Ready-made workers.
//!
//! - [`ValueWorker`] / [`value_manifold`]: expose a plain value;
//! - [`WorkerFn`]: run an async closure until killed.

mod value;
mod worker_fn;

pub use value::{ValueWorker, value_manifold};
pub use worker_fn::WorkerFn;
