//! # Graph building blocks.
//!
//! - [`Worker`] the running component contract (`kill` + `wait`);
//! - [`Manifold`] declared inputs, start factory, output adapter, filter;
//! - [`Context`] generation-bound access to inputs during a start;
//! - [`output`] helpers for writing output adapters.

mod context;
#[allow(clippy::module_inception)]
mod manifold;
pub mod output;
mod worker;

pub(crate) use context::Resource;
pub use context::Context;
pub use manifold::{FilterFn, Manifold, StartFn, StartFuture};
pub use output::{Destination, OutputFn};
pub use worker::{AsAny, Worker, WorkerRef};
