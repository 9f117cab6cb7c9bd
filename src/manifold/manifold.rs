//! # Manifold: the declarative description of one node in the graph.
//!
//! A [`Manifold`] bundles:
//! - the ordered, de-duplicated list of input names it depends on;
//! - a start factory `Fn(Context) -> Future<Output = Result<W, WorkerError>>`;
//! - an optional output adapter exposing the worker to dependents;
//! - an optional error filter applied to the worker's final result.
//!
//! Manifolds are immutable after installation. Each start produces a fresh
//! future, so there is no hidden state shared between restarts; put shared
//! state behind an explicit `Arc` inside the closure if you need it.
//!
//! ## Example
//! ```rust
//! use depvisor::{Context, Manifold, ValueWorker, WorkerError, output};
//!
//! let api = Manifold::new(|ctx: Context| async move {
//!     let port: u16 = ctx.get("config")?;
//!     Ok::<_, WorkerError>(ValueWorker::new(format!("0.0.0.0:{port}")))
//! })
//! .with_inputs(["config", "config"])
//! .with_output(output::typed(|w: &ValueWorker<String>| w.value().clone()));
//!
//! assert_eq!(api.inputs(), ["config".to_string()]);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::{TypeMismatch, WorkerError};
use crate::manifold::context::Context;
use crate::manifold::output::{Destination, OutputFn};
use crate::manifold::worker::{Worker, WorkerRef};

/// Future returned by a type-erased start factory.
pub type StartFuture = BoxFuture<'static, Result<WorkerRef, WorkerError>>;

/// Type-erased start factory.
pub type StartFn = Arc<dyn Fn(Context) -> StartFuture + Send + Sync>;

/// Error filter: maps the worker's final error, `None` suppresses it.
pub type FilterFn = Arc<dyn Fn(WorkerError) -> Option<WorkerError> + Send + Sync>;

/// Declarative node description: inputs, factory, output adapter, filter.
#[derive(Clone)]
pub struct Manifold {
    inputs: Vec<String>,
    start: StartFn,
    output: Option<OutputFn>,
    filter: Option<FilterFn>,
}

impl Manifold {
    /// Creates a manifold with no inputs, no output and no filter.
    pub fn new<F, Fut, W>(start: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<W, WorkerError>> + Send + 'static,
        W: Worker,
    {
        let start: StartFn = Arc::new(move |ctx| {
            start(ctx)
                .map(|res| res.map(|w| Arc::new(w) as WorkerRef))
                .boxed()
        });
        Self {
            inputs: Vec::new(),
            start,
            output: None,
            filter: None,
        }
    }

    /// Sets the declared inputs. Order is kept; duplicates are dropped.
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.clear();
        for input in inputs {
            let input = input.into();
            if !self.inputs.contains(&input) {
                self.inputs.push(input);
            }
        }
        self
    }

    /// Sets the output adapter.
    pub fn with_output<F>(mut self, output: F) -> Self
    where
        F: Fn(&dyn Worker, &mut Destination<'_>) -> Result<(), TypeMismatch>
            + Send
            + Sync
            + 'static,
    {
        self.output = Some(Arc::new(output));
        self
    }

    /// Sets the error filter applied to the worker's final error.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(WorkerError) -> Option<WorkerError> + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Declared input names, in declaration order.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// True if an output adapter is set.
    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    pub(crate) fn start(&self, ctx: Context) -> StartFuture {
        (self.start)(ctx)
    }

    pub(crate) fn output(&self) -> Option<&OutputFn> {
        self.output.as_ref()
    }

    /// Applies the filter to a worker's final result.
    pub(crate) fn filter(&self, result: Result<(), WorkerError>) -> Result<(), WorkerError> {
        match (result, &self.filter) {
            (Err(err), Some(filter)) => filter(err).map_or(Ok(()), Err),
            (result, _) => result,
        }
    }
}

impl fmt::Debug for Manifold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manifold")
            .field("inputs", &self.inputs)
            .field("output", &self.output.is_some())
            .field("filter", &self.filter.is_some())
            .finish()
    }
}
