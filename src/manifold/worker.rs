//! # Worker abstraction.
//!
//! A [`Worker`] is the opaque runtime object a manifold's factory returns. The
//! engine only ever uses two operations on it:
//! - [`Worker::kill`]: idempotent, non-blocking stop signal;
//! - [`Worker::wait`]: resolves once the worker has fully stopped, with its final result.
//!
//! Everything else a worker offers is reached by dependents through the
//! manifold's output adapter, which downcasts the worker to its concrete type
//! via [`dyn Worker::downcast_ref`](trait.Worker.html#method.downcast_ref).

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WorkerError;

/// Shared handle to a running worker.
pub type WorkerRef = Arc<dyn Worker>;

/// Access to the concrete type behind a `dyn Worker`.
///
/// Implemented for every `Send + Sync + 'static` type; never implement it by hand.
pub trait AsAny: Any + Send + Sync {
    /// The worker as `&dyn Any`, for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Name of the concrete type, for mismatch diagnostics.
    fn concrete_type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn concrete_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// # A running component.
///
/// ### Contract
/// - `kill` must not block and may be called any number of times.
/// - `wait` may be awaited concurrently by several callers; each sees the same
///   final result.
/// - A worker should exit in bounded time after `kill`; the engine never
///   forces termination, so a worker ignoring `kill` makes shutdown hang.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use depvisor::{Worker, WorkerError};
///
/// struct Idle {
///     stop: CancellationToken,
/// }
///
/// #[async_trait]
/// impl Worker for Idle {
///     fn kill(&self) {
///         self.stop.cancel();
///     }
///
///     async fn wait(&self) -> Result<(), WorkerError> {
///         self.stop.cancelled().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: AsAny {
    /// Signals the worker to stop. Idempotent and non-blocking.
    fn kill(&self);

    /// Waits for the worker to finish and returns its final result.
    async fn wait(&self) -> Result<(), WorkerError>;
}

impl<'a> dyn Worker + 'a {
    /// Returns the concrete worker if it is a `W`.
    pub fn downcast_ref<W: Worker>(&self) -> Option<&W> {
        self.as_any().downcast_ref::<W>()
    }

    /// True if the concrete worker is a `W`.
    pub fn is<W: Worker>(&self) -> bool {
        self.as_any().is::<W>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl Worker for Noop {
        fn kill(&self) {}
        async fn wait(&self) -> Result<(), WorkerError> {
            Ok(())
        }
    }

    struct Other;

    #[async_trait]
    impl Worker for Other {
        fn kill(&self) {}
        async fn wait(&self) -> Result<(), WorkerError> {
            Ok(())
        }
    }

    #[test]
    fn downcast_through_shared_handle() {
        let w: WorkerRef = Arc::new(Noop);
        assert!(w.is::<Noop>());
        assert!(w.downcast_ref::<Other>().is_none());
        let inner: &dyn Worker = w.as_ref();
        assert!(inner.concrete_type_name().ends_with("Noop"));
    }
}
