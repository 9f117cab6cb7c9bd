//! # Output adapters.
//!
//! An output adapter exposes a running worker's capability to dependents. It
//! receives the worker as `&dyn Worker` and a [`Destination`] describing the
//! shape the caller of [`Context::get`](crate::Context::get) asked for, and
//! either fills the destination or reports a [`TypeMismatch`].
//!
//! Adapters must be pure extraction: no side effects, no blocking.
//!
//! ```text
//! Context::get::<T>("agent")
//!     └─► Destination(Option<T>) ──► adapter(&dyn Worker, &mut Destination)
//!                                      ├─ worker_as::<W>()  (checked downcast)
//!                                      └─ dest.put(value)   (checked downcast)
//! ```
//!
//! Most manifolds use [`typed`]; adapters serving several shapes can branch on
//! [`Destination::wants`].

use std::any::{Any, type_name};
use std::sync::Arc;

use crate::error::TypeMismatch;
use crate::manifold::worker::Worker;

/// Type-erased output adapter stored in a [`Manifold`](crate::Manifold).
pub type OutputFn =
    Arc<dyn Fn(&dyn Worker, &mut Destination<'_>) -> Result<(), TypeMismatch> + Send + Sync>;

/// The slot a dependent asked to have filled.
pub struct Destination<'a> {
    slot: &'a mut dyn Any,
    wanted: &'static str,
}

impl<'a> Destination<'a> {
    pub(crate) fn new<T: 'static>(slot: &'a mut Option<T>) -> Self {
        Self {
            slot,
            wanted: type_name::<T>(),
        }
    }

    /// Name of the type the caller asked for.
    pub fn wanted(&self) -> &'static str {
        self.wanted
    }

    /// True if the caller asked for a `T`.
    pub fn wants<T: 'static>(&self) -> bool {
        self.slot.is::<Option<T>>()
    }

    /// Fills the slot, failing if the caller asked for something other than `T`.
    pub fn put<T: 'static>(&mut self, value: T) -> Result<(), TypeMismatch> {
        match self.slot.downcast_mut::<Option<T>>() {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(TypeMismatch {
                expected: self.wanted,
                actual: type_name::<T>(),
            }),
        }
    }
}

/// Downcasts a worker to its concrete type `W`, reporting a mismatch otherwise.
pub fn worker_as<W: Worker>(worker: &dyn Worker) -> Result<&W, TypeMismatch> {
    worker.downcast_ref::<W>().ok_or_else(|| TypeMismatch {
        expected: type_name::<W>(),
        actual: worker.concrete_type_name(),
    })
}

/// Builds an adapter that downcasts the worker to `W` and hands out `extract(&W)`.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use depvisor::{Manifold, ValueWorker, output};
///
/// let manifold = Manifold::new(|_ctx| async { Ok(ValueWorker::new(42u32)) })
///     .with_output(output::typed(|w: &ValueWorker<u32>| *w.value()));
/// assert!(manifold.inputs().is_empty());
/// ```
pub fn typed<W, T, F>(
    extract: F,
) -> impl Fn(&dyn Worker, &mut Destination<'_>) -> Result<(), TypeMismatch> + Send + Sync + 'static
where
    W: Worker,
    T: 'static,
    F: Fn(&W) -> T + Send + Sync + 'static,
{
    move |worker: &dyn Worker, dest: &mut Destination<'_>| {
        let worker = worker_as::<W>(worker)?;
        dest.put(extract(worker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use async_trait::async_trait;

    struct Port(u16);

    #[async_trait]
    impl Worker for Port {
        fn kill(&self) {}
        async fn wait(&self) -> Result<(), WorkerError> {
            Ok(())
        }
    }

    #[test]
    fn typed_adapter_fills_matching_slot() {
        let adapter = typed(|w: &Port| w.0);
        let port: &dyn Worker = &Port(8080);
        let mut slot: Option<u16> = None;
        adapter(port, &mut Destination::new(&mut slot)).unwrap();
        assert_eq!(slot, Some(8080));
    }

    #[test]
    fn wrong_destination_is_a_mismatch() {
        let adapter = typed(|w: &Port| w.0);
        let port: &dyn Worker = &Port(8080);
        let mut slot: Option<String> = None;
        let err = adapter(port, &mut Destination::new(&mut slot)).unwrap_err();
        assert_eq!(err.expected, type_name::<String>());
        assert_eq!(err.actual, "u16");
        assert!(slot.is_none());
    }

    #[test]
    fn destination_reports_wanted_shape() {
        let mut slot: Option<u16> = None;
        let dest = Destination::new(&mut slot);
        assert!(dest.wants::<u16>());
        assert!(!dest.wants::<u32>());
        assert_eq!(dest.wanted(), "u16");
    }
}
