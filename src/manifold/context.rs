//! # Factory context.
//!
//! A [`Context`] is minted by the control loop for exactly one factory
//! invocation. It carries:
//! - a snapshot of the declared inputs' live workers, each stamped with the
//!   generation it had when the factory was spawned;
//! - the run's cancellation token, which is also the context's validity flag.
//!
//! ## Rules
//! - The snapshot never changes: every `get` observes the same consistent view
//!   of "who is running, at which generation".
//! - Once the engine signals the owning worker to stop (an input restarted or
//!   went away, or the engine is shutting down), the token is cancelled and
//!   every `get` returns [`DependencyError::Missing`]. A stale capability is
//!   never handed out.
//! - Asking for an undeclared input is reported as `Missing` too, and logged.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::DependencyError;
use crate::manifold::output::{Destination, OutputFn};
use crate::manifold::worker::WorkerRef;

/// One input as seen by a context.
#[derive(Clone)]
pub(crate) struct Resource {
    pub(crate) worker: WorkerRef,
    pub(crate) generation: u64,
    pub(crate) output: Option<OutputFn>,
}

/// Generation-bound handle used by a starting worker to resolve its inputs.
#[derive(Clone)]
pub struct Context {
    name: Arc<str>,
    declared: Arc<[String]>,
    resources: Arc<HashMap<String, Resource>>,
    token: CancellationToken,
}

impl Context {
    pub(crate) fn new(
        name: Arc<str>,
        declared: Arc<[String]>,
        resources: HashMap<String, Resource>,
        token: CancellationToken,
    ) -> Self {
        Self {
            name,
            declared,
            resources: Arc::new(resources),
            token,
        }
    }

    /// Name of the manifold this context was minted for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves the capability exposed by input `name` as a `T`.
    ///
    /// ### Errors
    /// - [`DependencyError::Missing`] if the input is not running, not declared,
    ///   or this context has been invalidated;
    /// - [`DependencyError::TypeMismatch`] if the input's output adapter cannot
    ///   produce a `T` (or the input has no output adapter at all).
    pub fn get<T: 'static>(&self, name: &str) -> Result<T, DependencyError> {
        let resource = self.resource(name)?;
        let mismatch = |mismatch| DependencyError::TypeMismatch {
            name: name.to_string(),
            mismatch,
        };

        let Some(output) = resource.output.as_ref() else {
            return Err(mismatch(crate::error::TypeMismatch {
                expected: std::any::type_name::<T>(),
                actual: "<no output>",
            }));
        };

        let mut slot: Option<T> = None;
        output(resource.worker.as_ref(), &mut Destination::new(&mut slot)).map_err(mismatch)?;
        slot.ok_or_else(|| DependencyError::Missing {
            name: name.to_string(),
        })
    }

    /// Checks that input `name` is running, without extracting anything.
    pub fn require(&self, name: &str) -> Result<(), DependencyError> {
        self.resource(name).map(|_| ())
    }

    /// Generation of input `name` captured in this context's snapshot.
    pub fn generation_of(&self, name: &str) -> Option<u64> {
        self.resources.get(name).map(|r| r.generation)
    }

    /// False once the owning worker has been signalled to stop.
    pub fn is_valid(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Resolves when the owning worker is signalled to stop.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// The run's stop token; cancelled together with this context.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    fn resource(&self, name: &str) -> Result<&Resource, DependencyError> {
        let missing = || DependencyError::Missing {
            name: name.to_string(),
        };
        if self.token.is_cancelled() {
            return Err(missing());
        }
        if !self.declared.iter().any(|d| d == name) {
            warn!(manifold = %self.name, input = name, "requested undeclared input");
            return Err(missing());
        }
        self.resources.get(name).ok_or_else(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::output;
    use crate::workers::ValueWorker;

    fn context(token: CancellationToken) -> Context {
        let mut resources = HashMap::new();
        resources.insert(
            "config".to_string(),
            Resource {
                worker: Arc::new(ValueWorker::new(7u32)),
                generation: 3,
                output: Some(Arc::new(output::typed(|w: &ValueWorker<u32>| *w.value()))),
            },
        );
        resources.insert(
            "bare".to_string(),
            Resource {
                worker: Arc::new(ValueWorker::new(())),
                generation: 1,
                output: None,
            },
        );
        Context::new(
            Arc::from("consumer"),
            Arc::from(vec![
                "config".to_string(),
                "bare".to_string(),
                "later".to_string(),
            ]),
            resources,
            token,
        )
    }

    #[test]
    fn resolves_declared_running_input() {
        let ctx = context(CancellationToken::new());
        assert_eq!(ctx.get::<u32>("config"), Ok(7));
        assert_eq!(ctx.generation_of("config"), Some(3));
        assert!(ctx.require("bare").is_ok());
    }

    #[test]
    fn absent_and_undeclared_inputs_are_missing() {
        let ctx = context(CancellationToken::new());
        assert!(ctx.get::<u32>("later").unwrap_err().is_missing());
        assert!(ctx.get::<u32>("stranger").unwrap_err().is_missing());
    }

    #[test]
    fn wrong_shape_is_a_type_mismatch() {
        let ctx = context(CancellationToken::new());
        let err = ctx.get::<String>("config").unwrap_err();
        assert_eq!(err.as_label(), "dependency_type_mismatch");

        let err = ctx.get::<u32>("bare").unwrap_err();
        assert_eq!(err.as_label(), "dependency_type_mismatch");
    }

    #[test]
    fn invalidated_context_yields_missing() {
        let token = CancellationToken::new();
        let ctx = context(token.clone());
        token.cancel();
        assert!(!ctx.is_valid());
        assert_eq!(
            ctx.get::<u32>("config"),
            Err(DependencyError::Missing {
                name: "config".into()
            })
        );
    }
}
