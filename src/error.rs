//! Error types used by the engine, manifolds and workers.
//!
//! - [`InstallError`]: rejected [`Engine::install`](crate::Engine::install) calls (permanent).
//! - [`DependencyError`]: failed [`Context::get`](crate::Context::get) resolutions.
//! - [`WorkerError`]: how a factory or a running worker reports its exit.
//! - [`EngineError`]: errors surfaced by the engine itself ([`Engine::wait`](crate::Engine::wait)).
//!
//! Every enum provides `as_label` (stable snake_case label for logs/metrics),
//! following the same convention across the crate.

use std::fmt;

use thiserror::Error;

/// # Errors returned when registering a manifold.
///
/// Both structural variants are permanent configuration defects: retrying the
/// same install will fail the same way.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    /// A manifold with this name is already installed.
    #[error("manifold {name:?} already installed")]
    DuplicateName {
        /// Rejected name.
        name: String,
    },

    /// The manifold's inputs would close a cycle in the dependency graph.
    #[error("installing {name:?} would create a dependency cycle through {member:?} ({})", cycle.join(" -> "))]
    CycleDetected {
        /// Name that was being installed.
        name: String,
        /// A concrete member of the detected cycle.
        member: String,
        /// The cycle path, first element repeated at the end.
        cycle: Vec<String>,
    },

    /// The engine is shutting down (or gone) and no longer accepts manifolds.
    #[error("engine is not accepting installs")]
    EngineStopped,
}

impl InstallError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use depvisor::InstallError;
    ///
    /// let err = InstallError::DuplicateName { name: "agent".into() };
    /// assert_eq!(err.as_label(), "install_duplicate_name");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            InstallError::DuplicateName { .. } => "install_duplicate_name",
            InstallError::CycleDetected { .. } => "install_cycle_detected",
            InstallError::EngineStopped => "install_engine_stopped",
        }
    }
}

/// Shape mismatch reported by an output adapter.
///
/// Carries the type names on both sides so operators can see which wiring is wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected}, got {actual}")]
pub struct TypeMismatch {
    /// Type the adapter (or caller) expected.
    pub expected: &'static str,
    /// Type that was actually supplied.
    pub actual: &'static str,
}

/// # Errors produced by [`Context::get`](crate::Context::get).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// The dependency is not currently available. Always transient.
    #[error("dependency {name:?} not available")]
    Missing {
        /// Requested manifold name.
        name: String,
    },

    /// The dependency is running, but it does not provide the requested shape.
    ///
    /// This is a wiring defect, not a readiness problem: it will not fix itself.
    #[error("dependency {name:?} type mismatch: {mismatch}")]
    TypeMismatch {
        /// Requested manifold name.
        name: String,
        /// What the adapter reported.
        mismatch: TypeMismatch,
    },
}

impl DependencyError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DependencyError::Missing { .. } => "dependency_missing",
            DependencyError::TypeMismatch { .. } => "dependency_type_mismatch",
        }
    }

    /// True for the transient [`DependencyError::Missing`] case.
    pub fn is_missing(&self) -> bool {
        matches!(self, DependencyError::Missing { .. })
    }
}

/// # Exit reasons reported by factories and workers.
///
/// The engine classifies a worker's final result by variant:
/// - `Ok(())`: voluntary completion, not restarted;
/// - [`WorkerError::Missing`]: parked until an input changes, never a failure;
/// - [`WorkerError::Bounce`]: restarted after a short delay, never a failure;
/// - [`WorkerError::Uninstall`]: manifold removed from the engine;
/// - [`WorkerError::Fatal`]: the whole engine shuts down;
/// - [`WorkerError::Wiring`]: permanent defect, never retried;
/// - [`WorkerError::Fail`]: retried with backoff.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// A dependency was not available.
    #[error("dependency not available: {reason}")]
    Missing {
        /// What was missing.
        reason: String,
    },

    /// Restart this manifold without counting a failure.
    #[error("bounce requested")]
    Bounce,

    /// Remove this manifold from the engine.
    #[error("uninstall requested")]
    Uninstall,

    /// Non-recoverable error: stops the engine.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Execution failed but may succeed if retried.
    #[error("worker failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// A dependency was wired with the wrong capability shape.
    #[error("wiring defect: {0}")]
    Wiring(DependencyError),
}

impl WorkerError {
    /// Builds a retryable failure from anything printable.
    pub fn fail(error: impl fmt::Display) -> Self {
        WorkerError::Fail {
            error: error.to_string(),
        }
    }

    /// Builds a fatal error from anything printable.
    pub fn fatal(error: impl fmt::Display) -> Self {
        WorkerError::Fatal {
            error: error.to_string(),
        }
    }

    /// Builds the missing-dependency sentinel.
    pub fn missing(reason: impl fmt::Display) -> Self {
        WorkerError::Missing {
            reason: reason.to_string(),
        }
    }

    /// True for the missing-dependency sentinel.
    pub fn is_missing(&self) -> bool {
        matches!(self, WorkerError::Missing { .. })
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use depvisor::WorkerError;
    ///
    /// assert_eq!(WorkerError::fail("boom").as_label(), "worker_failed");
    /// assert_eq!(WorkerError::Bounce.as_label(), "worker_bounce");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Missing { .. } => "worker_missing",
            WorkerError::Bounce => "worker_bounce",
            WorkerError::Uninstall => "worker_uninstall",
            WorkerError::Fatal { .. } => "worker_fatal",
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Wiring(_) => "worker_wiring",
        }
    }
}

impl From<DependencyError> for WorkerError {
    fn from(err: DependencyError) -> Self {
        match err {
            DependencyError::Missing { name } => WorkerError::Missing { reason: name },
            other => WorkerError::Wiring(other),
        }
    }
}

/// # Errors produced by the engine itself.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A worker exited with [`WorkerError::Fatal`] and the engine shut down.
    #[error("manifold {manifold:?} failed fatally: {error}")]
    Fatal {
        /// Manifold whose worker failed.
        manifold: String,
        /// Fatal error message.
        error: String,
    },

    /// The engine's control loop is gone; the request could not be served.
    #[error("engine stopped")]
    Stopped,

    /// [`EngineConfig::validate`](crate::EngineConfig::validate) rejected the configuration.
    #[error("invalid engine config: {reason}")]
    InvalidConfig {
        /// Why the configuration is invalid.
        reason: String,
    },
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::Fatal { .. } => "engine_fatal",
            EngineError::Stopped => "engine_stopped",
            EngineError::InvalidConfig { .. } => "engine_invalid_config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_errors_map_to_worker_errors() {
        let missing: WorkerError = DependencyError::Missing { name: "agent".into() }.into();
        assert!(missing.is_missing());

        let wiring: WorkerError = DependencyError::TypeMismatch {
            name: "agent".into(),
            mismatch: TypeMismatch {
                expected: "u32",
                actual: "String",
            },
        }
        .into();
        assert_eq!(wiring.as_label(), "worker_wiring");
        assert!(!wiring.is_missing());
    }

    #[test]
    fn cycle_error_names_the_path() {
        let err = InstallError::CycleDetected {
            name: "c".into(),
            member: "a".into(),
            cycle: vec!["a".into(), "c".into(), "a".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("\"a\""));
        assert!(msg.contains("a -> c -> a"));
    }
}
