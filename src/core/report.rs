//! # Engine report.
//!
//! A [`Report`] is a consistent snapshot of the registry taken by the control
//! loop between two events. It is what an operator looks at when a manifold
//! "is not coming up": which phase it is stuck in, and why.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::WorkerError;

/// Lifecycle phase of one manifold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No worker, waiting for inputs to be running.
    Idle,
    /// The factory is running.
    Starting,
    /// A worker is live and its capability is visible to dependents.
    Running,
    /// The worker was signalled to stop and has not exited yet.
    Stopping,
    /// Waiting out a restart delay.
    Backoff,
    /// Reported a missing dependency; restarts once an input changes.
    Blocked,
    /// Exited cleanly; restarts only if an input changes.
    Completed,
    /// Wiring defect; never restarted.
    Defective,
}

impl Phase {
    /// True while a factory or worker may be executing for the manifold.
    pub fn is_live(self) -> bool {
        matches!(self, Phase::Starting | Phase::Running | Phase::Stopping)
    }
}

/// Snapshot of one manifold.
#[derive(Clone, Debug)]
pub struct ManifoldReport {
    /// Declared inputs.
    pub inputs: Vec<String>,
    /// Current phase.
    pub phase: Phase,
    /// Number of workers started so far.
    pub generation: u64,
    /// Number of factory invocations so far.
    pub attempts: u64,
    /// Consecutive failures counted by the backoff.
    pub failures: u32,
    /// Last error the manifold exited with, if any.
    pub last_error: Option<WorkerError>,
    /// Time left before the next restart when in [`Phase::Backoff`].
    pub retry_in: Option<Duration>,
}

/// Whether the engine still accepts work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Accepting installs and restarting workers.
    Running,
    /// Stopping workers, dependents first.
    Stopping,
}

/// Snapshot of the whole engine.
#[derive(Clone, Debug)]
pub struct Report {
    /// Engine state.
    pub state: EngineState,
    /// Per-manifold snapshots, by name.
    pub manifolds: BTreeMap<String, ManifoldReport>,
}

impl Report {
    /// Snapshot of one manifold.
    pub fn get(&self, name: &str) -> Option<&ManifoldReport> {
        self.manifolds.get(name)
    }

    /// Names of manifolds with a live factory or worker.
    pub fn live(&self) -> Vec<&str> {
        self.manifolds
            .iter()
            .filter(|(_, m)| m.phase.is_live())
            .map(|(n, _)| n.as_str())
            .collect()
    }
}
