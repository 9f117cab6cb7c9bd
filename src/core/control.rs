//! # Control loop: the only writer of engine state.
//!
//! One task owns the registry and every manifold's lifecycle state. It
//! handles one event at a time, then runs a reconcile pass.
//!
//! ```text
//!            ┌──────────── Command::Install / Command::Report (Engine handles)
//!            │   ┌──────── Notice::Started / Notice::Exited     (worker units)
//!            │   │   ┌──── kill token                           (Engine::kill)
//!            │   │   │   ┌ backoff deadline                     (sleep_until)
//!            ▼   ▼   ▼   ▼
//!          ┌────────────────┐   reconcile():
//!          │  ControlLoop   │     1. stop runs whose input generations moved
//!          │  (one task)    │     2. start ready manifolds (sorted by name)
//!          └───────┬────────┘     or, once stopping, stop leaves of the live set
//!                  │ spawn_run(ctx)
//!                  ▼
//!          worker unit per run ──► Notice ──► back into the loop
//! ```
//!
//! ## Lifecycle of one manifold
//! ```text
//! Idle ──ready──► Starting ──Started──► Running ──Exited──► Completed / Blocked
//!   ▲                │                     │                 Backoff / Defective
//!   │                └──inputs moved──► Stopping ◄──inputs moved──┘
//!   └──────────────────── Exited ─────────┘
//! ```
//!
//! ## Rules
//! - A manifold is ready iff every declared input is `Running`.
//! - A run captures its inputs' generations; once any of them is no longer the
//!   running generation, the run's token is cancelled and its worker killed.
//! - A new run is only spawned after the previous run's `Exited` notice, so
//!   there is never more than one factory or worker per name.
//! - Shutdown stops a live manifold only once none of its dependents is live.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::config::EngineConfig;
use crate::core::graph::check_acyclic;
use crate::core::report::{EngineState, ManifoldReport, Phase, Report};
use crate::core::runner::{Notice, spawn_run};
use crate::error::{EngineError, InstallError, WorkerError};
use crate::events::{Bus, Event, EventKind};
use crate::manifold::{Context, Manifold, Resource, WorkerRef};
use crate::policies::RetryState;

/// Requests from [`Engine`](crate::Engine) handles.
pub(crate) enum Command {
    Install {
        name: String,
        manifold: Manifold,
        reply: oneshot::Sender<Result<(), InstallError>>,
    },
    Report {
        reply: oneshot::Sender<Report>,
    },
}

/// Input name → generation observed for it.
type Snapshot = BTreeMap<String, u64>;

struct Run {
    id: u64,
    token: CancellationToken,
    inputs: Snapshot,
    started_at: Option<Instant>,
}

#[derive(Clone, Copy, Debug)]
enum StopReason {
    Inputs,
    Shutdown,
}

impl StopReason {
    fn as_str(self) -> &'static str {
        match self {
            StopReason::Inputs => "input changed",
            StopReason::Shutdown => "engine shutting down",
        }
    }
}

enum State {
    Idle,
    Starting(Run),
    Running(Run, WorkerRef),
    Stopping {
        run: Run,
        worker: Option<WorkerRef>,
        reason: StopReason,
    },
    Backoff {
        until: Instant,
    },
    Blocked {
        seen: Snapshot,
    },
    Completed {
        seen: Snapshot,
    },
    Defective,
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Idle => Phase::Idle,
            State::Starting(_) => Phase::Starting,
            State::Running(..) => Phase::Running,
            State::Stopping { .. } => Phase::Stopping,
            State::Backoff { .. } => Phase::Backoff,
            State::Blocked { .. } => Phase::Blocked,
            State::Completed { .. } => Phase::Completed,
            State::Defective => Phase::Defective,
        }
    }

    fn run(&self) -> Option<&Run> {
        match self {
            State::Starting(run) | State::Running(run, _) | State::Stopping { run, .. } => {
                Some(run)
            }
            _ => None,
        }
    }
}

struct Node {
    name: Arc<str>,
    manifold: Manifold,
    declared: Arc<[String]>,
    state: State,
    generation: u64,
    attempts: u64,
    last_error: Option<WorkerError>,
    retry: RetryState,
}

impl Node {
    fn new(name: &str, manifold: Manifold, generation: u64) -> Self {
        Self {
            name: Arc::from(name),
            declared: Arc::from(manifold.inputs().to_vec()),
            manifold,
            state: State::Idle,
            generation,
            attempts: 0,
            last_error: None,
            retry: RetryState::default(),
        }
    }
}

pub(crate) struct ControlLoop {
    cfg: EngineConfig,
    bus: Bus,
    nodes: HashMap<String, Node>,
    /// Last generation of uninstalled names; a reinstall continues from it.
    retired: HashMap<String, u64>,
    commands: mpsc::Receiver<Command>,
    notices: mpsc::UnboundedReceiver<Notice>,
    notices_tx: mpsc::UnboundedSender<Notice>,
    kill: CancellationToken,
    next_run: u64,
    stopping: bool,
    fatal: Option<EngineError>,
}

impl ControlLoop {
    pub(crate) fn new(
        cfg: EngineConfig,
        bus: Bus,
        commands: mpsc::Receiver<Command>,
        kill: CancellationToken,
    ) -> Self {
        let (notices_tx, notices) = mpsc::unbounded_channel();
        Self {
            cfg,
            bus,
            nodes: HashMap::new(),
            retired: HashMap::new(),
            commands,
            notices,
            notices_tx,
            kill,
            next_run: 0,
            stopping: false,
            fatal: None,
        }
    }

    /// Runs until shutdown completes and every worker has exited.
    pub(crate) async fn run(mut self) -> Result<(), EngineError> {
        let mut commands_open = true;
        loop {
            if self.stopping && !self.any_live() {
                break;
            }
            let deadline = self.next_deadline();

            tokio::select! {
                biased;
                Some(notice) = self.notices.recv() => self.on_notice(notice),
                _ = self.kill.cancelled(), if !self.stopping => self.begin_shutdown(),
                cmd = self.commands.recv(), if commands_open => match cmd {
                    Some(cmd) => self.on_command(cmd),
                    None => {
                        commands_open = false;
                        self.begin_shutdown();
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {}
                else => break,
            }

            self.reconcile();
        }

        self.bus.publish(Event::new(EventKind::AllStopped));
        info!("all workers stopped");
        match self.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Install {
                name,
                manifold,
                reply,
            } => {
                let _ = reply.send(self.install(name, manifold));
            }
            Command::Report { reply } => {
                let _ = reply.send(self.report());
            }
        }
    }

    fn install(&mut self, name: String, manifold: Manifold) -> Result<(), InstallError> {
        if self.stopping {
            return Err(InstallError::EngineStopped);
        }
        if self.nodes.contains_key(&name) {
            return Err(InstallError::DuplicateName { name });
        }
        check_acyclic(&name, manifold.inputs(), |n| {
            self.nodes.get(n).map(|node| node.manifold.inputs())
        })?;

        debug!(manifold = %name, inputs = ?manifold.inputs(), "manifold installed");
        self.bus
            .publish(Event::new(EventKind::ManifoldInstalled).with_manifold(name.as_str()));
        let generation = self.retired.remove(&name).unwrap_or(0);
        let node = Node::new(&name, manifold, generation);
        self.nodes.insert(name, node);
        Ok(())
    }

    fn report(&self) -> Report {
        let now = Instant::now();
        let manifolds = self
            .nodes
            .iter()
            .map(|(name, node)| {
                let retry_in = match node.state {
                    State::Backoff { until } => Some(until.saturating_duration_since(now)),
                    _ => None,
                };
                let report = ManifoldReport {
                    inputs: node.manifold.inputs().to_vec(),
                    phase: node.state.phase(),
                    generation: node.generation,
                    attempts: node.attempts,
                    failures: node.retry.failures(),
                    last_error: node.last_error.clone(),
                    retry_in,
                };
                (name.clone(), report)
            })
            .collect();

        Report {
            state: if self.stopping {
                EngineState::Stopping
            } else {
                EngineState::Running
            },
            manifolds,
        }
    }

    fn begin_shutdown(&mut self) {
        if self.stopping {
            return;
        }
        self.stopping = true;
        info!("shutdown requested");
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
    }

    // === Reconcile ===

    fn reconcile(&mut self) {
        self.stop_stale_runs();
        if self.stopping {
            self.stop_leaves();
        } else {
            self.start_ready();
        }
    }

    /// Stops every run whose captured inputs are no longer the running ones,
    /// until nothing else moves (a stop makes dependents stale in turn).
    fn stop_stale_runs(&mut self) {
        loop {
            let stale: Vec<String> = self
                .nodes
                .iter()
                .filter(|(_, node)| {
                    matches!(node.state, State::Starting(_) | State::Running(..))
                        && node.state.run().is_some_and(|run| !self.still_valid(run))
                })
                .map(|(name, _)| name.clone())
                .collect();
            if stale.is_empty() {
                return;
            }
            for name in stale {
                self.stop(&name, StopReason::Inputs);
            }
        }
    }

    fn start_ready(&mut self) {
        let now = Instant::now();
        // An expired delay only waits for inputs now; keep it out of next_deadline.
        for node in self.nodes.values_mut() {
            if matches!(node.state, State::Backoff { until } if until <= now) {
                node.state = State::Idle;
            }
        }

        let mut ready: Vec<(String, Snapshot)> = self
            .nodes
            .iter()
            .filter(|(_, node)| self.wants_start(node, now))
            .filter_map(|(name, node)| {
                self.running_inputs(node)
                    .map(|snapshot| (name.clone(), snapshot))
            })
            .collect();
        ready.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, snapshot) in ready {
            self.start(&name, snapshot);
        }
    }

    /// During shutdown: stop live manifolds none of whose dependents is live.
    fn stop_leaves(&mut self) {
        let leaves: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| matches!(node.state, State::Starting(_) | State::Running(..)))
            .filter(|(name, _)| !self.has_live_dependent(name))
            .map(|(name, _)| name.clone())
            .collect();
        for name in leaves {
            self.stop(&name, StopReason::Shutdown);
        }
    }

    // === Transitions ===

    fn start(&mut self, name: &str, inputs: Snapshot) {
        let resources: HashMap<String, Resource> = inputs
            .iter()
            .filter_map(|(input, generation)| {
                let dep = self.nodes.get(input)?;
                match &dep.state {
                    State::Running(_, worker) => Some((
                        input.clone(),
                        Resource {
                            worker: Arc::clone(worker),
                            generation: *generation,
                            output: dep.manifold.output().cloned(),
                        },
                    )),
                    _ => None,
                }
            })
            .collect();

        let run_id = self.next_run;
        self.next_run += 1;
        let token = CancellationToken::new();

        let Some(node) = self.nodes.get_mut(name) else {
            return;
        };
        let ctx = Context::new(
            Arc::clone(&node.name),
            Arc::clone(&node.declared),
            resources,
            token.clone(),
        );
        node.attempts += 1;
        node.state = State::Starting(Run {
            id: run_id,
            token,
            inputs,
            started_at: None,
        });

        debug!(manifold = name, attempt = node.attempts, "starting worker");
        self.bus
            .publish(Event::new(EventKind::WorkerStarting).with_manifold(Arc::clone(&node.name)));
        spawn_run(
            Arc::clone(&node.name),
            run_id,
            node.manifold.clone(),
            ctx,
            self.notices_tx.clone(),
        );
    }

    fn stop(&mut self, name: &str, reason: StopReason) {
        let Some(node) = self.nodes.get_mut(name) else {
            return;
        };
        node.state = match std::mem::replace(&mut node.state, State::Idle) {
            State::Starting(run) => {
                run.token.cancel();
                State::Stopping {
                    run,
                    worker: None,
                    reason,
                }
            }
            State::Running(run, worker) => {
                run.token.cancel();
                worker.kill();
                State::Stopping {
                    run,
                    worker: Some(worker),
                    reason,
                }
            }
            other => {
                node.state = other;
                return;
            }
        };

        debug!(manifold = name, reason = reason.as_str(), "stopping worker");
        self.bus.publish(
            Event::new(EventKind::WorkerStopping)
                .with_manifold(Arc::clone(&node.name))
                .with_generation(node.generation)
                .with_reason(reason.as_str()),
        );
    }

    fn on_notice(&mut self, notice: Notice) {
        match notice {
            Notice::Started { name, run, worker } => self.on_started(&name, run, worker),
            Notice::Exited { name, run, result } => self.on_exited(&name, run, result),
        }
    }

    fn on_started(&mut self, name: &str, run_id: u64, worker: WorkerRef) {
        let Some(node) = self.nodes.get_mut(name) else {
            worker.kill();
            return;
        };
        let state = std::mem::replace(&mut node.state, State::Idle);
        node.state = match state {
            State::Starting(mut run) if run.id == run_id => {
                run.started_at = Some(Instant::now());
                node.generation += 1;
                debug!(manifold = name, generation = node.generation, "worker started");
                self.bus.publish(
                    Event::new(EventKind::WorkerStarted)
                        .with_manifold(Arc::clone(&node.name))
                        .with_generation(node.generation),
                );
                State::Running(run, worker)
            }
            // Stopped while the factory was still running: never exposed.
            State::Stopping {
                mut run,
                worker: None,
                reason,
            } if run.id == run_id => {
                run.started_at = Some(Instant::now());
                worker.kill();
                State::Stopping {
                    run,
                    worker: Some(worker),
                    reason,
                }
            }
            other => {
                worker.kill();
                other
            }
        };
    }

    fn on_exited(&mut self, name: &str, run_id: u64, result: Result<(), WorkerError>) {
        let Some(node) = self.nodes.get_mut(name) else {
            return;
        };
        if node.state.run().is_none_or(|run| run.id != run_id) {
            return;
        }
        let (run, stopped_for) = match std::mem::replace(&mut node.state, State::Idle) {
            State::Starting(run) | State::Running(run, _) => (run, None),
            State::Stopping { run, reason, .. } => (run, Some(reason)),
            _ => return,
        };
        run.token.cancel();

        let now = Instant::now();
        let uptime = run.started_at.map(|at| now.saturating_duration_since(at));
        let result = node.manifold.filter(result);
        let generation = node.generation;
        let event = |kind| {
            Event::new(kind)
                .with_manifold(name)
                .with_generation(generation)
        };

        match result {
            Err(WorkerError::Fatal { error }) => {
                error!(manifold = name, %error, "worker failed fatally, shutting down");
                self.bus
                    .publish(event(EventKind::WorkerFailed).with_reason(error.as_str()));
                node.last_error = Some(WorkerError::Fatal {
                    error: error.clone(),
                });
                self.fatal.get_or_insert(EngineError::Fatal {
                    manifold: name.to_string(),
                    error,
                });
                self.begin_shutdown();
            }
            Err(WorkerError::Uninstall) => {
                self.retired.insert(name.to_string(), generation);
                self.nodes.remove(name);
                info!(manifold = name, "manifold uninstalled");
                self.bus
                    .publish(Event::new(EventKind::ManifoldUninstalled).with_manifold(name));
            }
            _ if stopped_for.is_some() => {
                debug!(manifold = name, "worker stopped");
                self.bus.publish(event(EventKind::WorkerStopped));
            }
            Ok(()) => {
                debug!(manifold = name, "worker completed");
                node.retry.reset();
                node.state = State::Completed { seen: run.inputs };
                self.bus.publish(event(EventKind::WorkerStopped));
            }
            Err(WorkerError::Missing { reason }) => {
                debug!(manifold = name, %reason, "dependency missing");
                self.bus
                    .publish(event(EventKind::DependencyMissing).with_reason(reason.as_str()));
                node.last_error = Some(WorkerError::Missing { reason });
                node.state = State::Blocked { seen: run.inputs };
            }
            Err(WorkerError::Bounce) => {
                let delay = self.cfg.bounce_delay;
                debug!(manifold = name, ?delay, "worker bounced");
                self.bus.publish(
                    event(EventKind::BackoffScheduled)
                        .with_delay(delay)
                        .with_reason("bounce"),
                );
                node.state = State::Backoff { until: now + delay };
            }
            Err(WorkerError::Wiring(err)) => {
                error!(manifold = name, error = %err, "wiring defect, not restarting");
                self.bus
                    .publish(event(EventKind::WorkerFailed).with_reason(err.to_string()));
                node.last_error = Some(WorkerError::Wiring(err));
                node.state = State::Defective;
            }
            Err(err) => {
                let delay =
                    node.retry
                        .record_failure(&self.cfg.backoff, uptime, self.cfg.min_uptime);
                let reason = err.to_string();
                warn!(manifold = name, error = %reason, ?delay, "worker failed, restarting after backoff");
                self.bus
                    .publish(event(EventKind::WorkerFailed).with_reason(reason.as_str()));
                self.bus.publish(
                    event(EventKind::BackoffScheduled)
                        .with_delay(delay)
                        .with_reason(reason),
                );
                node.last_error = Some(err);
                node.state = State::Backoff { until: now + delay };
            }
        }
    }

    // === Queries ===

    fn running_generation(&self, name: &str) -> Option<u64> {
        match self.nodes.get(name) {
            Some(Node {
                state: State::Running(..),
                generation,
                ..
            }) => Some(*generation),
            _ => None,
        }
    }

    /// Generations of all inputs, if every one of them is running.
    fn running_inputs(&self, node: &Node) -> Option<Snapshot> {
        node.manifold
            .inputs()
            .iter()
            .map(|input| Some((input.clone(), self.running_generation(input)?)))
            .collect()
    }

    /// Generations of the inputs as they are now, `0` for inputs not running.
    fn observed_inputs(&self, node: &Node) -> Snapshot {
        node.manifold
            .inputs()
            .iter()
            .map(|input| (input.clone(), self.running_generation(input).unwrap_or(0)))
            .collect()
    }

    fn still_valid(&self, run: &Run) -> bool {
        run.inputs
            .iter()
            .all(|(input, generation)| self.running_generation(input) == Some(*generation))
    }

    fn wants_start(&self, node: &Node, now: Instant) -> bool {
        match &node.state {
            State::Idle => true,
            State::Backoff { until } => *until <= now,
            // Blocked and Completed wait for an input generation to move.
            State::Blocked { seen } | State::Completed { seen } => {
                self.observed_inputs(node) != *seen
            }
            _ => false,
        }
    }

    fn has_live_dependent(&self, name: &str) -> bool {
        self.nodes.values().any(|node| {
            node.state.phase().is_live() && node.manifold.inputs().iter().any(|i| i == name)
        })
    }

    fn any_live(&self) -> bool {
        self.nodes.values().any(|node| node.state.phase().is_live())
    }

    fn next_deadline(&self) -> Option<Instant> {
        if self.stopping {
            return None;
        }
        self.nodes
            .values()
            .filter_map(|node| match node.state {
                State::Backoff { until } => Some(until),
                _ => None,
            })
            .min()
    }
}
