//! # Engine handle.
//!
//! [`Engine`] is a cheap, cloneable handle to one running control loop. Every
//! operation is a message to the loop; the handle itself holds no state.
//!
//! ```text
//! Engine::install ─► Command::Install ─► ControlLoop ─► reply (oneshot)
//! Engine::report  ─► Command::Report  ─► ControlLoop ─► reply (oneshot)
//! Engine::kill    ─► kill token
//! Engine::wait    ◄─ done (watch) ◄──── driver task (loop finished, subscribers drained)
//! ```
//!
//! Dropping every handle starts a shutdown, as if [`Engine::kill`] had been called.
//!
//! ## Example
//! ```rust
//! use depvisor::{Context, Engine, EngineConfig, Manifold, ValueWorker, WorkerError, output};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::new(EngineConfig::default())?;
//!
//!     engine
//!         .install("config", depvisor::value_manifold(8080u16))
//!         .await?;
//!     engine
//!         .install(
//!             "api",
//!             Manifold::new(|ctx: Context| async move {
//!                 let port: u16 = ctx.get("config")?;
//!                 Ok::<_, WorkerError>(ValueWorker::new(port))
//!             })
//!             .with_inputs(["config"])
//!             .with_output(output::typed(|w: &ValueWorker<u16>| *w.value())),
//!         )
//!         .await?;
//!
//!     engine.kill();
//!     engine.wait().await?;
//!     Ok(())
//! }
//! ```

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::builder::EngineBuilder;
use crate::core::config::EngineConfig;
use crate::core::control::Command;
use crate::core::report::Report;
use crate::core::shutdown;
use crate::error::{EngineError, InstallError};
use crate::events::{Bus, Event};
use crate::manifold::Manifold;

pub(crate) type Done = Option<Result<(), EngineError>>;

/// Handle to a running dependency engine.
#[derive(Clone)]
pub struct Engine {
    commands: mpsc::Sender<Command>,
    kill: CancellationToken,
    bus: Bus,
    done: watch::Receiver<Done>,
}

impl Engine {
    /// Starts an engine with no subscribers.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// ### Errors
    /// [`EngineError::InvalidConfig`] if `cfg` does not validate.
    pub fn new(cfg: EngineConfig) -> Result<Self, EngineError> {
        EngineBuilder::new(cfg).build()
    }

    /// Returns a builder, for attaching subscribers.
    pub fn builder(cfg: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(cfg)
    }

    pub(crate) fn from_parts(
        commands: mpsc::Sender<Command>,
        kill: CancellationToken,
        bus: Bus,
        done: watch::Receiver<Done>,
    ) -> Self {
        Self {
            commands,
            kill,
            bus,
            done,
        }
    }

    /// Registers a manifold under `name`.
    ///
    /// Resolves once the control loop has accepted or rejected it; the worker
    /// itself starts asynchronously once its inputs are running.
    ///
    /// ### Errors
    /// - [`InstallError::DuplicateName`] if `name` is taken;
    /// - [`InstallError::CycleDetected`] if the inputs would close a cycle;
    /// - [`InstallError::EngineStopped`] once shutdown has begun.
    pub async fn install(
        &self,
        name: impl Into<String>,
        manifold: Manifold,
    ) -> Result<(), InstallError> {
        let (reply, rx) = oneshot::channel();
        let cmd = Command::Install {
            name: name.into(),
            manifold,
            reply,
        };
        self.commands
            .send(cmd)
            .await
            .map_err(|_| InstallError::EngineStopped)?;
        rx.await.unwrap_or(Err(InstallError::EngineStopped))
    }

    /// Snapshot of every manifold's state.
    ///
    /// ### Errors
    /// [`EngineError::Stopped`] once the control loop has finished.
    pub async fn report(&self) -> Result<Report, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Report { reply })
            .await
            .map_err(|_| EngineError::Stopped)?;
        rx.await.map_err(|_| EngineError::Stopped)
    }

    /// Starts a shutdown. Idempotent and non-blocking.
    pub fn kill(&self) {
        self.kill.cancel();
    }

    /// Waits until every worker has exited and subscribers have drained.
    ///
    /// ### Errors
    /// - [`EngineError::Fatal`] if a worker failed fatally;
    /// - [`EngineError::Stopped`] if the control loop vanished without a result.
    pub async fn wait(&self) -> Result<(), EngineError> {
        let mut done = self.done.clone();
        let result = done
            .wait_for(Option::is_some)
            .await
            .map_err(|_| EngineError::Stopped)?;
        (*result).clone().unwrap_or(Err(EngineError::Stopped))
    }

    /// True once the control loop has finished.
    pub fn is_finished(&self) -> bool {
        self.done.borrow().is_some()
    }

    /// Receiver for engine events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Kills the engine on SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere).
    pub fn kill_on_signal(&self) {
        let kill = self.kill.clone();
        tokio::spawn(async move {
            tokio::select! {
                res = shutdown::wait_for_shutdown_signal() => match res {
                    Ok(()) => {
                        info!("termination signal received");
                        kill.cancel();
                    }
                    Err(err) => warn!(error = %err, "cannot listen for termination signals"),
                },
                _ = kill.cancelled() => {}
            }
        });
    }
}
