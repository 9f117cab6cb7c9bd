//! # depvisor
//!
//! **Depvisor** is a dependency-driven worker engine for Rust.
//!
//! You describe each component as a [`Manifold`]: the names of the components
//! it depends on, a factory that builds a running [`Worker`] from a
//! [`Context`], and an output adapter that exposes the worker to dependents.
//! The [`Engine`] starts workers in dependency order, restarts failed ones
//! with backoff, and stops and restarts dependents whenever one of their
//! inputs restarts, so that nothing keeps using a stale reference.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   Engine::install("agent", m1)   Engine::install("api", m2)   Engine::kill()
//!               │                             │                       │
//!               ▼                             ▼                       ▼
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │  ControlLoop (one task, only writer of engine state)                      │
//! │  - registry: name → Manifold, phase, generation, retry state              │
//! │  - cycle check on install                                                 │
//! │  - reconcile after every event: stop stale runs, start ready manifolds    │
//! └──────┬──────────────────────┬─────────────────────────────────▲───────────┘
//!        │ spawn_run(ctx)       │ spawn_run(ctx)                  │ Notice::Started
//!        ▼                      ▼                                 │ Notice::Exited
//!   ┌──────────────┐       ┌──────────────┐                       │
//!   │ worker unit  │       │ worker unit  │ ──────────────────────┘
//!   │ factory+wait │       │ factory+wait │
//!   └──────────────┘       └──────────────┘
//!
//!   ControlLoop ── publish(Event) ──► Bus ──► fan-out ──► SubscriberSet ──► Subscribe::on_event
//! ```
//!
//! ### Lifecycle of a dependency edge
//! ```text
//! "agent" starts           → generation 1 → "api" ready → api factory gets ctx{agent@1}
//! "agent" fails, restarts  → generation 2 → api's ctx{agent@1} is stale
//!                                            ├─► ctx invalidated (get → Missing)
//!                                            ├─► api worker killed
//!                                            └─► api exits → restarted with ctx{agent@2}
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Graph**         | Declare components and their dependencies.                   | [`Manifold`], [`Context`], [`Worker`]       |
//! | **Engine**        | Run, observe and stop the graph.                             | [`Engine`], [`EngineBuilder`], [`Report`]   |
//! | **Policies**      | Restart delays after failures.                               | [`BackoffPolicy`], [`JitterPolicy`]         |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, alerting).     | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors, each with a stable `as_label()`.               | [`InstallError`], [`WorkerError`], ...      |
//! | **Workers**       | Ready-made workers.                                          | [`ValueWorker`], [`WorkerFn`]               |
//! | **Leaves**        | Leadership leases, secret authorization, HTTP storage.       | [`lease`], [`secrets`], `storage`           |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber.
//! - `storage` (default): the file-backed HTTP storage leaf (pulls in `axum`).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use depvisor::{Context, Engine, EngineConfig, Manifold, WorkerError, WorkerFn, value_manifold};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn depvisor::Subscribe>> = vec![Arc::new(depvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn depvisor::Subscribe>> = Vec::new();
//!
//!     let engine = Engine::builder(EngineConfig::default())
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     engine.install("greeting", value_manifold(String::from("hello"))).await?;
//!     engine
//!         .install(
//!             "printer",
//!             Manifold::new(|ctx: Context| async move {
//!                 let greeting: String = ctx.get("greeting")?;
//!                 Ok::<_, WorkerError>(WorkerFn::spawn(move |stop| async move {
//!                     println!("{greeting}");
//!                     stop.cancelled().await;
//!                     Ok(())
//!                 }))
//!             })
//!             .with_inputs(["greeting"]),
//!         )
//!         .await?;
//!
//!     engine.kill();
//!     engine.wait().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod manifold;
mod policies;
mod subscribers;
mod workers;

pub mod lease;
pub mod secrets;
#[cfg(feature = "storage")]
pub mod storage;

// ---- Public re-exports ----

pub use crate::core::{Engine, EngineBuilder, EngineConfig, EngineState, ManifoldReport, Phase, Report};
pub use error::{DependencyError, EngineError, InstallError, TypeMismatch, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use manifold::output;
pub use manifold::{
    AsAny, Context, Destination, FilterFn, Manifold, OutputFn, StartFn, StartFuture, Worker,
    WorkerRef,
};
pub use policies::{BackoffPolicy, JitterPolicy, RetryState};
pub use subscribers::{Subscribe, SubscriberSet};
pub use workers::{ValueWorker, WorkerFn, value_manifold};

// Built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
