//! Runtime core: the engine and its control loop.
//!
//! The public API from this module is [`Engine`] (with [`EngineBuilder`] and
//! [`EngineConfig`]) and the [`Report`] types.
//!
//! Internal modules:
//! - [`control`]: the serialized control loop, the only writer of engine state;
//! - [`runner`]: the worker unit running one factory and one worker;
//! - [`graph`]: install-time cycle detection;
//! - [`shutdown`]: termination signal handling.

mod builder;
mod config;
mod control;
mod engine;
mod graph;
mod report;
mod runner;
mod shutdown;

pub use builder::EngineBuilder;
pub use config::EngineConfig;
pub use engine::Engine;
pub use report::{EngineState, ManifoldReport, Phase, Report};
