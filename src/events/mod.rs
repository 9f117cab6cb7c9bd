//! Engine events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the control loop (`core::control`), `SubscriberSet`
//!   workers (overflow/panic).
//! - **Consumers**: the engine's fan-out listener (feeds `SubscriberSet`) and
//!   receivers handed out by [`Engine::subscribe`](crate::Engine::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
