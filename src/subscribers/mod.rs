//! # Event subscribers.
//!
//! ```text
//! control loop ── publish(Event) ──► Bus ──► fan-out listener ──► SubscriberSet
//!                                                             ┌────┴─────┐
//!                                                             ▼          ▼
//!                                                         LogWriter    Custom
//! ```
//!
//! - [`Subscribe`] trait for custom subscribers
//! - [`SubscriberSet`] bounded per-subscriber queues with panic isolation
//! - `LogWriter` (feature `logging`) renders events through `tracing`

#[cfg(feature = "logging")]
mod log;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
pub(crate) use subscriber_set::panic_message;
