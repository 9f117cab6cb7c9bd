//! # ValueWorker: a worker that only holds a value.
//!
//! The simplest useful worker: it exposes a value to dependents and does
//! nothing else until killed. Configuration, agent identity and similar
//! "inputs that are just data" are modelled this way.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::manifold::{Manifold, Worker, output};

/// Worker holding a value until killed.
pub struct ValueWorker<T> {
    value: T,
    stop: CancellationToken,
}

impl<T> ValueWorker<T> {
    /// Wraps `value`.
    pub fn new(value: T) -> Self {
        Self {
            value,
            stop: CancellationToken::new(),
        }
    }

    /// The held value.
    pub fn value(&self) -> &T {
        &self.value
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> Worker for ValueWorker<T> {
    fn kill(&self) {
        self.stop.cancel();
    }

    async fn wait(&self) -> Result<(), WorkerError> {
        self.stop.cancelled().await;
        Ok(())
    }
}

/// Input-less manifold exposing a clone of `value` to dependents.
///
/// # Example
/// ```
/// let config = depvisor::value_manifold(String::from("/var/lib/agent"));
/// assert!(config.inputs().is_empty());
/// assert!(config.has_output());
/// ```
pub fn value_manifold<T>(value: T) -> Manifold
where
    T: Clone + Send + Sync + 'static,
{
    Manifold::new(move |_ctx| {
        let value = value.clone();
        async move { Ok(ValueWorker::new(value)) }
    })
    .with_output(output::typed(|w: &ValueWorker<T>| w.value().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn waits_until_killed() {
        let w = ValueWorker::new(5u8);
        assert_eq!(*w.value(), 5);
        assert!(
            tokio::time::timeout(Duration::from_millis(20), w.wait())
                .await
                .is_err()
        );

        w.kill();
        w.kill();
        assert_eq!(w.wait().await, Ok(()));
    }
}
