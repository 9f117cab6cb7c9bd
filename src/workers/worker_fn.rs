//! # Function-backed worker (`WorkerFn`)
//!
//! [`WorkerFn`] runs a closure `F: FnOnce(CancellationToken) -> Fut` on its own
//! tokio task. `kill` cancels the token; `wait` resolves with the closure's
//! result. Any number of callers may `wait` concurrently and all of them see
//! the same result.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use depvisor::{Context, Manifold, WorkerError, WorkerFn};
//!
//! let ticker = Manifold::new(|ctx: Context| async move {
//!     let period: Duration = ctx.get("period")?;
//!     Ok::<_, WorkerError>(WorkerFn::spawn(move |stop| async move {
//!         loop {
//!             tokio::select! {
//!                 _ = stop.cancelled() => return Ok(()),
//!                 _ = tokio::time::sleep(period) => {}
//!             }
//!         }
//!     }))
//! })
//! .with_inputs(["period"]);
//! assert_eq!(ticker.inputs(), ["period".to_string()]);
//! ```

use std::future::Future;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::manifold::Worker;

/// Worker backed by a spawned future.
pub struct WorkerFn {
    stop: CancellationToken,
    done: Shared<BoxFuture<'static, Result<(), WorkerError>>>,
}

impl WorkerFn {
    /// Spawns `f` with a fresh stop token.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
    {
        let stop = CancellationToken::new();
        let handle = tokio::spawn(f(stop.clone()));
        let done = async move {
            match handle.await {
                Ok(result) => result,
                Err(err) => Err(WorkerError::fail(format!("worker task ended abnormally: {err}"))),
            }
        }
        .boxed()
        .shared();
        Self { stop, done }
    }

    /// The token passed to the closure.
    pub fn token(&self) -> CancellationToken {
        self.stop.clone()
    }
}

#[async_trait]
impl Worker for WorkerFn {
    fn kill(&self) {
        self.stop.cancel();
    }

    async fn wait(&self) -> Result<(), WorkerError> {
        self.done.clone().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn kill_stops_the_closure() {
        let w = WorkerFn::spawn(|stop| async move {
            stop.cancelled().await;
            Err(WorkerError::Bounce)
        });
        w.kill();
        let (a, b) = tokio::join!(w.wait(), w.wait());
        assert_eq!(a, Err(WorkerError::Bounce));
        assert_eq!(b, Err(WorkerError::Bounce));
    }

    async fn explode() -> Result<(), WorkerError> {
        panic!("boom")
    }

    #[tokio::test]
    async fn panics_become_failures() {
        let w = WorkerFn::spawn(|_stop| explode());
        let err = w.wait().await.unwrap_err();
        assert_eq!(err.as_label(), "worker_failed");
    }
}
