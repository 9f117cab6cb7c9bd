//! # Run one worker instance.
//!
//! Each factory invocation gets its own tokio task (the "worker unit"). The
//! unit is the only place where user code runs; the control loop never awaits
//! a factory or a worker.
//!
//! ```text
//! spawn_run(name, run, manifold, ctx)
//!   └─► manifold.start(ctx) ── Err(e) ─────────────────► Notice::Exited(Err(e))
//!             │ Ok(worker)
//!             ├─► Notice::Started(worker)
//!             └─► worker.wait() ─────────────────────────► Notice::Exited(result)
//! ```
//!
//! ## Rules
//! - Exactly one `Exited` notice per run, always after `Started` if any.
//! - Panics in the factory or in `wait` are caught and reported as
//!   [`WorkerError::Fail`], so a misbehaving worker cannot take the loop down.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::error::WorkerError;
use crate::manifold::{Context, Manifold, WorkerRef};
use crate::subscribers::panic_message;

/// Report from a worker unit to the control loop.
pub(crate) enum Notice {
    /// The factory returned a worker.
    Started {
        name: Arc<str>,
        run: u64,
        worker: WorkerRef,
    },
    /// The factory failed, or the worker's `wait` returned.
    Exited {
        name: Arc<str>,
        run: u64,
        result: Result<(), WorkerError>,
    },
}

/// Spawns the worker unit for one run of `manifold`.
pub(crate) fn spawn_run(
    name: Arc<str>,
    run: u64,
    manifold: Manifold,
    ctx: Context,
    notices: mpsc::UnboundedSender<Notice>,
) {
    tokio::spawn(async move {
        let started = AssertUnwindSafe(manifold.start(ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(WorkerError::fail(format!(
                    "factory panicked: {}",
                    panic_message(&*panic)
                )))
            });

        let worker = match started {
            Ok(worker) => worker,
            Err(err) => {
                let _ = notices.send(Notice::Exited {
                    name,
                    run,
                    result: Err(err),
                });
                return;
            }
        };

        let _ = notices.send(Notice::Started {
            name: Arc::clone(&name),
            run,
            worker: Arc::clone(&worker),
        });

        let result = AssertUnwindSafe(worker.wait())
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(WorkerError::fail(format!(
                    "worker panicked: {}",
                    panic_message(&*panic)
                )))
            });

        let _ = notices.send(Notice::Exited { name, run, result });
    });
}
