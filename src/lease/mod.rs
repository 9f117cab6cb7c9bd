//! # Leadership leases.
//!
//! - [`Token`] re-validatable proof, checked right before acting;
//! - [`LeadershipChecker`] mints tokens for `(application, unit)` pairs;
//! - [`LeadershipTracker`] in-memory checker with epoch-bound tokens;
//! - [`leadership_manifold`] exposes a checker to other manifolds as a
//!   [`CheckerRef`].

mod token;
mod tracker;

pub use token::{LeaseAssertion, LeaseError, SuccessfulToken, Token};
pub use tracker::{CheckerRef, LeadershipChecker, LeadershipTracker};

use std::sync::Arc;

use crate::manifold::{Manifold, output};
use crate::workers::ValueWorker;

/// Input-less manifold exposing `tracker` as a [`CheckerRef`].
pub fn leadership_manifold(tracker: LeadershipTracker) -> Manifold {
    Manifold::new(move |_ctx| {
        let checker: CheckerRef = Arc::new(tracker.clone());
        async move { Ok(ValueWorker::new(checker)) }
    })
    .with_output(output::typed(|w: &ValueWorker<CheckerRef>| {
        Arc::clone(w.value())
    }))
}
