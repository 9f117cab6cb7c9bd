//! # Leadership-gated secret access.
//!
//! A leaf capability plugged into the engine:
//!
//! ```text
//! "leadership" (leadership_manifold) ──► "secrets" (secrets_manifold)
//!                                             └─► SecretsAuthority
//!                                                   └─► authorizer(caller) ─► SecretsAuthorizer
//! ```
//!
//! - [`SecretAccess`] / [`InMemoryGrants`] grant lookup;
//! - [`SecretsAuthorizer`] manage/read/ownership checks for one caller;
//! - [`SecretsAuthority`] the capability the manifold exposes.

mod access;
mod authorizer;
mod tag;

pub use access::{InMemoryGrants, Role, SecretAccess};
pub use authorizer::SecretsAuthorizer;
pub use tag::Tag;

use std::sync::Arc;

use thiserror::Error;

use crate::error::WorkerError;
use crate::lease::{CheckerRef, LeaseError};
use crate::manifold::{Context, Manifold, output};
use crate::workers::ValueWorker;

/// # Errors returned by secret authorization.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretsError {
    /// No rule grants the requested access.
    #[error("permission denied")]
    PermissionDenied,

    /// A required leadership check failed.
    #[error(transparent)]
    Lease(#[from] LeaseError),

    /// The secret does not exist.
    #[error("secret {uri:?} not found")]
    NotFound {
        /// Requested secret.
        uri: String,
    },
}

impl SecretsError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SecretsError::PermissionDenied => "secrets_permission_denied",
            SecretsError::Lease(_) => "secrets_lease",
            SecretsError::NotFound { .. } => "secrets_not_found",
        }
    }
}

/// Capability exposed by [`secrets_manifold`]: mints per-caller authorizers.
#[derive(Clone)]
pub struct SecretsAuthority {
    access: Arc<dyn SecretAccess>,
    leadership: CheckerRef,
}

impl SecretsAuthority {
    /// Combines a grant backend with a leadership checker.
    pub fn new(access: Arc<dyn SecretAccess>, leadership: CheckerRef) -> Self {
        Self { access, leadership }
    }

    /// Authorizer bound to `caller`.
    pub fn authorizer(&self, caller: Tag) -> SecretsAuthorizer {
        SecretsAuthorizer::new(caller, Arc::clone(&self.access), Arc::clone(&self.leadership))
    }
}

/// Manifold exposing a [`SecretsAuthority`], depending on the leadership
/// manifold installed as `leadership`.
pub fn secrets_manifold(leadership: &str, access: Arc<dyn SecretAccess>) -> Manifold {
    let input = leadership.to_string();
    Manifold::new(move |ctx: Context| {
        let input = input.clone();
        let access = Arc::clone(&access);
        async move {
            let checker: CheckerRef = ctx.get(&input)?;
            Ok::<_, WorkerError>(ValueWorker::new(SecretsAuthority::new(access, checker)))
        }
    })
    .with_inputs([leadership])
    .with_output(output::typed(|w: &ValueWorker<SecretsAuthority>| {
        w.value().clone()
    }))
}
