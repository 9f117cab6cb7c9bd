//! # Re-validatable leadership tokens.
//!
//! A [`Token`] is never a cached boolean: every [`Token::check`] asks "is this
//! still true right now?". Callers check once when authorizing and may check
//! again right before acting.

use std::any::Any;

use thiserror::Error;

/// # Errors returned by [`Token::check`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeaseError {
    /// The unit does not (or no longer) hold the application's leadership.
    #[error("{unit:?} is not leader of {application:?}")]
    NotLeader {
        /// Application whose leadership was checked.
        application: String,
        /// Unit that claimed to be leader.
        unit: String,
    },

    /// The payload slot passed to `check` has a shape the token cannot fill.
    #[error("cannot write lease assertion into {wanted}")]
    InvalidPayload {
        /// What the token can write.
        wanted: &'static str,
    },

    /// The lease backend could not answer.
    #[error("lease backend unavailable: {reason}")]
    Unavailable {
        /// Backend error message.
        reason: String,
    },
}

impl LeaseError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LeaseError::NotLeader { .. } => "lease_not_leader",
            LeaseError::InvalidPayload { .. } => "lease_invalid_payload",
            LeaseError::Unavailable { .. } => "lease_unavailable",
        }
    }
}

/// What a successful check vouched for.
///
/// A transactional caller embeds this in its write so that the write fails if
/// leadership moved in between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaseAssertion {
    /// Application whose leadership was asserted.
    pub application: String,
    /// Leader unit.
    pub holder: String,
    /// Lease epoch the assertion is bound to.
    pub epoch: u64,
}

/// Re-validatable proof of a lease.
pub trait Token: Send + Sync {
    /// Checks that the lease still holds.
    ///
    /// `attempt` is the caller's retry counter. When `payload` is an
    /// `Option<LeaseAssertion>`, a successful check writes the assertion it
    /// validated into it.
    fn check(&self, attempt: u32, payload: Option<&mut dyn Any>) -> Result<(), LeaseError>;
}

/// Token that always passes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SuccessfulToken;

impl Token for SuccessfulToken {
    fn check(&self, _attempt: u32, _payload: Option<&mut dyn Any>) -> Result<(), LeaseError> {
        Ok(())
    }
}

/// Writes `assertion` into `payload` if there is one.
pub(crate) fn write_assertion(
    payload: Option<&mut dyn Any>,
    assertion: LeaseAssertion,
) -> Result<(), LeaseError> {
    let Some(payload) = payload else {
        return Ok(());
    };
    match payload.downcast_mut::<Option<LeaseAssertion>>() {
        Some(slot) => {
            *slot = Some(assertion);
            Ok(())
        }
        None => Err(LeaseError::InvalidPayload {
            wanted: std::any::type_name::<Option<LeaseAssertion>>(),
        }),
    }
}
