//! # In-memory leadership tracker.
//!
//! One leader per application. Every change of leadership bumps the
//! application's epoch; tokens remember the epoch they were minted under and
//! stop passing as soon as it moves.
//!
//! ```text
//! claim("mysql", "mysql/0")  epoch 1, holder mysql/0
//! token_a = leadership_check("mysql", "mysql/0")   // bound to epoch 1
//! claim("mysql", "mysql/1")  epoch 2, holder mysql/1
//! token_a.check(..) → NotLeader
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::lease::token::{LeaseAssertion, LeaseError, Token, write_assertion};

/// Mints leadership tokens for `(application, unit)` pairs.
pub trait LeadershipChecker: Send + Sync {
    /// Token proving `unit` leads `application`; checking it may fail.
    fn leadership_check(&self, application: &str, unit: &str) -> Box<dyn Token>;
}

/// Shared handle exposed by the leadership manifold.
pub type CheckerRef = Arc<dyn LeadershipChecker>;

#[derive(Clone, Debug, Default)]
struct Lease {
    holder: Option<String>,
    epoch: u64,
}

type Leases = Arc<RwLock<HashMap<String, Lease>>>;

/// Leadership state for a set of applications.
///
/// Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct LeadershipTracker {
    leases: Leases,
}

impl LeadershipTracker {
    /// Creates a tracker with no leaders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `unit` the leader of `application`. Returns the new epoch.
    pub fn claim(&self, application: &str, unit: &str) -> u64 {
        let mut leases = self.leases.write().unwrap_or_else(PoisonError::into_inner);
        let lease = leases.entry(application.to_string()).or_default();
        lease.holder = Some(unit.to_string());
        lease.epoch += 1;
        lease.epoch
    }

    /// Removes the leader of `application`, invalidating its tokens.
    pub fn revoke(&self, application: &str) {
        let mut leases = self.leases.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(lease) = leases.get_mut(application) {
            lease.holder = None;
            lease.epoch += 1;
        }
    }

    /// Current leader of `application`.
    pub fn leader(&self, application: &str) -> Option<String> {
        let leases = self.leases.read().unwrap_or_else(PoisonError::into_inner);
        leases.get(application).and_then(|l| l.holder.clone())
    }
}

impl LeadershipChecker for LeadershipTracker {
    fn leadership_check(&self, application: &str, unit: &str) -> Box<dyn Token> {
        let leases = self.leases.read().unwrap_or_else(PoisonError::into_inner);
        let epoch = leases
            .get(application)
            .filter(|l| l.holder.as_deref() == Some(unit))
            .map(|l| l.epoch);
        Box::new(LeadershipToken {
            leases: Arc::clone(&self.leases),
            application: application.to_string(),
            unit: unit.to_string(),
            epoch,
        })
    }
}

struct LeadershipToken {
    leases: Leases,
    application: String,
    unit: String,
    /// Epoch at minting; `None` if the unit was not leader then.
    epoch: Option<u64>,
}

impl Token for LeadershipToken {
    fn check(&self, _attempt: u32, payload: Option<&mut dyn Any>) -> Result<(), LeaseError> {
        let leases = self.leases.read().unwrap_or_else(PoisonError::into_inner);
        let current = leases.get(&self.application);
        let holds = match (current, self.epoch) {
            (Some(lease), Some(epoch)) => {
                lease.epoch == epoch && lease.holder.as_deref() == Some(self.unit.as_str())
            }
            _ => false,
        };
        if !holds {
            return Err(LeaseError::NotLeader {
                application: self.application.clone(),
                unit: self.unit.clone(),
            });
        }
        let epoch = current.map_or(0, |l| l.epoch);
        drop(leases);

        write_assertion(
            payload,
            LeaseAssertion {
                application: self.application.clone(),
                holder: self.unit.clone(),
                epoch,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_fails_once_leadership_moves() {
        let tracker = LeadershipTracker::new();
        tracker.claim("mysql", "mysql/0");

        let token = tracker.leadership_check("mysql", "mysql/0");
        assert!(token.check(0, None).is_ok());

        tracker.claim("mysql", "mysql/1");
        assert_eq!(
            token.check(1, None),
            Err(LeaseError::NotLeader {
                application: "mysql".into(),
                unit: "mysql/0".into()
            })
        );
        assert_eq!(tracker.leader("mysql").as_deref(), Some("mysql/1"));
    }

    #[test]
    fn reclaiming_does_not_revive_old_tokens() {
        let tracker = LeadershipTracker::new();
        tracker.claim("mysql", "mysql/0");
        let token = tracker.leadership_check("mysql", "mysql/0");

        tracker.revoke("mysql");
        tracker.claim("mysql", "mysql/0");
        assert!(token.check(0, None).is_err());
        assert!(tracker.leadership_check("mysql", "mysql/0").check(0, None).is_ok());
    }

    #[test]
    fn non_leader_token_never_passes() {
        let tracker = LeadershipTracker::new();
        assert!(tracker.leadership_check("mysql", "mysql/0").check(0, None).is_err());

        tracker.claim("mysql", "mysql/1");
        assert!(tracker.leadership_check("mysql", "mysql/0").check(0, None).is_err());
    }

    #[test]
    fn check_writes_the_assertion() {
        let tracker = LeadershipTracker::new();
        let epoch = tracker.claim("mysql", "mysql/0");
        let token = tracker.leadership_check("mysql", "mysql/0");

        let mut slot: Option<LeaseAssertion> = None;
        token.check(0, Some(&mut slot as &mut dyn Any)).unwrap();
        assert_eq!(
            slot,
            Some(LeaseAssertion {
                application: "mysql".into(),
                holder: "mysql/0".into(),
                epoch,
            })
        );

        let mut wrong = 0u32;
        let err = token.check(0, Some(&mut wrong as &mut dyn Any)).unwrap_err();
        assert_eq!(err.as_label(), "lease_invalid_payload");
    }
}
