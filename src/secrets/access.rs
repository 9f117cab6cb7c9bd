//! # Grant lookup.
//!
//! [`SecretAccess`] answers "which role does this entity hold on this secret".
//! [`InMemoryGrants`] is the in-process implementation.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::secrets::SecretsError;
use crate::secrets::tag::Tag;

/// Access level on a secret. `Manage` implies `View`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    /// No access.
    #[default]
    None,
    /// May read the secret's content.
    View,
    /// May update, rotate and remove the secret.
    Manage,
}

impl Role {
    /// True if this role grants `wanted`.
    pub fn allows(self, wanted: Role) -> bool {
        self >= wanted
    }
}

/// Grant lookup backend.
pub trait SecretAccess: Send + Sync {
    /// Role `entity` holds on the secret `uri`.
    fn secret_access(&self, uri: &str, entity: &Tag) -> Result<Role, SecretsError>;
}

/// Grants kept in memory.
#[derive(Default)]
pub struct InMemoryGrants {
    grants: RwLock<HashMap<(String, Tag), Role>>,
}

impl InMemoryGrants {
    /// Creates an empty grant table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `role` on `uri` to `entity`, replacing any previous grant.
    pub fn grant(&self, uri: &str, entity: Tag, role: Role) {
        self.grants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((uri.to_string(), entity), role);
    }

    /// Removes `entity`'s grant on `uri`.
    pub fn revoke(&self, uri: &str, entity: &Tag) {
        self.grants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(uri.to_string(), entity.clone()));
    }
}

impl SecretAccess for InMemoryGrants {
    fn secret_access(&self, uri: &str, entity: &Tag) -> Result<Role, SecretsError> {
        let grants = self.grants.read().unwrap_or_else(PoisonError::into_inner);
        Ok(grants
            .get(&(uri.to_string(), entity.clone()))
            .copied()
            .unwrap_or_default())
    }
}
