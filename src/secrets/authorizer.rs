//! # Secret access authorization.
//!
//! A [`SecretsAuthorizer`] is bound to one authenticated caller. Checks that
//! depend on leadership return a [`Token`] instead of a boolean: the caller
//! re-checks it when it finally acts, so a unit that lost leadership in
//! between cannot complete the action.
//!
//! ## Manage
//! | caller                                     | result                    |
//! |--------------------------------------------|---------------------------|
//! | unit holding `Manage` directly             | always-passing token      |
//! | unit whose application holds `Manage`      | fresh leadership token    |
//! | application holding `Manage`               | always-passing token      |
//! | anything else                              | `PermissionDenied`        |
//!
//! ## View
//! The entity holds `View` (or `Manage`) directly, or its application does.
//!
//! ## Ownership of new secrets
//! Only within the caller's own application. An application caller, or a unit
//! naming itself as owner, passes without a leadership check; any other unit
//! of the application must currently be its leader.

use std::sync::Arc;

use tracing::debug;

use crate::lease::{CheckerRef, SuccessfulToken, Token};
use crate::secrets::SecretsError;
use crate::secrets::access::{Role, SecretAccess};
use crate::secrets::tag::Tag;

/// Authorization checks for one authenticated caller.
pub struct SecretsAuthorizer {
    caller: Tag,
    access: Arc<dyn SecretAccess>,
    leadership: CheckerRef,
}

impl SecretsAuthorizer {
    /// Binds the checks to `caller`.
    pub fn new(caller: Tag, access: Arc<dyn SecretAccess>, leadership: CheckerRef) -> Self {
        Self {
            caller,
            access,
            leadership,
        }
    }

    /// The authenticated caller.
    pub fn caller(&self) -> &Tag {
        &self.caller
    }

    /// Checks that the caller may manage `uri`.
    ///
    /// ### Errors
    /// - [`SecretsError::PermissionDenied`] if no rule grants management;
    /// - [`SecretsError::Lease`] if the caller relies on leadership it does not hold.
    pub fn can_manage(&self, uri: &str) -> Result<Box<dyn Token>, SecretsError> {
        match &self.caller {
            Tag::Unit(_) => {
                if self.has_role(uri, &self.caller, Role::Manage) {
                    return Ok(Box::new(SuccessfulToken));
                }
                let owner = self.caller_application()?;
                if self.has_role(uri, &owner, Role::Manage) {
                    return self.leadership_token();
                }
            }
            Tag::Application(_) => {
                if self.has_role(uri, &self.caller, Role::Manage) {
                    return Ok(Box::new(SuccessfulToken));
                }
            }
            Tag::Other(_) => {}
        }
        debug!(caller = %self.caller, uri, "manage denied");
        Err(SecretsError::PermissionDenied)
    }

    /// True if `entity` may read `uri`.
    pub fn can_read(&self, uri: &str, entity: &Tag) -> bool {
        if self.has_role(uri, entity, Role::View) {
            return true;
        }
        entity
            .application_name()
            .is_some_and(|app| self.has_role(uri, &Tag::application(app), Role::View))
    }

    /// Checks that the caller may create a secret owned by `owner`.
    ///
    /// ### Errors
    /// - [`SecretsError::PermissionDenied`] if `owner` is outside the caller's application;
    /// - [`SecretsError::Lease`] if a leadership check is needed and fails.
    pub fn owner_token(&self, owner: &Tag) -> Result<Box<dyn Token>, SecretsError> {
        let same_app = matches!(
            (self.caller.application_name(), owner.application_name()),
            (Some(a), Some(b)) if a == b
        );
        if !same_app {
            return Err(SecretsError::PermissionDenied);
        }
        if matches!(self.caller, Tag::Application(_)) || self.caller.id() == owner.id() {
            return Ok(Box::new(SuccessfulToken));
        }
        self.leadership_token()
    }

    /// Leadership token for the caller, checked once before it is returned.
    fn leadership_token(&self) -> Result<Box<dyn Token>, SecretsError> {
        let app = self
            .caller
            .application_name()
            .ok_or(SecretsError::PermissionDenied)?;
        let token = self.leadership.leadership_check(app, self.caller.id());
        token.check(0, None)?;
        Ok(token)
    }

    fn caller_application(&self) -> Result<Tag, SecretsError> {
        self.caller
            .application_name()
            .map(Tag::application)
            .ok_or(SecretsError::PermissionDenied)
    }

    fn has_role(&self, uri: &str, entity: &Tag, role: Role) -> bool {
        matches!(self.access.secret_access(uri, entity), Ok(held) if held.allows(role))
    }
}
