//! Login, logout, identity query and identity switch over an explicit session.
//!
//! Every operation takes the caller's [`Session`] as a parameter; nothing here
//! touches HTTP or the session store, so the whole surface is testable in-process.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::principal::Principal;
use super::provider::IdentityProvider;
use super::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid login")]
    InvalidCredentials,
    #[error("Not logged in")]
    Unauthenticated,
    #[error("Only admin can switch users")]
    Forbidden,
    #[error("User not found")]
    NotFound,
}

/// Guard for protected operations: the session's principal, or `Unauthenticated`.
pub fn require_authenticated(session: &Session) -> Result<&Principal, AuthError> {
    session.principal().ok_or(AuthError::Unauthenticated)
}

#[derive(Clone)]
pub struct AuthGateway {
    identities: Arc<dyn IdentityProvider>,
}

impl AuthGateway {
    pub fn new(identities: Arc<dyn IdentityProvider>) -> Self { Self { identities } }

    pub fn identities(&self) -> &dyn IdentityProvider { self.identities.as_ref() }

    /// On success the session holds the matching principal. On failure the
    /// session is left exactly as it was.
    ///
    /// No lockout and no constant-time comparison: not fit for real deployments.
    pub fn login(&self, session: &mut Session, username: &str, credential: &str) -> Result<Principal, AuthError> {
        let Some(record) = self.identities.verify(username, credential) else {
            warn!(target: "auth", username = %username, "auth.login rejected");
            return Err(AuthError::InvalidCredentials);
        };
        let principal = record.principal();
        session.set_principal(principal.clone());
        info!(target: "auth", user_id = principal.id, username = %principal.username, role = %principal.role, "auth.login");
        Ok(principal)
    }

    /// Idempotent.
    pub fn logout(&self, session: &mut Session) {
        if let Some(p) = session.principal() {
            info!(target: "auth", username = %p.username, "auth.logout");
        }
        session.clear();
    }

    pub fn current_principal(&self, session: &Session) -> Option<Principal> {
        session.principal().cloned()
    }

    /// Admin-only impersonation. Replaces the session principal with the target's
    /// without asking for its credential; the acting admin is not remembered.
    pub fn switch_identity(&self, session: &mut Session, acting: &Principal, target_username: &str) -> Result<Principal, AuthError> {
        if !acting.is_admin() {
            warn!(target: "auth", acting = %acting.username, target = %target_username, "auth.switch forbidden");
            return Err(AuthError::Forbidden);
        }
        let Some(record) = self.identities.find_by_username(target_username) else {
            return Err(AuthError::NotFound);
        };
        let principal = record.principal();
        session.set_principal(principal.clone());
        info!(target: "auth", acting = %acting.username, target = %principal.username, "auth.switch");
        Ok(principal)
    }
}
