//! Session and identity gate.
//!
//! Every authorised operation starts here. A missing or expired session is
//! rejected locally; otherwise exactly one provider call resolves the
//! identity. There is no retry.

use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, warn};

use crate::domain::marketplace_error::MarketplaceError;
use crate::domain::ports::AuthProvider;
use crate::domain::{AuthSession, SessionHandle, UserIdentity};

/// Resolves the caller's identity from a stored session handle.
#[derive(Clone)]
pub struct IdentityGate {
    auth: Arc<dyn AuthProvider>,
    clock: Arc<dyn Clock>,
}

impl IdentityGate {
    pub fn new(auth: Arc<dyn AuthProvider>, clock: Arc<dyn Clock>) -> Self {
        Self { auth, clock }
    }

    /// Whether `handle` is present and not yet expired. No provider call.
    pub fn has_active_session(&self, handle: Option<&SessionHandle>) -> bool {
        handle.is_some_and(|handle| !handle.is_expired_at(self.clock.utc()))
    }

    /// Require an active session; returns it without contacting the provider.
    pub fn require_session<'a>(
        &self,
        handle: Option<&'a SessionHandle>,
    ) -> Result<&'a SessionHandle, MarketplaceError> {
        match handle {
            Some(handle) if !handle.is_expired_at(self.clock.utc()) => Ok(handle),
            Some(_) => {
                debug!("session expired");
                Err(MarketplaceError::Unauthenticated)
            }
            None => Err(MarketplaceError::Unauthenticated),
        }
    }

    /// Require an active session and a resolvable identity.
    pub async fn require_identity(
        &self,
        handle: Option<&SessionHandle>,
    ) -> Result<UserIdentity, MarketplaceError> {
        let handle = self.require_session(handle)?;
        self.resolve_identity(handle).await
    }

    /// Resolve the identity behind an already checked session.
    pub async fn resolve_identity(
        &self,
        handle: &SessionHandle,
    ) -> Result<UserIdentity, MarketplaceError> {
        match self.auth.get_user(handle.access_token()).await {
            Ok(Some(identity)) => Ok(identity),
            Ok(None) => Err(MarketplaceError::Unauthenticated),
            Err(err) => {
                warn!(error = %err, "identity lookup failed");
                Err(MarketplaceError::Unauthenticated)
            }
        }
    }

    /// Resolve the full session behind a handle, if it is still valid.
    pub async fn current_session(
        &self,
        handle: Option<&SessionHandle>,
    ) -> Result<AuthSession, MarketplaceError> {
        let handle = self.require_session(handle)?;
        match self.auth.get_session(handle).await {
            Ok(Some(session)) => Ok(session),
            Ok(None) => Err(MarketplaceError::Unauthenticated),
            Err(err) => {
                warn!(error = %err, "session lookup failed");
                Err(MarketplaceError::Unauthenticated)
            }
        }
    }
}
