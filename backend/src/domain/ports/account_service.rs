//! Driving port for account use-cases: registration, sign-in and sign-out.
//!
//! Inbound adapters call it without knowing which auth provider backs it,
//! which keeps HTTP handler tests deterministic.

use async_trait::async_trait;

use crate::domain::{
    AuthCode, AuthSession, Error, LoginCredentials, PkceVerifier, SessionHandle, SignUpRequest,
    UserIdentity,
};

/// Result of a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpResult {
    /// The provider sent a confirmation email; no session yet.
    ConfirmationSent { user: UserIdentity },
    /// The provider signed the user in immediately.
    SignedIn(AuthSession),
}

#[async_trait]
pub trait AccountService: Send + Sync {
    /// Register a new account.
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpResult, Error>;

    /// Exchange credentials for a session.
    async fn sign_in(&self, credentials: LoginCredentials) -> Result<AuthSession, Error>;

    /// Revoke the session; local state is cleared by the caller regardless.
    async fn sign_out(&self, session: &SessionHandle) -> Result<(), Error>;

    /// Exchange a confirmation-link code and its PKCE verifier for a session.
    async fn exchange_code(
        &self,
        code: AuthCode,
        verifier: PkceVerifier,
    ) -> Result<AuthSession, Error>;

    /// Identity of the caller behind `session`.
    async fn current_user(&self, session: Option<&SessionHandle>) -> Result<UserIdentity, Error>;

    /// Full session behind `session`, refreshed from the provider.
    async fn current_session(&self, session: Option<&SessionHandle>)
    -> Result<AuthSession, Error>;
}
