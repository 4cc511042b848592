//! Driven port for the managed authentication provider.
//!
//! The provider owns identities and issues bearer tokens; the application
//! never stores passwords. Adapters translate transport failures into
//! [`AuthProviderError`] so services can tell bad credentials from outages.

use async_trait::async_trait;

use crate::domain::{
    AccessToken, AuthCode, AuthSession, LoginCredentials, PkceVerifier, SessionHandle,
    SignUpRequest, UserIdentity,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by auth provider adapters.
    pub enum AuthProviderError {
        /// Email/password pair was not accepted.
        InvalidCredentials => "invalid email or password",
        /// Token or code was rejected (expired, revoked or already used).
        Rejected { message: String } => "auth provider rejected the request: {message}",
        /// Provider could not be reached.
        Connection { message: String } => "auth provider unreachable: {message}",
        /// Provider answered with an unexpected payload or status.
        Query { message: String } => "auth provider request failed: {message}",
    }
}

/// Outcome of a registration.
///
/// `session` is present only when the provider signs the user in immediately
/// (email confirmation disabled).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user: UserIdentity,
    pub session: Option<AuthSession>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register a new account; confirmation is handled by the provider.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AuthProviderError>;

    /// Exchange an email/password pair for a session.
    async fn sign_in_with_password(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<AuthSession, AuthProviderError>;

    /// Resolve a stored session handle into a full session.
    ///
    /// Returns `Ok(None)` when the provider no longer recognises the token.
    async fn get_session(
        &self,
        handle: &SessionHandle,
    ) -> Result<Option<AuthSession>, AuthProviderError>;

    /// Fetch the identity behind an access token.
    ///
    /// Returns `Ok(None)` when the token does not resolve to a user.
    async fn get_user(&self, token: &AccessToken)
    -> Result<Option<UserIdentity>, AuthProviderError>;

    /// Revoke the session behind `token`.
    async fn sign_out(&self, token: &AccessToken) -> Result<(), AuthProviderError>;

    /// Exchange a confirmation-link code for a session.
    ///
    /// `verifier` must be the one whose challenge accompanied the sign-up.
    async fn exchange_code_for_session(
        &self,
        code: &AuthCode,
        verifier: &PkceVerifier,
    ) -> Result<AuthSession, AuthProviderError>;
}
