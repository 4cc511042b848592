//! Account use-cases backed by the auth provider.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::identity_gate::IdentityGate;
use crate::domain::ports::{AccountService, AuthProvider, AuthProviderError, SignUpResult};
use crate::domain::{
    AuthCode, AuthSession, Error, LoginCredentials, PkceVerifier, SessionHandle, SignUpRequest,
    UserIdentity,
};

/// Account service implementing [`AccountService`].
#[derive(Clone)]
pub struct AccountManager {
    auth: Arc<dyn AuthProvider>,
    gate: IdentityGate,
}

impl AccountManager {
    pub fn new(auth: Arc<dyn AuthProvider>, gate: IdentityGate) -> Self {
        Self { auth, gate }
    }

    fn map_auth_error(err: AuthProviderError) -> Error {
        match err {
            AuthProviderError::InvalidCredentials => Error::unauthorized("invalid email or password"),
            AuthProviderError::Rejected { message } => Error::unauthorized(message),
            AuthProviderError::Connection { message } => {
                Error::service_unavailable(format!("auth provider unavailable: {message}"))
            }
            AuthProviderError::Query { message } => {
                Error::service_unavailable(format!("auth provider error: {message}"))
            }
        }
    }
}

#[async_trait]
impl AccountService for AccountManager {
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpResult, Error> {
        let outcome = self
            .auth
            .sign_up(&request)
            .await
            .map_err(Self::map_auth_error)?;
        info!(user_id = %outcome.user.id(), "account registered");
        Ok(match outcome.session {
            Some(session) => SignUpResult::SignedIn(session),
            None => SignUpResult::ConfirmationSent { user: outcome.user },
        })
    }

    async fn sign_in(&self, credentials: LoginCredentials) -> Result<AuthSession, Error> {
        let session = self
            .auth
            .sign_in_with_password(&credentials)
            .await
            .map_err(Self::map_auth_error)?;
        info!(user_id = %session.user().id(), "signed in");
        Ok(session)
    }

    async fn sign_out(&self, session: &SessionHandle) -> Result<(), Error> {
        self.auth
            .sign_out(session.access_token())
            .await
            .map_err(|err| {
                warn!(error = %err, "provider sign-out failed");
                Self::map_auth_error(err)
            })
    }

    async fn exchange_code(
        &self,
        code: AuthCode,
        verifier: PkceVerifier,
    ) -> Result<AuthSession, Error> {
        let session = self
            .auth
            .exchange_code_for_session(&code, &verifier)
            .await
            .map_err(Self::map_auth_error)?;
        info!(user_id = %session.user().id(), "confirmation code exchanged");
        Ok(session)
    }

    async fn current_user(&self, session: Option<&SessionHandle>) -> Result<UserIdentity, Error> {
        self.gate
            .require_identity(session)
            .await
            .map_err(Error::from)
    }

    async fn current_session(
        &self,
        session: Option<&SessionHandle>,
    ) -> Result<AuthSession, Error> {
        self.gate
            .current_session(session)
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{MockAuthProvider, SignUpOutcome};
    use crate::domain::test_support::{FixedClock, sample_identity, valid_handle};
    use crate::domain::{AccessToken, UserMetadata};
    use chrono::{Duration, Utc};
    use rstest::rstest;

    fn manager(auth: MockAuthProvider) -> AccountManager {
        let auth: Arc<dyn AuthProvider> = Arc::new(auth);
        let gate = IdentityGate::new(auth.clone(), Arc::new(FixedClock(Utc::now())));
        AccountManager::new(auth, gate)
    }

    fn session() -> AuthSession {
        AuthSession::new(
            AccessToken::new("access").expect("token"),
            None,
            Utc::now() + Duration::hours(1),
            sample_identity(),
        )
    }

    #[rstest]
    #[case(AuthProviderError::invalid_credentials(), ErrorCode::Unauthorized)]
    #[case(AuthProviderError::rejected("code used"), ErrorCode::Unauthorized)]
    #[case(AuthProviderError::connection("dns"), ErrorCode::ServiceUnavailable)]
    #[case(AuthProviderError::query("500"), ErrorCode::ServiceUnavailable)]
    fn provider_errors_map_to_codes(#[case] err: AuthProviderError, #[case] expected: ErrorCode) {
        assert_eq!(AccountManager::map_auth_error(err).code(), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn sign_up_without_session_awaits_confirmation() {
        let mut auth = MockAuthProvider::new();
        auth.expect_sign_up().times(1).return_once(|_| {
            Ok(SignUpOutcome {
                user: sample_identity(),
                session: None,
            })
        });
        let request = SignUpRequest::try_new("ada@example.com", "secret1", UserMetadata::default())
            .expect("request");

        let result = manager(auth).sign_up(request).await.expect("sign up");
        assert!(matches!(result, SignUpResult::ConfirmationSent { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn sign_in_returns_provider_session() {
        let expected = session();
        let returned = expected.clone();
        let mut auth = MockAuthProvider::new();
        auth.expect_sign_in_with_password()
            .times(1)
            .return_once(move |_| Ok(returned));
        let credentials =
            LoginCredentials::try_from_parts("ada@example.com", "secret1").expect("creds");

        let session = manager(auth).sign_in(credentials).await.expect("session");
        assert_eq!(session, expected);
    }

    #[rstest]
    #[tokio::test]
    async fn current_user_without_session_is_unauthorized() {
        let mut auth = MockAuthProvider::new();
        auth.expect_get_user().never();
        let err = manager(auth).current_user(None).await.expect_err("no session");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    #[tokio::test]
    async fn code_exchange_forwards_the_verifier() {
        let verifier = PkceVerifier::generate();
        let expected = verifier.expose().to_owned();
        let returned = session();
        let mut auth = MockAuthProvider::new();
        auth.expect_exchange_code_for_session()
            .withf(move |code, verifier| code.expose() == "one-time" && verifier.expose() == expected)
            .times(1)
            .return_once(move |_, _| Ok(returned));

        manager(auth)
            .exchange_code(AuthCode::new("one-time").expect("code"), verifier)
            .await
            .expect("exchanged");
    }

    #[rstest]
    #[tokio::test]
    async fn sign_out_revokes_the_access_token() {
        let (handle, _) = valid_handle();
        let mut auth = MockAuthProvider::new();
        auth.expect_sign_out()
            .withf(|token| token.expose() == "access-token")
            .times(1)
            .return_once(|_| Ok(()));

        manager(auth).sign_out(&handle).await.expect("signed out");
    }
}
