//! Reqwest-backed [`AuthProvider`] speaking the hosted auth API.
//!
//! Tokens are never stored here: the caller's session cookie carries them
//! and each call forwards what it needs. An expired access token is renewed
//! through the refresh grant when the handle carries a refresh token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use tracing::debug;

use super::dto::{
    AuthUserDto, PasswordGrantDto, PkceGrantDto, RefreshGrantDto, SessionDto, SignUpDto,
    SignUpReplyDto,
};
use super::http::{CallError, Reply, StatusFailure, SupabaseHttp};
use crate::domain::ports::{AuthProvider, AuthProviderError, SignUpOutcome};
use crate::domain::{
    AccessToken, AuthCode, AuthSession, LoginCredentials, PkceChallenge, PkceVerifier,
    RefreshToken, SessionHandle, SignUpRequest, UserIdentity,
};

const INVALID_CREDENTIAL_CODES: &[&str] = &["invalid_grant", "invalid_credentials"];

/// Auth adapter authenticated with the public (anon) key.
pub struct SupabaseAuthProvider {
    http: SupabaseHttp,
    clock: Arc<dyn Clock>,
}

impl SupabaseAuthProvider {
    /// Build an adapter for the project at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base: Url,
        anon_key: impl Into<String>,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: SupabaseHttp::new(base, anon_key, timeout)?,
            clock,
        })
    }

    async fn token_grant<B: Serialize + Sync>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<AuthSession, CallError> {
        let mut url = self.http.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let reply = self
            .http
            .send(self.http.request(Method::POST, url).json(body))
            .await?;
        self.session_from(&reply)
    }

    fn session_from(&self, reply: &Reply) -> Result<AuthSession, CallError> {
        reply
            .json::<SessionDto>()?
            .into_domain(self.clock.utc())
            .map_err(CallError::Decode)
    }

    async fn refresh(&self, token: &RefreshToken) -> Result<Option<AuthSession>, AuthProviderError> {
        let body = RefreshGrantDto {
            refresh_token: token.expose(),
        };
        match self.token_grant("refresh_token", &body).await {
            Ok(session) => Ok(Some(session)),
            Err(CallError::Status(failure)) if failure.status.is_client_error() => {
                debug!(status = failure.status.as_u16(), "refresh token rejected");
                Ok(None)
            }
            Err(err) => Err(map_call_error(err)),
        }
    }
}

fn map_call_error(err: CallError) -> AuthProviderError {
    match err {
        CallError::Timeout(_) | CallError::Transport(_) => {
            AuthProviderError::connection(err.to_string())
        }
        CallError::Status(failure) => map_status_failure(failure),
        CallError::Decode(message) => AuthProviderError::query(message),
    }
}

fn map_status_failure(failure: StatusFailure) -> AuthProviderError {
    if failure.has_code(INVALID_CREDENTIAL_CODES) {
        AuthProviderError::invalid_credentials()
    } else if failure.status.is_client_error() {
        AuthProviderError::rejected(failure.message)
    } else {
        AuthProviderError::query(failure.message)
    }
}

/// Absent or revoked tokens read as "no user" rather than an error.
fn is_unauthenticated(failure: &StatusFailure) -> bool {
    matches!(
        failure.status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
    )
}

#[async_trait]
impl AuthProvider for SupabaseAuthProvider {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AuthProviderError> {
        let mut url = self.http.endpoint("auth/v1/signup").map_err(map_call_error)?;
        if let Some(redirect) = request.email_redirect_to() {
            url.query_pairs_mut().append_pair("redirect_to", redirect);
        }
        let credentials = request.credentials();
        let challenge = request.code_challenge();
        let body = SignUpDto {
            email: credentials.email().as_ref(),
            password: credentials.password(),
            data: request.metadata(),
            code_challenge: challenge.map(PkceChallenge::as_str),
            code_challenge_method: challenge.map(|_| PkceChallenge::METHOD),
        };
        let reply = self
            .http
            .send(self.http.request(Method::POST, url).json(&body))
            .await
            .map_err(map_call_error)?;
        match reply.json::<SignUpReplyDto>().map_err(map_call_error)? {
            SignUpReplyDto::Session(dto) => {
                let session = dto
                    .into_domain(self.clock.utc())
                    .map_err(AuthProviderError::query)?;
                Ok(SignUpOutcome {
                    user: session.user().clone(),
                    session: Some(session),
                })
            }
            SignUpReplyDto::User(dto) => Ok(SignUpOutcome {
                user: dto.into_domain().map_err(AuthProviderError::query)?,
                session: None,
            }),
        }
    }

    async fn sign_in_with_password(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<AuthSession, AuthProviderError> {
        let body = PasswordGrantDto {
            email: credentials.email().as_ref(),
            password: credentials.password(),
        };
        self.token_grant("password", &body)
            .await
            .map_err(map_call_error)
    }

    async fn get_session(
        &self,
        handle: &SessionHandle,
    ) -> Result<Option<AuthSession>, AuthProviderError> {
        if !handle.is_expired_at(self.clock.utc()) {
            if let Some(user) = self.get_user(handle.access_token()).await? {
                return Ok(Some(AuthSession::new(
                    handle.access_token().clone(),
                    handle.refresh_token().cloned(),
                    handle.expires_at(),
                    user,
                )));
            }
        }
        match handle.refresh_token() {
            Some(refresh) => self.refresh(refresh).await,
            None => Ok(None),
        }
    }

    async fn get_user(
        &self,
        token: &AccessToken,
    ) -> Result<Option<UserIdentity>, AuthProviderError> {
        let url = self.http.endpoint("auth/v1/user").map_err(map_call_error)?;
        let request = self.http.request_as(Method::GET, url, token.expose());
        match self.http.send(request).await {
            Ok(reply) => reply
                .json::<AuthUserDto>()
                .map_err(map_call_error)?
                .into_domain()
                .map(Some)
                .map_err(AuthProviderError::query),
            Err(CallError::Status(failure)) if is_unauthenticated(&failure) => Ok(None),
            Err(err) => Err(map_call_error(err)),
        }
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), AuthProviderError> {
        let url = self.http.endpoint("auth/v1/logout").map_err(map_call_error)?;
        let request = self.http.request_as(Method::POST, url, token.expose());
        match self.http.send(request).await {
            Ok(_) => Ok(()),
            Err(CallError::Status(failure)) if is_unauthenticated(&failure) => Ok(()),
            Err(err) => Err(map_call_error(err)),
        }
    }

    async fn exchange_code_for_session(
        &self,
        code: &AuthCode,
        verifier: &PkceVerifier,
    ) -> Result<AuthSession, AuthProviderError> {
        let body = PkceGrantDto {
            auth_code: code.expose(),
            code_verifier: verifier.expose(),
        };
        self.token_grant("pkce", &body)
            .await
            .map_err(map_call_error)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network auth error mapping.

    use super::*;
    use crate::outbound::supabase::http::map_status_error;
    use rstest::rstest;

    #[rstest]
    #[case(StatusCode::BAD_REQUEST, r#"{"error":"invalid_grant"}"#, "InvalidCredentials")]
    #[case(StatusCode::BAD_REQUEST, r#"{"code":400,"error_code":"invalid_credentials"}"#, "InvalidCredentials")]
    #[case(StatusCode::UNPROCESSABLE_ENTITY, r#"{"msg":"User already registered"}"#, "Rejected")]
    #[case(StatusCode::TOO_MANY_REQUESTS, "", "Rejected")]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, "oops", "Query")]
    fn statuses_map_to_provider_errors(
        #[case] status: StatusCode,
        #[case] body: &str,
        #[case] expected: &str,
    ) {
        let err = map_status_failure(map_status_error(status, body.as_bytes()));
        let actual = match err {
            AuthProviderError::InvalidCredentials => "InvalidCredentials",
            AuthProviderError::Rejected { .. } => "Rejected",
            AuthProviderError::Query { .. } => "Query",
            AuthProviderError::Connection { .. } => "Connection",
        };
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case(CallError::Timeout("10s".into()))]
    #[case(CallError::Transport("dns".into()))]
    fn transport_failures_are_connection_errors(#[case] err: CallError) {
        assert!(matches!(
            map_call_error(err),
            AuthProviderError::Connection { .. }
        ));
    }

    #[rstest]
    #[case(StatusCode::UNAUTHORIZED, true)]
    #[case(StatusCode::FORBIDDEN, true)]
    #[case(StatusCode::BAD_GATEWAY, false)]
    fn revoked_tokens_read_as_signed_out(#[case] status: StatusCode, #[case] expected: bool) {
        assert_eq!(is_unauthenticated(&map_status_error(status, b"")), expected);
    }
}
