//! Auth provider simulation with password accounts and opaque tokens.
//!
//! Accounts are keyed by lower-cased email. Tokens are random UUIDs that
//! expire after a fixed lifetime measured with the injected clock. Sign-up
//! either confirms immediately or issues a one-time code that
//! [`MemoryAuthProvider::pending_code`] exposes for local use. A code is
//! bound to the PKCE challenge sent at sign-up and only a matching verifier
//! redeems it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Duration;
use mockable::Clock;
use tracing::{debug, info};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::POISONED;
use crate::domain::ports::{AuthProvider, AuthProviderError, SignUpOutcome};
use crate::domain::{
    AccessToken, AuthCode, AuthSession, Email, LoginCredentials, PkceChallenge, PkceVerifier,
    RefreshToken, SessionHandle, SignUpRequest, UserId, UserIdentity,
};

const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;

struct Account {
    identity: UserIdentity,
    password: Zeroizing<String>,
    confirmed: bool,
}

struct Grant {
    user_id: UserId,
    refresh: Option<String>,
    expires_at: chrono::DateTime<chrono::Utc>,
}

struct PendingCode {
    owner: String,
    challenge: Option<PkceChallenge>,
}

#[derive(Default)]
struct Directory {
    accounts: HashMap<String, Account>,
    access: HashMap<String, Grant>,
    refresh: HashMap<String, UserId>,
    codes: HashMap<String, PendingCode>,
}

impl Directory {
    fn account_by_id(&self, id: &UserId) -> Option<&Account> {
        self.accounts
            .values()
            .find(|account| account.identity.id() == id)
    }
}

/// In-process [`AuthProvider`].
pub struct MemoryAuthProvider {
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
    auto_confirm: bool,
    directory: Mutex<Directory>,
}

impl MemoryAuthProvider {
    /// Provider that confirms accounts at sign-up.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            auto_confirm: true,
            directory: Mutex::new(Directory::default()),
        }
    }

    /// Require the emailed code to be exchanged before sign-in works.
    pub fn requiring_confirmation(mut self) -> Self {
        self.auto_confirm = false;
        self
    }

    /// Override the access token lifetime.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Confirmation code awaiting exchange for `email`.
    pub fn pending_code(&self, email: &Email) -> Option<String> {
        let directory = self.directory.lock().ok()?;
        let key = email_key(email);
        directory
            .codes
            .iter()
            .find(|(_, pending)| pending.owner == key)
            .map(|(code, _)| code.clone())
    }

    fn directory(&self) -> Result<MutexGuard<'_, Directory>, AuthProviderError> {
        self.directory
            .lock()
            .map_err(|_| AuthProviderError::connection(POISONED))
    }

    fn issue(&self, directory: &mut Directory, identity: &UserIdentity) -> Result<AuthSession, AuthProviderError> {
        let access = random_token();
        let refresh = random_token();
        let expires_at = self.clock.utc() + self.session_ttl;
        directory.access.insert(
            access.clone(),
            Grant {
                user_id: identity.id().clone(),
                refresh: Some(refresh.clone()),
                expires_at,
            },
        );
        directory
            .refresh
            .insert(refresh.clone(), identity.id().clone());
        let access = AccessToken::new(access).map_err(|err| AuthProviderError::query(err.to_string()))?;
        Ok(AuthSession::new(
            access,
            RefreshToken::new(refresh),
            expires_at,
            identity.clone(),
        ))
    }
}

fn email_key(email: &Email) -> String {
    email.as_ref().to_lowercase()
}

fn random_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpOutcome, AuthProviderError> {
        let mut directory = self.directory()?;
        let email = request.credentials().email();
        let key = email_key(email);
        if directory.accounts.contains_key(&key) {
            return Err(AuthProviderError::rejected("user already registered"));
        }
        let identity = UserIdentity::new(
            UserId::random(),
            Some(email.clone()),
            request.metadata().clone(),
        );
        directory.accounts.insert(
            key.clone(),
            Account {
                identity: identity.clone(),
                password: Zeroizing::new(request.credentials().password().to_owned()),
                confirmed: self.auto_confirm,
            },
        );
        info!(user_id = %identity.id(), "registered in-memory account");

        if self.auto_confirm {
            let session = self.issue(&mut directory, &identity)?;
            return Ok(SignUpOutcome {
                user: identity,
                session: Some(session),
            });
        }
        directory.codes.insert(
            random_token(),
            PendingCode {
                owner: key,
                challenge: request.code_challenge().cloned(),
            },
        );
        debug!(
            redirect = request.email_redirect_to().unwrap_or("-"),
            "confirmation code issued"
        );
        Ok(SignUpOutcome {
            user: identity,
            session: None,
        })
    }

    async fn sign_in_with_password(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<AuthSession, AuthProviderError> {
        let mut directory = self.directory()?;
        let identity = match directory.accounts.get(&email_key(credentials.email())) {
            Some(account) if account.password.as_str() == credentials.password() => {
                if !account.confirmed {
                    return Err(AuthProviderError::rejected("email not confirmed"));
                }
                account.identity.clone()
            }
            _ => return Err(AuthProviderError::invalid_credentials()),
        };
        self.issue(&mut directory, &identity)
    }

    async fn get_session(
        &self,
        handle: &SessionHandle,
    ) -> Result<Option<AuthSession>, AuthProviderError> {
        let now = self.clock.utc();
        let mut directory = self.directory()?;
        if let Some(grant) = directory.access.get(handle.access_token().expose())
            && grant.expires_at > now
        {
            let Some(account) = directory.account_by_id(&grant.user_id) else {
                return Ok(None);
            };
            let access = AccessToken::new(handle.access_token().expose())
                .map_err(|err| AuthProviderError::query(err.to_string()))?;
            return Ok(Some(AuthSession::new(
                access,
                grant.refresh.clone().and_then(RefreshToken::new),
                grant.expires_at,
                account.identity.clone(),
            )));
        }

        // Expired or unknown access token: rotate through the refresh token.
        let Some(refresh) = handle.refresh_token() else {
            return Ok(None);
        };
        let Some(user_id) = directory.refresh.remove(refresh.expose()) else {
            return Ok(None);
        };
        directory.access.remove(handle.access_token().expose());
        let Some(identity) = directory
            .account_by_id(&user_id)
            .map(|account| account.identity.clone())
        else {
            return Ok(None);
        };
        self.issue(&mut directory, &identity).map(Some)
    }

    async fn get_user(
        &self,
        token: &AccessToken,
    ) -> Result<Option<UserIdentity>, AuthProviderError> {
        let now = self.clock.utc();
        let directory = self.directory()?;
        Ok(directory
            .access
            .get(token.expose())
            .filter(|grant| grant.expires_at > now)
            .and_then(|grant| directory.account_by_id(&grant.user_id))
            .map(|account| account.identity.clone()))
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), AuthProviderError> {
        let mut directory = self.directory()?;
        if let Some(grant) = directory.access.remove(token.expose())
            && let Some(refresh) = grant.refresh
        {
            directory.refresh.remove(&refresh);
        }
        Ok(())
    }

    async fn exchange_code_for_session(
        &self,
        code: &AuthCode,
        verifier: &PkceVerifier,
    ) -> Result<AuthSession, AuthProviderError> {
        let mut directory = self.directory()?;
        let Some(pending) = directory.codes.get(code.expose()) else {
            return Err(AuthProviderError::rejected("invalid or expired code"));
        };
        // A wrong verifier leaves the code redeemable by its rightful holder.
        if pending.challenge.as_ref() != Some(&verifier.challenge()) {
            return Err(AuthProviderError::rejected("code verifier does not match"));
        }
        let Some(PendingCode { owner: key, .. }) = directory.codes.remove(code.expose()) else {
            return Err(AuthProviderError::rejected("invalid or expired code"));
        };
        let Some(account) = directory.accounts.get_mut(&key) else {
            return Err(AuthProviderError::rejected("invalid or expired code"));
        };
        account.confirmed = true;
        let identity = account.identity.clone();
        self.issue(&mut directory, &identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserMetadata;
    use crate::domain::test_support::SteppingClock;
    use chrono::Utc;
    use rstest::rstest;

    fn sign_up_request(email: &str) -> SignUpRequest {
        SignUpRequest::try_new(email, "secret1", UserMetadata::default()).expect("request")
    }

    fn pkce_sign_up(email: &str, verifier: &PkceVerifier) -> SignUpRequest {
        sign_up_request(email).with_code_challenge(verifier.challenge())
    }

    fn credentials(email: &str, password: &str) -> LoginCredentials {
        LoginCredentials::try_from_parts(email, password).expect("credentials")
    }

    fn provider() -> MemoryAuthProvider {
        MemoryAuthProvider::new(Arc::new(SteppingClock::starting_at(Utc::now())))
    }

    #[rstest]
    #[tokio::test]
    async fn auto_confirmed_sign_up_returns_a_usable_session() {
        let auth = provider();
        let outcome = auth
            .sign_up(&sign_up_request("ada@example.com"))
            .await
            .expect("sign up");
        let session = outcome.session.expect("session");

        let user = auth
            .get_user(session.access_token())
            .await
            .expect("lookup")
            .expect("known token");
        assert_eq!(user.id(), outcome.user.id());
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_emails_are_rejected_case_insensitively() {
        let auth = provider();
        auth.sign_up(&sign_up_request("ada@example.com"))
            .await
            .expect("first");
        let err = auth
            .sign_up(&sign_up_request("Ada@Example.com"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, AuthProviderError::Rejected { .. }));
    }

    #[rstest]
    #[case("ada@example.com", "wrong")]
    #[case("bob@example.com", "secret1")]
    #[tokio::test]
    async fn bad_credentials_are_invalid(#[case] email: &str, #[case] password: &str) {
        let auth = provider();
        auth.sign_up(&sign_up_request("ada@example.com"))
            .await
            .expect("sign up");
        let err = auth
            .sign_in_with_password(&credentials(email, password))
            .await
            .expect_err("rejected");
        assert_eq!(err, AuthProviderError::InvalidCredentials);
    }

    #[rstest]
    #[tokio::test]
    async fn confirmation_code_unlocks_sign_in() {
        let auth = provider().requiring_confirmation();
        let verifier = PkceVerifier::generate();
        let outcome = auth
            .sign_up(&pkce_sign_up("ada@example.com", &verifier))
            .await
            .expect("sign up");
        assert!(outcome.session.is_none());

        let blocked = auth
            .sign_in_with_password(&credentials("ada@example.com", "secret1"))
            .await
            .expect_err("unconfirmed");
        assert!(matches!(blocked, AuthProviderError::Rejected { .. }));

        let email = Email::new("ada@example.com").expect("email");
        let code = auth.pending_code(&email).expect("code issued");
        auth.exchange_code_for_session(&AuthCode::new(code.clone()).expect("code"), &verifier)
            .await
            .expect("exchanged");
        assert!(auth.pending_code(&email).is_none());

        let reused = auth
            .exchange_code_for_session(&AuthCode::new(code).expect("code"), &verifier)
            .await
            .expect_err("single use");
        assert!(matches!(reused, AuthProviderError::Rejected { .. }));

        auth.sign_in_with_password(&credentials("ada@example.com", "secret1"))
            .await
            .expect("confirmed sign in");
    }

    #[rstest]
    #[tokio::test]
    async fn a_foreign_verifier_does_not_redeem_the_code() {
        let auth = provider().requiring_confirmation();
        let verifier = PkceVerifier::generate();
        auth.sign_up(&pkce_sign_up("ada@example.com", &verifier))
            .await
            .expect("sign up");
        let email = Email::new("ada@example.com").expect("email");
        let code = AuthCode::new(auth.pending_code(&email).expect("code")).expect("code");

        let err = auth
            .exchange_code_for_session(&code, &PkceVerifier::generate())
            .await
            .expect_err("mismatched verifier");
        assert!(matches!(err, AuthProviderError::Rejected { .. }));
        assert!(auth.pending_code(&email).is_some(), "code survives a mismatch");

        auth.exchange_code_for_session(&code, &verifier)
            .await
            .expect("rightful verifier");
    }

    #[rstest]
    #[tokio::test]
    async fn codes_issued_without_a_challenge_cannot_be_exchanged() {
        let auth = provider().requiring_confirmation();
        auth.sign_up(&sign_up_request("ada@example.com"))
            .await
            .expect("sign up");
        let email = Email::new("ada@example.com").expect("email");
        let code = AuthCode::new(auth.pending_code(&email).expect("code")).expect("code");

        let err = auth
            .exchange_code_for_session(&code, &PkceVerifier::generate())
            .await
            .expect_err("no challenge on record");
        assert!(matches!(err, AuthProviderError::Rejected { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn expired_access_tokens_refresh_through_get_session() {
        let auth = provider().with_session_ttl(Duration::seconds(1));
        let session = auth
            .sign_up(&sign_up_request("ada@example.com"))
            .await
            .expect("sign up")
            .session
            .expect("session");
        assert!(
            auth.get_user(session.access_token())
                .await
                .expect("lookup")
                .is_none(),
            "stepping clock has moved past the one second lifetime"
        );

        let refreshed = auth
            .get_session(&session.handle())
            .await
            .expect("lookup")
            .expect("refreshed");
        assert_ne!(
            refreshed.access_token().expose(),
            session.access_token().expose()
        );
        assert!(
            auth.get_session(&session.handle())
                .await
                .expect("lookup")
                .is_none(),
            "refresh tokens are single use"
        );
    }

    #[rstest]
    #[tokio::test]
    async fn sign_out_revokes_the_token() {
        let auth = provider();
        let session = auth
            .sign_up(&sign_up_request("ada@example.com"))
            .await
            .expect("sign up")
            .session
            .expect("session");
        auth.sign_out(session.access_token()).await.expect("signed out");

        assert!(auth.get_user(session.access_token()).await.expect("lookup").is_none());
        assert!(auth.get_session(&session.handle()).await.expect("lookup").is_none());
    }
}
