//! Authentication primitives: credentials, sign-up requests and sessions.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before a handler talks to a port or service.
//! Secrets live in [`Zeroizing`] buffers and are redacted from `Debug`.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::domain::user::{Email, UserIdentity, UserMetadata, UserValidationError};

/// Minimum password length accepted at sign-up.
pub const PASSWORD_MIN_LEN: usize = 6;

const VERIFIER_MIN_LEN: usize = 43;
const VERIFIER_MAX_LEN: usize = 128;
const GENERATED_VERIFIER_LEN: usize = 64;

/// Domain error returned when authentication payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthValidationError {
    /// Email was missing or malformed.
    InvalidEmail(UserValidationError),
    /// Password was blank.
    EmptyPassword,
    /// Password is shorter than [`PASSWORD_MIN_LEN`] at sign-up.
    PasswordTooShort { min: usize },
    /// Authorisation code from the confirmation link was blank.
    EmptyCode,
    /// Access token was blank.
    EmptyToken,
    /// PKCE verifier has the wrong length or characters outside the
    /// unreserved URI set.
    InvalidCodeVerifier,
}

impl fmt::Display for AuthValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmail(inner) => write!(f, "{inner}"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
            Self::PasswordTooShort { min } => {
                write!(f, "password must be at least {min} characters")
            }
            Self::EmptyCode => write!(f, "authorisation code must not be empty"),
            Self::EmptyToken => write!(f, "access token must not be empty"),
            Self::InvalidCodeVerifier => write!(
                f,
                "code verifier must be {VERIFIER_MIN_LEN} to {VERIFIER_MAX_LEN} unreserved characters"
            ),
        }
    }
}

impl std::error::Error for AuthValidationError {}

/// Validated email/password pair.
///
/// ## Invariants
/// - `email` satisfies [`Email`] validation.
/// - `password` is non-empty but keeps caller-provided whitespace.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: Email,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw inputs.
    ///
    /// # Examples
    /// ```
    /// use parcel_market::domain::LoginCredentials;
    ///
    /// let creds = LoginCredentials::try_from_parts(" ada@example.com", "secret").unwrap();
    /// assert_eq!(creds.email().as_ref(), "ada@example.com");
    /// ```
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, AuthValidationError> {
        let email = Email::new(email).map_err(AuthValidationError::InvalidEmail)?;
        if password.is_empty() {
            return Err(AuthValidationError::EmptyPassword);
        }
        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Email used to sign in.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Password provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration request forwarded to the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    credentials: LoginCredentials,
    metadata: UserMetadata,
    email_redirect_to: Option<String>,
    code_challenge: Option<PkceChallenge>,
}

impl SignUpRequest {
    /// Validate registration inputs.
    pub fn try_new(
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<Self, AuthValidationError> {
        let credentials = LoginCredentials::try_from_parts(email, password)?;
        if password.chars().count() < PASSWORD_MIN_LEN {
            return Err(AuthValidationError::PasswordTooShort {
                min: PASSWORD_MIN_LEN,
            });
        }
        Ok(Self {
            credentials,
            metadata,
            email_redirect_to: None,
            code_challenge: None,
        })
    }

    /// Set the URL the confirmation email links back to.
    #[must_use]
    pub fn with_email_redirect(mut self, url: impl Into<String>) -> Self {
        self.email_redirect_to = Some(url.into());
        self
    }

    /// Credentials for the new account.
    pub fn credentials(&self) -> &LoginCredentials {
        &self.credentials
    }

    /// Profile metadata stored with the identity.
    pub fn metadata(&self) -> &UserMetadata {
        &self.metadata
    }

    /// Confirmation redirect target, if any.
    pub fn email_redirect_to(&self) -> Option<&str> {
        self.email_redirect_to.as_deref()
    }

    /// Ask the provider for a PKCE confirmation link bound to `challenge`.
    #[must_use]
    pub fn with_code_challenge(mut self, challenge: PkceChallenge) -> Self {
        self.code_challenge = Some(challenge);
        self
    }

    /// PKCE challenge the confirmation code is bound to, if any.
    pub fn code_challenge(&self) -> Option<&PkceChallenge> {
        self.code_challenge.as_ref()
    }
}

/// PKCE code verifier (RFC 7636).
///
/// Generated at sign-up and kept in the caller's session cookie until the
/// confirmation link comes back; the provider only ever sees its
/// [`PkceChallenge`] before the code exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct PkceVerifier(Zeroizing<String>);

impl PkceVerifier {
    /// Fresh random verifier.
    pub fn generate() -> Self {
        let raw: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_VERIFIER_LEN)
            .map(char::from)
            .collect();
        Self(Zeroizing::new(raw))
    }

    /// Wrap a stored verifier.
    ///
    /// # Examples
    /// ```
    /// use parcel_market::domain::PkceVerifier;
    ///
    /// assert!(PkceVerifier::new("too-short").is_err());
    /// assert!(PkceVerifier::new("a".repeat(43)).is_ok());
    /// ```
    pub fn new(raw: impl Into<String>) -> Result<Self, AuthValidationError> {
        let raw = raw.into();
        let unreserved = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~');
        if !(VERIFIER_MIN_LEN..=VERIFIER_MAX_LEN).contains(&raw.len()) || !raw.chars().all(unreserved)
        {
            return Err(AuthValidationError::InvalidCodeVerifier);
        }
        Ok(Self(Zeroizing::new(raw)))
    }

    /// Raw verifier for the code exchange and cookie storage.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// S256 challenge: unpadded base64url of the verifier's SHA-256 digest.
    pub fn challenge(&self) -> PkceChallenge {
        let digest = Sha256::digest(self.0.as_bytes());
        PkceChallenge(URL_SAFE_NO_PAD.encode(digest))
    }
}

impl fmt::Debug for PkceVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PkceVerifier(<redacted>)")
    }
}

/// S256 PKCE challenge derived from a [`PkceVerifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Challenge method name sent alongside the challenge.
    pub const METHOD: &'static str = "s256";

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Opaque bearer credential issued by the auth provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    /// Wrap a non-blank token.
    pub fn new(token: impl Into<String>) -> Result<Self, AuthValidationError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AuthValidationError::EmptyToken);
        }
        Ok(Self(Zeroizing::new(token)))
    }

    /// Raw token for transport headers.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Refresh credential issued alongside the access token.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken(Zeroizing<String>);

impl RefreshToken {
    /// Wrap a refresh token; blank input yields `None`.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        (!token.trim().is_empty()).then(|| Self(Zeroizing::new(token)))
    }

    /// Raw token for transport.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken(<redacted>)")
    }
}

/// One-time code carried by the email confirmation link.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthCode(Zeroizing<String>);

impl AuthCode {
    /// Wrap a non-blank code.
    pub fn new(code: impl Into<String>) -> Result<Self, AuthValidationError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(AuthValidationError::EmptyCode);
        }
        Ok(Self(Zeroizing::new(code)))
    }

    /// Raw code for the exchange request.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AuthCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthCode(<redacted>)")
    }
}

/// Authenticated session as issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    access_token: AccessToken,
    refresh_token: Option<RefreshToken>,
    expires_at: DateTime<Utc>,
    user: UserIdentity,
}

impl AuthSession {
    /// Assemble a session.
    pub fn new(
        access_token: AccessToken,
        refresh_token: Option<RefreshToken>,
        expires_at: DateTime<Utc>,
        user: UserIdentity,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at,
            user,
        }
    }

    /// Bearer credential for provider calls.
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Refresh credential, if issued.
    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    /// Instant after which the access token is no longer valid.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Identity the session belongs to.
    pub fn user(&self) -> &UserIdentity {
        &self.user
    }

    /// Whether the session is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Lightweight handle kept by inbound adapters between requests.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// The part of a session an inbound adapter persists between requests.
///
/// The identity is not stored; the gate re-resolves it from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    access_token: AccessToken,
    refresh_token: Option<RefreshToken>,
    expires_at: DateTime<Utc>,
}

impl SessionHandle {
    /// Rebuild a handle from persisted parts.
    pub fn new(
        access_token: AccessToken,
        refresh_token: Option<RefreshToken>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Bearer credential for provider calls.
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Refresh credential, if issued.
    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    /// Expiry instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the handle is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
