//! Cookie-backed storage for the caller's auth provider credentials.
//!
//! The cookie is signed and encrypted by `actix-session`. Handlers never see
//! the raw keys; they persist an [`AuthSession`] after login and read back a
//! [`SessionHandle`] that the domain validates. Between sign-up and the
//! confirmation callback the cookie holds only the PKCE verifier.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use chrono::{DateTime, Utc};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{AccessToken, AuthSession, Error, PkceVerifier, RefreshToken, SessionHandle};

pub(crate) const ACCESS_TOKEN_KEY: &str = "access_token";
pub(crate) const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub(crate) const EXPIRES_AT_KEY: &str = "expires_at";
pub(crate) const PKCE_VERIFIER_KEY: &str = "pkce_verifier";

/// Session wrapper exposing credential-level operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Store the provider credentials of a freshly established session.
    pub fn persist(&self, session: &AuthSession) -> Result<(), Error> {
        self.0.renew();
        self.insert(ACCESS_TOKEN_KEY, session.access_token().expose())?;
        match session.refresh_token() {
            Some(refresh) => self.insert(REFRESH_TOKEN_KEY, refresh.expose())?,
            None => {
                self.0.remove(REFRESH_TOKEN_KEY);
            }
        }
        self.0
            .insert(EXPIRES_AT_KEY, session.expires_at().timestamp())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    fn insert(&self, key: &str, value: &str) -> Result<(), Error> {
        self.0
            .insert(key, value)
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Keep the verifier whose challenge went out with a sign-up.
    pub fn store_pkce_verifier(&self, verifier: &PkceVerifier) -> Result<(), Error> {
        self.insert(PKCE_VERIFIER_KEY, verifier.expose())
    }

    /// Remove and return the pending verifier. Unreadable values count as absent.
    pub fn take_pkce_verifier(&self) -> Option<PkceVerifier> {
        let raw = match self.0.remove_as::<String>(PKCE_VERIFIER_KEY)? {
            Ok(raw) => raw,
            Err(_) => {
                warn!("session cookie with undecodable verifier ignored");
                return None;
            }
        };
        PkceVerifier::new(raw)
            .inspect_err(|_| warn!("session cookie with malformed verifier ignored"))
            .ok()
    }

    /// Credentials stored in the cookie, if any.
    ///
    /// A cookie that decrypts but does not hold a usable access token or
    /// expiry is treated as absent.
    pub fn handle(&self) -> Result<Option<SessionHandle>, Error> {
        let read_err = |error| Error::internal(format!("failed to read session: {error}"));
        let Some(access) = self.0.get::<String>(ACCESS_TOKEN_KEY).map_err(read_err)? else {
            return Ok(None);
        };
        let Some(expires_at) = self.0.get::<i64>(EXPIRES_AT_KEY).map_err(read_err)? else {
            warn!("session cookie without expiry ignored");
            return Ok(None);
        };
        let Some(expires_at) = DateTime::<Utc>::from_timestamp(expires_at, 0) else {
            warn!("session cookie with out-of-range expiry ignored");
            return Ok(None);
        };
        let Ok(access) = AccessToken::new(access) else {
            warn!("session cookie with blank access token ignored");
            return Ok(None);
        };
        let refresh = self
            .0
            .get::<String>(REFRESH_TOKEN_KEY)
            .map_err(read_err)?
            .and_then(RefreshToken::new);
        Ok(Some(SessionHandle::new(access, refresh, expires_at)))
    }

    /// Forget the credentials and expire the cookie.
    pub fn purge(&self) {
        self.0.purge();
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
