//! reqwest client for the marketplace REST API.

use std::time::Duration;

use actix_web::cookie::Cookie;
use actix_web::cookie::time::Duration as CookieDuration;
use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::inbound::http::auth::{
    ConfirmationResponse, LoginPayload, SessionResponse, SignUpPayload, SignedInResponse,
};
use crate::inbound::http::parcels::{
    ListParcelsQuery, ParcelListResponse, ParcelPayload, SubmissionResponse,
};
use crate::inbound::http::users::{OwnedParcelResponse, UserResponse};

use super::session::{ClientSession, SessionHolder};

const DEFAULT_COOKIE_NAME: &str = "parcel_session";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Failures surfaced by [`MarketplaceClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a failure status.
    #[error("{message} ({status})")]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
    #[error("server response did not set the session cookie")]
    MissingSessionCookie,
    #[error("not signed in")]
    NotSignedIn,
}

impl ClientError {
    /// Machine-readable failure code reported by the server, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Failure body shared by the error envelope and submission failures.
#[derive(Debug, Default, Deserialize)]
struct FailureBody {
    code: Option<String>,
    message: Option<String>,
}

fn api_error(status: StatusCode, body: &[u8]) -> ClientError {
    let parsed: FailureBody = serde_json::from_slice(body).unwrap_or_default();
    ClientError::Api {
        status,
        code: parsed.code,
        message: parsed.message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned()
        }),
    }
}

/// `name=value` of the session cookie set by a response, if any.
///
/// Removal cookies (empty value or a non-positive `Max-Age`) are skipped.
fn session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| Cookie::parse(value).ok())
        .find(|cookie| {
            cookie.name() == cookie_name
                && !cookie.value().is_empty()
                && cookie.max_age().is_none_or(|age| age > CookieDuration::ZERO)
        })
        .map(|cookie| cookie.stripped().to_string())
}

/// Result of a registration.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Signed in immediately; the session is now held.
    SignedIn(UserResponse),
    /// A confirmation email was sent.
    ConfirmationPending { message: String },
}

/// Typed client for `/api/v1`.
pub struct MarketplaceClient {
    http: reqwest::Client,
    base: Url,
    cookie_name: String,
    session: SessionHolder,
}

impl MarketplaceClient {
    /// Client for the server at `base_url` with the default timeout.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base,
            cookie_name: DEFAULT_COOKIE_NAME.to_owned(),
            session: SessionHolder::new(),
        })
    }

    /// Name of the server's session cookie when it is not the default.
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Signed-in state owned by this client.
    pub fn session(&self) -> &SessionHolder {
        &self.session
    }

    /// Close session subscriptions and drop the client.
    pub fn shutdown(self) {
        self.session.shutdown();
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self.base.join(path)?;
        let builder = self.http.request(method, url);
        Ok(match self.session.current() {
            Some(session) => builder.header(COOKIE, session.cookie()),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            return Ok(response);
        }
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), "marketplace request failed");
        Err(api_error(status, &body))
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        Ok(self.send(builder).await?.json().await?)
    }

    fn hold(&self, headers: &HeaderMap, user: UserResponse) -> Result<(), ClientError> {
        let cookie = session_cookie(headers, &self.cookie_name)
            .or_else(|| self.session.current().map(|held| held.cookie().to_owned()))
            .ok_or(ClientError::MissingSessionCookie)?;
        self.session.set_session(ClientSession::new(cookie, user));
        Ok(())
    }

    /// Register an account.
    pub async fn sign_up(&self, payload: &SignUpPayload) -> Result<SignUpOutcome, ClientError> {
        let response = self
            .send(self.request(Method::POST, "api/v1/auth/signup")?.json(payload))
            .await?;
        if response.status() == StatusCode::ACCEPTED {
            let body: ConfirmationResponse = response.json().await?;
            return Ok(SignUpOutcome::ConfirmationPending {
                message: body.message,
            });
        }
        let headers = response.headers().clone();
        let body: SignedInResponse = response.json().await?;
        self.hold(&headers, body.user.clone())?;
        Ok(SignUpOutcome::SignedIn(body.user))
    }

    /// Sign in and hold the resulting session.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserResponse, ClientError> {
        let payload = LoginPayload {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let response = self
            .send(self.request(Method::POST, "api/v1/auth/login")?.json(&payload))
            .await?;
        let headers = response.headers().clone();
        let body: SignedInResponse = response.json().await?;
        self.hold(&headers, body.user.clone())?;
        Ok(body.user)
    }

    /// Sign out. Local state is cleared whatever the server answers.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = match self.request(Method::POST, "api/v1/auth/logout") {
            Ok(builder) => self.send(builder).await.map(drop),
            Err(err) => Err(err),
        };
        self.session.clear();
        if let Err(error) = &result {
            warn!(error = %error, "server sign-out failed");
        }
        result
    }

    /// Re-read the session from the server, picking up rotated cookies.
    ///
    /// A 401 clears the held session.
    pub async fn refresh_session(&self) -> Result<SessionResponse, ClientError> {
        if self.session.current().is_none() {
            return Err(ClientError::NotSignedIn);
        }
        let response = match self
            .send(self.request(Method::GET, "api/v1/auth/session")?)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                if let ClientError::Api {
                    status: StatusCode::UNAUTHORIZED,
                    ..
                } = err
                {
                    self.session.clear();
                }
                return Err(err);
            }
        };
        let headers = response.headers().clone();
        let body: SessionResponse = response.json().await?;
        self.hold(&headers, body.user.clone())?;
        Ok(body)
    }

    pub async fn current_user(&self) -> Result<UserResponse, ClientError> {
        self.json(self.request(Method::GET, "api/v1/users/me")?).await
    }

    pub async fn owned_parcels(&self) -> Result<Vec<OwnedParcelResponse>, ClientError> {
        self.json(self.request(Method::GET, "api/v1/users/me/parcels")?)
            .await
    }

    /// Browse published parcels.
    pub async fn list_parcels(
        &self,
        query: &ListParcelsQuery,
    ) -> Result<ParcelListResponse, ClientError> {
        self.json(self.request(Method::GET, "api/v1/parcels")?.query(query))
            .await
    }

    /// Submit a parcel as the signed-in user.
    ///
    /// Workflow failures come back as [`ClientError::Api`] with the failure
    /// kind (for example `validation_error`) as the code.
    pub async fn submit_parcel(
        &self,
        payload: &ParcelPayload,
    ) -> Result<SubmissionResponse, ClientError> {
        self.json(self.request(Method::POST, "api/v1/parcels")?.json(payload))
            .await
    }
}
