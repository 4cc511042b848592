//! Account HTTP handlers.
//!
//! ```text
//! POST /api/v1/auth/signup
//! POST /api/v1/auth/login
//! POST /api/v1/auth/logout
//! GET  /api/v1/auth/session
//! GET  /auth/callback?code=
//! ```
//!
//! Handlers validate payloads into domain requests, call the
//! [`AccountService`](crate::domain::ports::AccountService) port and store
//! the resulting provider credentials in the session cookie. Sign-up sends a
//! PKCE challenge and parks its verifier in the cookie until the callback.

use actix_web::{HttpResponse, get, http::header, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::SignUpResult;
use crate::domain::{
    AuthCode, AuthValidationError, Error, LoginCredentials, PkceVerifier, SignUpRequest,
    UserMetadata, UserValidationError,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::UserResponse;

/// Landing page after a confirmation link was exchanged.
pub const POST_CONFIRMATION_PATH: &str = "/dashboard";
/// Fallback page when the confirmation link is unusable.
pub const HOME_PATH: &str = "/";

/// Registration payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpPayload {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_landlord: bool,
    #[serde(default)]
    pub account_type: Option<String>,
}

impl SignUpPayload {
    fn into_request(self) -> Result<SignUpRequest, AuthValidationError> {
        let metadata = UserMetadata {
            full_name: self
                .full_name
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty()),
            is_landlord: self.is_landlord,
            account_type: self.account_type.filter(|kind| !kind.trim().is_empty()),
        };
        SignUpRequest::try_new(&self.email, &self.password, metadata)
    }
}

/// Password login payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

/// Body returned once a session cookie has been set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignedInResponse {
    pub user: UserResponse,
}

/// Body returned when the provider emailed a confirmation link.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmationResponse {
    pub message: String,
}

/// Current session summary.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: UserResponse,
    pub expires_at: DateTime<Utc>,
}

/// Query string of the confirmation link.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct CallbackQuery {
    /// One-time authorisation code issued by the auth provider.
    pub code: Option<String>,
}

/// Render an auth payload validation failure as a 400 envelope.
pub(crate) fn map_auth_validation_error(err: AuthValidationError) -> Error {
    let (field, code) = match &err {
        AuthValidationError::InvalidEmail(UserValidationError::EmptyEmail) => {
            ("email", "empty_email")
        }
        AuthValidationError::InvalidEmail(_) => ("email", "invalid_email"),
        AuthValidationError::EmptyPassword => ("password", "empty_password"),
        AuthValidationError::PasswordTooShort { .. } => ("password", "password_too_short"),
        AuthValidationError::EmptyCode => ("code", "empty_code"),
        AuthValidationError::EmptyToken => ("token", "empty_token"),
        AuthValidationError::InvalidCodeVerifier => ("code_verifier", "invalid_code_verifier"),
    };
    let mut details = json!({ "field": field, "code": code });
    if let AuthValidationError::PasswordTooShort { min } = err {
        details["min"] = json!(min);
    }
    Error::invalid_request(err.to_string()).with_details(details)
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Register a new account.
///
/// Providers that confirm by email answer 202 and the link in the email
/// points at `/auth/callback`; the cookie then carries only the PKCE
/// verifier. Providers that sign the user in at once answer 200 and set the
/// session cookie.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignUpPayload,
    responses(
        (status = 200, description = "Account created and signed in", body = SignedInResponse),
        (status = 202, description = "Confirmation email sent", body = ConfirmationResponse),
        (status = 400, description = "Invalid email or password", body = ErrorSchema),
        (status = 401, description = "Provider rejected the registration", body = ErrorSchema),
        (status = 503, description = "Auth provider unavailable", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "signUp",
    security([])
)]
#[post("/auth/signup")]
pub async fn sign_up(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SignUpPayload>,
) -> ApiResult<HttpResponse> {
    let mut request = payload
        .into_inner()
        .into_request()
        .map_err(map_auth_validation_error)?;
    if let Some(callback) = state.auth_callback_url() {
        request = request.with_email_redirect(callback);
    }
    let verifier = PkceVerifier::generate();
    let request = request.with_code_challenge(verifier.challenge());
    match state.accounts.sign_up(request).await? {
        SignUpResult::SignedIn(auth) => {
            session.persist(&auth)?;
            Ok(HttpResponse::Ok().json(SignedInResponse {
                user: UserResponse::from(auth.user()),
            }))
        }
        SignUpResult::ConfirmationSent { user } => {
            debug!(user_id = %user.id(), "confirmation email pending");
            session.store_pkce_verifier(&verifier)?;
            Ok(HttpResponse::Accepted().json(ConfirmationResponse {
                message: "Check your email to confirm your account".to_owned(),
            }))
        }
    }
}

/// Sign in with email and password.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Signed in", body = SignedInResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid credentials", body = ErrorSchema),
        (status = 503, description = "Auth provider unavailable", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginPayload>,
) -> ApiResult<web::Json<SignedInResponse>> {
    let LoginPayload { email, password } = payload.into_inner();
    let credentials =
        LoginCredentials::try_from_parts(&email, &password).map_err(map_auth_validation_error)?;
    let auth = state.accounts.sign_in(credentials).await?;
    session.persist(&auth)?;
    Ok(web::Json(SignedInResponse {
        user: UserResponse::from(auth.user()),
    }))
}

/// Sign out. The cookie is purged even when the provider call fails.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 204, description = "Signed out")),
    tags = ["auth"],
    operation_id = "logout"
)]
#[post("/auth/logout")]
pub async fn logout(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    if let Some(handle) = session.handle()?
        && let Err(error) = state.accounts.sign_out(&handle).await
    {
        warn!(error = %error, "provider sign-out failed; clearing local session anyway");
    }
    session.purge();
    Ok(HttpResponse::NoContent().finish())
}

/// Return the caller's session, refreshing the cookie when the provider
/// rotated the tokens.
#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    responses(
        (status = 200, description = "Active session", body = SessionResponse),
        (status = 401, description = "No active session", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "currentSession"
)]
#[get("/auth/session")]
pub async fn current_session(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<SessionResponse>> {
    let handle = session.handle()?;
    let auth = state.accounts.current_session(handle.as_ref()).await?;
    let rotated = handle
        .as_ref()
        .is_none_or(|held| held.access_token() != auth.access_token());
    if rotated {
        session.persist(&auth)?;
    }
    Ok(web::Json(SessionResponse {
        user: UserResponse::from(auth.user()),
        expires_at: auth.expires_at(),
    }))
}

/// Exchange the code from a confirmation link and redirect.
///
/// Success lands on the dashboard with a fresh session cookie. A missing,
/// blank or rejected code sends the visitor home, as does a browser that no
/// longer holds the sign-up verifier.
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Redirect to the dashboard or the home page")
    ),
    tags = ["auth"],
    operation_id = "authCallback",
    security([])
)]
#[get("/auth/callback")]
pub async fn auth_callback(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<CallbackQuery>,
) -> HttpResponse {
    let Some(code) = query.into_inner().code.and_then(|code| AuthCode::new(code).ok()) else {
        debug!("auth callback without a usable code");
        return see_other(HOME_PATH);
    };
    let Some(verifier) = session.take_pkce_verifier() else {
        warn!("auth callback without a pending code verifier");
        return see_other(HOME_PATH);
    };
    let auth = match state.accounts.exchange_code(code, verifier).await {
        Ok(auth) => auth,
        Err(error) => {
            warn!(error = %error, "auth code exchange failed");
            return see_other(HOME_PATH);
        }
    };
    match session.persist(&auth) {
        Ok(()) => see_other(POST_CONFIRMATION_PATH),
        Err(error) => {
            warn!(error = %error, "could not store exchanged session");
            see_other(HOME_PATH)
        }
    }
}
