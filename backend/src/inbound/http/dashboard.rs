//! Owner dashboard and the request gate in front of it.
//!
//! [`DashboardGate`] only checks that the session cookie carries credentials;
//! visitors without them are sent to `/login?redirectedFrom=<path>` before
//! any handler runs. The handler then resolves the identity with the auth
//! provider and redirects the same way when the credentials turn out stale.
//!
//! `/dashboard/tenant` is reserved for tenant accounts: stale credentials go
//! to `/login` and every other account type back to `/dashboard`.

use std::task::{Context, Poll};

use actix_session::SessionExt;
use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::form_urlencoded;
use utoipa::ToSchema;

use crate::domain::{ErrorCode, UserMetadata};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::OwnedParcelResponse;

/// Login page visitors are redirected to.
pub const LOGIN_PATH: &str = "/login";
/// Mount point of the gated area.
pub const DASHBOARD_PATH: &str = "/dashboard";
/// Tenant page, relative to [`DASHBOARD_PATH`].
pub const TENANT_SUBPATH: &str = "/tenant";

/// `303 See Other` to the login page, remembering where the visitor was going.
///
/// # Examples
/// ```
/// use parcel_market::inbound::http::dashboard::login_redirect;
///
/// let res = login_redirect("/dashboard/terrains");
/// let location = res.headers().get("location").unwrap().to_str().unwrap();
/// assert_eq!(location, "/login?redirectedFrom=%2Fdashboard%2Fterrains");
/// ```
pub fn login_redirect(original_path: &str) -> HttpResponse {
    let target: String = form_urlencoded::byte_serialize(original_path.as_bytes()).collect();
    HttpResponse::SeeOther()
        .insert_header((
            header::LOCATION,
            format!("{LOGIN_PATH}?redirectedFrom={target}"),
        ))
        .finish()
}

/// Middleware redirecting requests without session credentials.
#[derive(Clone, Copy, Default)]
pub struct DashboardGate;

impl<S, B> Transform<S, ServiceRequest> for DashboardGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = DashboardGateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(DashboardGateMiddleware { service }))
    }
}

/// Service wrapper produced by [`DashboardGate`].
pub struct DashboardGateMiddleware<S> {
    service: S,
}

fn has_credentials(req: &ServiceRequest) -> bool {
    match SessionContext::new(req.get_session()).handle() {
        Ok(handle) => handle.is_some(),
        Err(error) => {
            warn!(error = %error, "unreadable session at dashboard gate");
            false
        }
    }
}

impl<S, B> Service<ServiceRequest> for DashboardGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !has_credentials(&req) {
            debug!(path = req.path(), "dashboard request without session");
            let response = login_redirect(req.path()).map_into_right_body();
            let (request, _) = req.into_parts();
            return Box::pin(ready(Ok(ServiceResponse::new(request, response))));
        }
        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}

/// Dashboard summary for the signed-in owner.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub parcels: Vec<OwnedParcelResponse>,
}

/// Owner dashboard: identity plus the parcels the caller has published.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardResponse),
        (status = 303, description = "Redirect to the login page"),
        (status = 503, description = "Provider unavailable", body = ErrorSchema)
    ),
    tags = ["dashboard"],
    operation_id = "dashboard"
)]
pub async fn dashboard(
    req: HttpRequest,
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let handle = session.handle()?;
    let identity = match state.accounts.current_user(handle.as_ref()).await {
        Ok(identity) => identity,
        Err(error) if error.code() == ErrorCode::Unauthorized => {
            return Ok(login_redirect(req.path()));
        }
        Err(error) => return Err(error),
    };
    let parcels = state.parcels.list_owned(handle.as_ref()).await?;
    Ok(HttpResponse::Ok().json(DashboardResponse {
        email: identity.email().map(ToString::to_string),
        full_name: identity.metadata().full_name.clone(),
        parcels: parcels.into_iter().map(OwnedParcelResponse::from).collect(),
    }))
}

/// Greeting data for the tenant page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantDashboardResponse {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Tenant dashboard.
#[utoipa::path(
    get,
    path = "/dashboard/tenant",
    responses(
        (status = 200, description = "Tenant greeting", body = TenantDashboardResponse),
        (status = 303, description = "Redirect to the login page or the owner dashboard"),
        (status = 503, description = "Provider unavailable", body = ErrorSchema)
    ),
    tags = ["dashboard"],
    operation_id = "tenantDashboard"
)]
pub async fn tenant_dashboard(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let handle = session.handle()?;
    let identity = match state.accounts.current_user(handle.as_ref()).await {
        Ok(identity) => identity,
        Err(error) if error.code() == ErrorCode::Unauthorized => {
            debug!("tenant dashboard without a user");
            return Ok(see_other(LOGIN_PATH));
        }
        Err(error) => return Err(error),
    };
    if !identity.metadata().is_tenant() {
        debug!(
            user_id = %identity.id(),
            account_type = identity.metadata().account_type.as_deref().unwrap_or("-"),
            "non-tenant sent back to the dashboard"
        );
        return Ok(see_other(DASHBOARD_PATH));
    }
    Ok(HttpResponse::Ok().json(TenantDashboardResponse {
        email: identity.email().map(ToString::to_string),
        full_name: identity.metadata().full_name.clone(),
    }))
}
