//! HTTP inbound adapter exposing REST endpoints.
//!
//! [`configure`] registers every route except the health checks, which the
//! server mounts separately so they stay outside the session middleware's
//! concerns. The session middleware itself is applied at `App` level.

use actix_web::web;

pub mod auth;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod parcels;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;

pub use error::ApiResult;

/// Headroom for the non-image fields of a submission body.
const FORM_FIELDS_BYTES: usize = 64 * 1024;

/// JSON body limit that admits a base64-encoded image of `max_image_bytes`.
///
/// # Examples
/// ```
/// use parcel_market::inbound::http::json_body_limit;
///
/// assert_eq!(json_body_limit(3), 4 + 64 * 1024);
/// ```
pub fn json_body_limit(max_image_bytes: usize) -> usize {
    max_image_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(FORM_FIELDS_BYTES)
}

/// Register the API, the auth callback and the gated dashboard.
pub fn configure(json_limit: usize) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(error::json_config(json_limit))
            .app_data(error::query_config())
            .service(
                web::scope("/api/v1")
                    .service(auth::sign_up)
                    .service(auth::login)
                    .service(auth::logout)
                    .service(auth::current_session)
                    .service(users::current_user)
                    .service(users::ensure_user_record)
                    .service(users::owned_parcels)
                    .service(parcels::submit_parcel)
                    .service(parcels::list_parcels),
            )
            .service(auth::auth_callback)
            .service(
                web::scope(dashboard::DASHBOARD_PATH)
                    .wrap(dashboard::DashboardGate)
                    .route("", web::get().to(dashboard::dashboard))
                    .route(
                        dashboard::TENANT_SUBPATH,
                        web::get().to(dashboard::tenant_dashboard),
                    )
                    .route("/{tail:.*}", web::get().to(dashboard::dashboard)),
            );
    }
}
