//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint, the error envelope schemas and
//! the session cookie security scheme. Swagger UI serves it in debug builds
//! and `cargo run --bin openapi-dump` prints it for external tooling.

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "parcel_session",
                "Session cookie issued by POST /api/v1/auth/login, sign-up or the auth callback.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Parcel marketplace API",
        description = "Publish and browse parcels of land for rent.",
        license(name = "MIT")
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::sign_up,
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::logout,
        crate::inbound::http::auth::current_session,
        crate::inbound::http::auth::auth_callback,
        crate::inbound::http::users::current_user,
        crate::inbound::http::users::ensure_user_record,
        crate::inbound::http::users::owned_parcels,
        crate::inbound::http::parcels::submit_parcel,
        crate::inbound::http::parcels::list_parcels,
        crate::inbound::http::dashboard::dashboard,
        crate::inbound::http::dashboard::tenant_dashboard,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorSchema, ErrorCodeSchema)),
    tags(
        (name = "auth", description = "Registration, sign-in and the confirmation callback"),
        (name = "users", description = "The signed-in caller"),
        (name = "parcels", description = "Publishing and browsing parcels"),
        (name = "dashboard", description = "Owner dashboard behind the login gate"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
