//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::{ServerConfig, ServerSettings};
pub use state_builders::StateBuildError;

use state_builders::build_http_state;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use parcel_market::Trace;
#[cfg(debug_assertions)]
use parcel_market::doc::ApiDoc;
use parcel_market::inbound::http::health::{HealthState, live, ready};
use parcel_market::inbound::http::session_config::SessionSettings;
use parcel_market::inbound::http::state::HttpState;
use parcel_market::inbound::http::{configure, json_body_limit};
use parcel_market::outbound::supabase::SupabaseSettings;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

const SESSION_TTL_HOURS: i64 = 2;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_name: String,
    cookie_secure: bool,
    same_site: SameSite,
    json_limit: usize,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_name,
        cookie_secure,
        same_site,
        json_limit,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(cookie_name)
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default()
                .session_ttl(actix_web::cookie::time::Duration::hours(SESSION_TTL_HOURS)),
        )
        .build();

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(session)
        .wrap(Trace)
        .service(ready)
        .service(live)
        .configure(configure(json_limit));

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server over the adapters `supabase` selects.
///
/// The health state is created here because it reports which backend was
/// chosen; it is returned alongside the server so the caller can flip
/// readiness and liveness.
///
/// # Errors
/// Returns [`std::io::Error`] when adapter wiring fails or the socket cannot
/// be bound.
pub fn create_server(
    config: ServerConfig,
    supabase: &SupabaseSettings,
) -> std::io::Result<(Server, web::Data<HealthState>)> {
    let (http_state, backend) =
        build_http_state(&config, supabase).map_err(std::io::Error::other)?;
    let http_state = web::Data::new(http_state);
    let health_state = web::Data::new(HealthState::new(backend));
    let server_health_state = health_state.clone();
    let json_limit = json_body_limit(config.max_image_bytes);
    let ServerConfig {
        session,
        bind_addr,
        max_image_bytes: _,
        public_base_url: _,
    } = config;
    let SessionSettings {
        key,
        cookie_secure,
        same_site,
        cookie_name,
    } = session;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_name: cookie_name.clone(),
            cookie_secure,
            same_site,
            json_limit,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok((server, health_state))
}
