//! Marketplace entry-point: loads configuration, picks adapters and serves
//! the REST API, the dashboard gate and the auth callback.

mod server;

use std::ffi::OsString;
use std::io;

use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use parcel_market::inbound::http::session_config::{BuildMode, session_settings_from_env};
use parcel_market::outbound::supabase::SupabaseSettings;
use server::{ServerConfig, ServerSettings, create_server};

const PROGRAM_NAME: &str = "parcel-market";

fn load<T: OrthoConfig>() -> io::Result<T> {
    T::load_from_iter([OsString::from(PROGRAM_NAME)])
        .map_err(|err| io::Error::other(format!("configuration error: {err}")))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let session = session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .map_err(io::Error::other)?;
    let settings: ServerSettings = load()?;
    let supabase: SupabaseSettings = load()?;
    let config = ServerConfig::new(session, &settings).map_err(io::Error::other)?;
    let bind_addr = config.bind_addr();

    let (server, health_state) = create_server(config, &supabase)?;
    info!(%bind_addr, backend = ?health_state.backend(), "listening");
    let result = server.await;
    health_state.mark_unhealthy();
    result
}
