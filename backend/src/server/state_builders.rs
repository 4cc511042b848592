//! Adapter selection for the HTTP state.
//!
//! A configured Supabase project wins; otherwise every port is served by the
//! in-memory adapters so the server still starts for local work.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use parcel_market::inbound::http::health::BackendKind;
use parcel_market::inbound::http::state::{DrivenPorts, HttpState, HttpStatePorts};
use parcel_market::outbound::memory::{MemoryAuthProvider, MemoryObjectStorage, MemoryStore};
use parcel_market::outbound::supabase::{
    SupabaseAuthProvider, SupabaseConfigError, SupabaseConnection, SupabaseObjectStorage,
    SupabaseSettings, SupabaseStore,
};

use super::ServerConfig;

const MEMORY_PUBLIC_BASE: &str = "memory://parcel-images";

/// Failures while wiring adapters.
#[derive(Debug, thiserror::Error)]
pub enum StateBuildError {
    #[error(transparent)]
    Config(#[from] SupabaseConfigError),
    #[error("failed to build hosted backend client: {0}")]
    Client(#[from] reqwest::Error),
}

fn supabase_ports(
    connection: &SupabaseConnection,
    clock: Arc<dyn Clock>,
) -> Result<DrivenPorts, reqwest::Error> {
    let auth = SupabaseAuthProvider::new(
        connection.base_url.clone(),
        connection.anon_key.as_str(),
        connection.timeout,
        clock,
    )?;
    let store = Arc::new(SupabaseStore::new(
        connection.base_url.clone(),
        connection.service_key.as_str(),
        connection.timeout,
    )?);
    let storage = SupabaseObjectStorage::new(
        connection.base_url.clone(),
        connection.service_key.as_str(),
        connection.image_bucket.as_str(),
        connection.timeout,
    )?;
    Ok(DrivenPorts {
        auth: Arc::new(auth),
        users: store.clone(),
        parcels: store.clone(),
        images: store,
        storage: Arc::new(storage),
    })
}

fn memory_ports(clock: Arc<dyn Clock>) -> DrivenPorts {
    let store = Arc::new(MemoryStore::new(clock.clone()));
    DrivenPorts {
        auth: Arc::new(MemoryAuthProvider::new(clock)),
        users: store.clone(),
        parcels: store.clone(),
        images: store,
        storage: Arc::new(MemoryObjectStorage::new(MEMORY_PUBLIC_BASE)),
    }
}

/// Pick the driven adapters for `settings`.
fn select_ports(
    settings: &SupabaseSettings,
    clock: Arc<dyn Clock>,
) -> Result<(DrivenPorts, BackendKind), StateBuildError> {
    match settings.connection()? {
        Some(connection) => {
            if connection.service_key_fallback {
                warn!("SUPABASE_SERVICE_KEY unset; writes use the anon key and depend on row policies");
            }
            info!(
                base_url = %connection.base_url,
                bucket = %connection.image_bucket,
                "using hosted backend"
            );
            Ok((supabase_ports(&connection, clock)?, BackendKind::Supabase))
        }
        None => {
            warn!("SUPABASE_URL unset; using in-memory adapters, data is lost on restart");
            Ok((memory_ports(clock), BackendKind::Memory))
        }
    }
}

/// Build the shared HTTP state and report which backend serves it.
pub(super) fn build_http_state(
    config: &ServerConfig,
    settings: &SupabaseSettings,
) -> Result<(HttpState, BackendKind), StateBuildError> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let (driven, backend) = select_ports(settings, clock.clone())?;
    let ports = HttpStatePorts::assemble(driven, clock, config.max_image_bytes);
    let state = HttpState::new(ports);
    let state = match &config.public_base_url {
        Some(url) => state.with_public_base_url(url.as_str()),
        None => state,
    };
    Ok((state, backend))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn settings(url: Option<&str>, anon_key: Option<&str>) -> SupabaseSettings {
        SupabaseSettings {
            url: url.map(str::to_owned),
            anon_key: anon_key.map(str::to_owned),
            service_key: None,
            image_bucket: None,
            request_timeout_secs: None,
        }
    }

    #[rstest]
    #[case(settings(None, None), BackendKind::Memory)]
    #[case(settings(Some("   "), None), BackendKind::Memory)]
    #[case(settings(Some("https://abc.supabase.co"), Some("anon")), BackendKind::Supabase)]
    fn backend_follows_the_configured_url(
        #[case] settings: SupabaseSettings,
        #[case] expected: BackendKind,
    ) {
        let (_, backend) =
            select_ports(&settings, Arc::new(DefaultClock)).expect("ports should build");
        assert_eq!(backend, expected);
    }

    #[rstest]
    fn a_url_without_an_anon_key_is_an_error() {
        let result = select_ports(
            &settings(Some("https://abc.supabase.co"), None),
            Arc::new(DefaultClock),
        );
        assert!(matches!(
            result,
            Err(StateBuildError::Config(SupabaseConfigError::MissingAnonKey))
        ));
    }
}
