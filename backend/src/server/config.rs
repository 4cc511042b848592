//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use ortho_config::OrthoConfig;
use parcel_market::domain::DEFAULT_MAX_IMAGE_BYTES;
use parcel_market::inbound::http::session_config::SessionSettings;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Listener and upload settings read via OrthoConfig.
///
/// | Variable | Default |
/// |---|---|
/// | `PARCELS_BIND_ADDR` | `0.0.0.0:8080` |
/// | `PARCELS_MAX_IMAGE_BYTES` | 5 MiB |
/// | `PARCELS_PUBLIC_BASE_URL` | unset |
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PARCELS")]
pub struct ServerSettings {
    /// Socket address the listener binds to.
    pub bind_addr: Option<String>,
    /// Largest accepted decoded image, in bytes.
    pub max_image_bytes: Option<usize>,
    /// Externally visible origin used for confirmation links.
    pub public_base_url: Option<String>,
}

/// Why [`ServerSettings`] cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum ServerSettingsError {
    #[error("PARCELS_BIND_ADDR is not a socket address: {value}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("PARCELS_MAX_IMAGE_BYTES must be greater than zero")]
    ZeroImageLimit,
}

impl ServerSettings {
    /// Parsed bind address, falling back to all interfaces on port 8080.
    ///
    /// # Errors
    ///
    /// Returns [`ServerSettingsError::InvalidBindAddr`] when the value does
    /// not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ServerSettingsError> {
        let raw = self
            .bind_addr
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse()
            .map_err(|source| ServerSettingsError::InvalidBindAddr {
                value: raw.to_owned(),
                source,
            })
    }

    /// Decoded image cap, falling back to the domain default.
    ///
    /// # Errors
    ///
    /// Returns [`ServerSettingsError::ZeroImageLimit`] for an explicit zero.
    pub fn max_image_bytes(&self) -> Result<usize, ServerSettingsError> {
        match self.max_image_bytes {
            Some(0) => Err(ServerSettingsError::ZeroImageLimit),
            Some(limit) => Ok(limit),
            None => Ok(DEFAULT_MAX_IMAGE_BYTES),
        }
    }
}

/// Everything [`super::create_server`] needs besides the adapters.
pub struct ServerConfig {
    pub(crate) session: SessionSettings,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) max_image_bytes: usize,
    pub(crate) public_base_url: Option<String>,
}

impl ServerConfig {
    /// Validate `settings` and combine them with the session cookie settings.
    ///
    /// # Errors
    ///
    /// Propagates [`ServerSettingsError`] from the bind address or image cap.
    pub fn new(
        session: SessionSettings,
        settings: &ServerSettings,
    ) -> Result<Self, ServerSettingsError> {
        Ok(Self {
            session,
            bind_addr: settings.bind_addr()?,
            max_image_bytes: settings.max_image_bytes()?,
            public_base_url: settings.public_base_url.clone(),
        })
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
