//! Hosted backend configuration loaded via OrthoConfig.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

const DEFAULT_IMAGE_BUCKET: &str = "terrain-images";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the hosted auth, REST and storage services.
///
/// When `url` is unset the server falls back to in-memory adapters.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SUPABASE")]
pub struct SupabaseSettings {
    /// Project base URL, for example `https://abc.supabase.co`.
    pub url: Option<String>,
    /// Public (anon) API key used for auth calls.
    pub anon_key: Option<String>,
    /// Privileged key used for table and storage writes.
    pub service_key: Option<String>,
    /// Storage bucket receiving parcel images.
    pub image_bucket: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
}

/// Why the settings cannot produce a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupabaseConfigError {
    #[error("SUPABASE_URL is not a valid URL: {0}")]
    InvalidUrl(String),
    #[error("SUPABASE_ANON_KEY must be set when SUPABASE_URL is set")]
    MissingAnonKey,
}

/// Validated connection parameters.
#[derive(Clone)]
pub struct SupabaseConnection {
    pub base_url: Url,
    pub anon_key: String,
    pub service_key: String,
    pub image_bucket: String,
    pub timeout: Duration,
    /// True when no service key was configured and the anon key is reused.
    pub service_key_fallback: bool,
}

impl std::fmt::Debug for SupabaseConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConnection")
            .field("base_url", &self.base_url.as_str())
            .field("image_bucket", &self.image_bucket)
            .field("timeout", &self.timeout)
            .field("service_key_fallback", &self.service_key_fallback)
            .finish_non_exhaustive()
    }
}

impl SupabaseSettings {
    /// Storage bucket name, falling back to the default.
    pub fn image_bucket(&self) -> &str {
        self.image_bucket
            .as_deref()
            .filter(|bucket| !bucket.trim().is_empty())
            .unwrap_or(DEFAULT_IMAGE_BUCKET)
    }

    /// Request timeout, falling back to the default.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Resolve the connection, or `None` when no URL is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseConfigError`] when the URL does not parse or the
    /// anon key is missing.
    pub fn connection(&self) -> Result<Option<SupabaseConnection>, SupabaseConfigError> {
        let Some(raw_url) = non_blank(self.url.as_deref()) else {
            return Ok(None);
        };
        let base_url =
            Url::parse(raw_url).map_err(|err| SupabaseConfigError::InvalidUrl(err.to_string()))?;
        let anon_key = non_blank(self.anon_key.as_deref())
            .ok_or(SupabaseConfigError::MissingAnonKey)?
            .to_owned();
        let (service_key, service_key_fallback) = match non_blank(self.service_key.as_deref()) {
            Some(key) => (key.to_owned(), false),
            None => (anon_key.clone(), true),
        };
        Ok(Some(SupabaseConnection {
            base_url,
            anon_key,
            service_key,
            image_bucket: self.image_bucket().to_owned(),
            timeout: self.request_timeout(),
            service_key_fallback,
        }))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
