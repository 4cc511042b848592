//! Shared reqwest plumbing for the hosted backend adapters.
//!
//! Every service authenticates with an `apikey` header plus a bearer token.
//! Responses are read in full, then either decoded or turned into a
//! [`CallError`] that each adapter maps onto its own port error.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

use super::dto::ErrorBodyDto;

/// Client bound to one project and one API key.
pub(super) struct SupabaseHttp {
    client: Client,
    base: Url,
    api_key: Zeroizing<String>,
}

/// Completed response with a non-error status.
pub(super) struct Reply {
    pub(super) status: StatusCode,
    pub(super) headers: HeaderMap,
    pub(super) body: Vec<u8>,
}

impl Reply {
    pub(super) fn json<T: DeserializeOwned>(&self) -> Result<T, CallError> {
        serde_json::from_slice(&self.body)
            .map_err(|err| CallError::Decode(format!("invalid JSON payload: {err}")))
    }
}

/// Why a call failed before yielding a usable reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum CallError {
    Timeout(String),
    Transport(String),
    Status(StatusFailure),
    Decode(String),
}

/// Non-success response summarised for mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct StatusFailure {
    pub(super) status: StatusCode,
    pub(super) code: Option<String>,
    pub(super) message: String,
}

impl StatusFailure {
    pub(super) fn has_code(&self, candidates: &[&str]) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| candidates.contains(&code))
    }
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout(message) => write!(f, "timed out: {message}"),
            Self::Transport(message) => write!(f, "transport failure: {message}"),
            Self::Status(failure) => write!(f, "{}", failure.message),
            Self::Decode(message) => write!(f, "{message}"),
        }
    }
}

impl SupabaseHttp {
    /// Build a client with an explicit request timeout.
    pub(super) fn new(
        base: Url,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: with_trailing_slash(base),
            api_key: Zeroizing::new(api_key.into()),
        })
    }

    /// Resolve a path relative to the project URL.
    pub(super) fn endpoint(&self, path: &str) -> Result<Url, CallError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|err| CallError::Transport(format!("invalid endpoint {path}: {err}")))
    }

    /// Request authorised by the configured API key.
    pub(super) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.request_as(method, url, self.api_key.as_str())
    }

    /// Request authorised by a caller's access token.
    pub(super) fn request_as(&self, method: Method, url: Url, bearer: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", self.api_key.as_str())
            .bearer_auth(bearer)
    }

    /// Send the request and read the body, mapping failures.
    pub(super) async fn send(&self, builder: RequestBuilder) -> Result<Reply, CallError> {
        self.send_allowing(builder, &[]).await
    }

    /// As [`Self::send`], but statuses in `allowed` yield a [`Reply`].
    pub(super) async fn send_allowing(
        &self,
        builder: RequestBuilder,
        allowed: &[StatusCode],
    ) -> Result<Reply, CallError> {
        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_transport_error)?.to_vec();
        if !status.is_success() && !allowed.contains(&status) {
            return Err(CallError::Status(map_status_error(status, &body)));
        }
        Ok(Reply {
            status,
            headers,
            body,
        })
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn map_transport_error(error: reqwest::Error) -> CallError {
    if error.is_timeout() {
        CallError::Timeout(error.to_string())
    } else {
        CallError::Transport(error.to_string())
    }
}

pub(super) fn map_status_error(status: StatusCode, body: &[u8]) -> StatusFailure {
    let decoded: Option<ErrorBodyDto> = serde_json::from_slice(body).ok();
    let code = decoded.as_ref().and_then(ErrorBodyDto::code);
    let detail = decoded
        .as_ref()
        .and_then(ErrorBodyDto::message)
        .map(str::to_owned)
        .unwrap_or_else(|| body_preview(body));
    let message = if detail.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), detail)
    };
    StatusFailure {
        status,
        code,
        message,
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
