//! OpenAPI schemas for the domain error envelope.
//!
//! `Error` and `ErrorCode` stay free of `utoipa` derives; these wrappers
//! mirror their wire shape for documentation only.

use utoipa::ToSchema;

/// Stable machine-readable error codes.
#[derive(ToSchema)]
#[schema(as = ErrorCode)]
pub enum ErrorCodeSchema {
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    #[schema(rename = "unauthorized")]
    Unauthorized,
    #[schema(rename = "forbidden")]
    Forbidden,
    #[schema(rename = "not_found")]
    NotFound,
    #[schema(rename = "conflict")]
    Conflict,
    /// The auth provider, relational store or object storage failed.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    #[schema(rename = "internal_error")]
    InternalError,
}

/// Error envelope returned by every failing endpoint.
#[derive(ToSchema)]
#[schema(as = Error, rename_all = "camelCase")]
#[expect(dead_code, reason = "Used only for OpenAPI schema generation via utoipa")]
pub struct ErrorSchema {
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    #[schema(example = "latitude must be between -90 and 90")]
    message: String,
    /// Matches the `trace-id` response header.
    #[schema(example = "6f1f6d1e-2a0c-4b7e-9d59-3b8a4c1e2f00")]
    trace_id: Option<String>,
    /// Field-level context such as `{"field": "latitude", "code": "out_of_range"}`.
    details: Option<serde_json::Value>,
}
