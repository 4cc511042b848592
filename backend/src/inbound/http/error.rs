//! HTTP rendering of the domain error envelope.
//!
//! Handlers return [`ApiResult`]; this module decides the status code, adds
//! the `trace-id` header and hides internal failures from clients. Malformed
//! JSON bodies and query strings are folded into the same envelope through
//! [`json_config`] and [`query_config`].

use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode, web};
use serde_json::json;
use tracing::{debug, error};

pub use crate::domain::ApiResult;
use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Strip message and details from internal errors, keeping the trace id.
fn redact_if_internal(error: &Error) -> Error {
    if error.code() != ErrorCode::InternalError {
        return error.clone();
    }
    let redacted = Error::internal("Internal server error");
    match error.trace_id() {
        Some(id) => redacted.with_trace_id(id.to_owned()),
        None => redacted,
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        if self.code() == ErrorCode::InternalError {
            error!(message = self.message(), trace_id = ?self.trace_id(), "internal error");
        }
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(redact_if_internal(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "framework error promoted to domain error");
        Error::internal("Internal server error")
    }
}

fn json_payload_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "rejected JSON body");
    let error = match &err {
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            Error::invalid_request("request body is too large")
                .with_details(json!({"code": "payload_too_large"}))
        }
        JsonPayloadError::ContentType => Error::invalid_request("expected application/json")
            .with_details(json!({"code": "unsupported_content_type"})),
        _ => Error::invalid_request("request body is not valid JSON")
            .with_details(json!({"code": "malformed_json", "reason": err.to_string()})),
    };
    error.into()
}

fn query_payload_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "rejected query string");
    Error::invalid_request("query string is malformed")
        .with_details(json!({"code": "malformed_query", "reason": err.to_string()}))
        .into()
}

/// JSON extractor configuration that answers with the error envelope.
///
/// `limit` bounds the body size; parcel submissions carry a base64 image so
/// the limit is derived from the image cap.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(json_payload_error)
}

/// Query extractor configuration that answers with the error envelope.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(query_payload_error)
}

#[cfg(test)]
mod tests;
