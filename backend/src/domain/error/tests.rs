//! Tests for the error payload formatting and trace propagation.

use super::*;
use crate::middleware::trace::TraceId;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn base_error() -> Error {
    Error::invalid_request("bad")
}

#[rstest]
#[case(Error::invalid_request("x"), ErrorCode::InvalidRequest)]
#[case(Error::unauthorized("x"), ErrorCode::Unauthorized)]
#[case(Error::forbidden("x"), ErrorCode::Forbidden)]
#[case(Error::not_found("x"), ErrorCode::NotFound)]
#[case(Error::conflict("x"), ErrorCode::Conflict)]
#[case(Error::service_unavailable("x"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("x"), ErrorCode::InternalError)]
fn convenience_constructors_set_code(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn try_with_trace_id_rejects_empty_values(base_error: Error) {
    let result = base_error.try_with_trace_id("   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyTraceId)));
}

#[rstest]
fn trace_id_is_none_out_of_scope() {
    assert!(Error::internal("boom").trace_id().is_none());
}

#[rstest]
#[tokio::test]
async fn trace_id_is_captured_in_scope() {
    let trace_id: TraceId = TRACE_ID.parse().expect("valid uuid");
    let error = TraceId::scope(trace_id, async { Error::internal("boom") }).await;
    assert_eq!(error.trace_id(), Some(TRACE_ID));
}

#[rstest]
fn serialises_camel_case_and_skips_absent_fields(base_error: Error) {
    let value = serde_json::to_value(&base_error).expect("serialise");
    assert_eq!(value, json!({ "code": "invalid_request", "message": "bad" }));

    let with_extras = base_error
        .with_trace_id(TRACE_ID)
        .with_details(json!({ "field": "titre" }));
    let value = serde_json::to_value(&with_extras).expect("serialise");
    assert_eq!(value["traceId"], TRACE_ID);
    assert_eq!(value["details"]["field"], "titre");
}

#[rstest]
fn deserialising_rejects_blank_messages() {
    let result: Result<Error, _> =
        serde_json::from_value(json!({ "code": "not_found", "message": " " }));
    assert!(result.is_err());
}

#[rstest]
fn deserialising_accepts_snake_case_trace_id() {
    let error: Error = serde_json::from_value(json!({
        "code": "service_unavailable",
        "message": "store down",
        "trace_id": TRACE_ID,
    }))
    .expect("deserialise");
    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    assert_eq!(error.trace_id(), Some(TRACE_ID));
}
