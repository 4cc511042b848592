//! Tests for HTTP error rendering.

use super::*;
use actix_web::body::to_bytes;
use actix_web::{App, test as actix_test};
use rstest::{fixture, rstest};
use rstest_bdd_macros::{given, then, when};
use serde::Deserialize;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

async fn render(error: Error) -> (StatusCode, Option<String>, Error) {
    let response = ResponseError::error_response(&error);
    let status = response.status();
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let payload = serde_json::from_slice(&bytes).expect("error envelope deserialises");
    (status, header, payload)
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("sign in"), StatusCode::UNAUTHORIZED)]
#[case(Error::forbidden("denied"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::conflict("taken"), StatusCode::CONFLICT)]
#[case(Error::service_unavailable("store down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] expected: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), expected);
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted_but_keep_the_trace_id(expected_trace_id: String) {
    let error = Error::internal("database password rejected")
        .with_trace_id(expected_trace_id.clone())
        .with_details(json!({"dsn": "postgres://secret"}));

    let (status, header, payload) = render(error).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header.as_deref(), Some(expected_trace_id.as_str()));
    assert_eq!(payload.message(), "Internal server error");
    assert!(payload.details().is_none());
}

#[rstest]
#[actix_web::test]
async fn upstream_failures_keep_their_details(expected_trace_id: String) {
    let error = Error::service_unavailable("parcel store unavailable")
        .with_trace_id(expected_trace_id)
        .with_details(json!({"kind": "persistence_error", "entity": "parcel"}));

    let (status, _, payload) = render(error).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(payload.code(), ErrorCode::ServiceUnavailable);
    assert_eq!(
        payload.details(),
        Some(&json!({"kind": "persistence_error", "entity": "parcel"}))
    );
}

#[rstest]
#[actix_web::test]
async fn error_without_trace_id_omits_trace_header() {
    let (status, header, payload) = render(Error::invalid_request("bad")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(header.is_none());
    assert_eq!(payload.trace_id(), None);
}

#[derive(Debug, Deserialize)]
struct Sample {
    #[serde(rename = "name")]
    _name: String,
}

#[rstest]
#[case("{not json", "malformed_json")]
#[case(r#"{"name": 42}"#, "malformed_json")]
#[actix_web::test]
async fn malformed_json_bodies_use_the_envelope(#[case] body: &str, #[case] code: &str) {
    let app = actix_test::init_service(
        App::new().app_data(json_config(1024)).route(
            "/",
            web::post().to(|_: web::Json<Sample>| async { HttpResponse::NoContent() }),
        ),
    )
    .await;
    let req = actix_test::TestRequest::post()
        .uri("/")
        .insert_header(("content-type", "application/json"))
        .set_payload(body.to_owned())
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let payload: serde_json::Value = actix_test::read_body_json(res).await;
    assert_eq!(payload["code"], "invalid_request");
    assert_eq!(payload["details"]["code"], code);
}

#[rstest]
#[actix_web::test]
async fn oversized_json_bodies_are_rejected() {
    let app = actix_test::init_service(
        App::new().app_data(json_config(8)).route(
            "/",
            web::post().to(|_: web::Json<Sample>| async { HttpResponse::NoContent() }),
        ),
    )
    .await;
    let req = actix_test::TestRequest::post()
        .uri("/")
        .insert_header(("content-type", "application/json"))
        .set_payload(r#"{"name": "far too long for the limit"}"#)
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let payload: serde_json::Value = actix_test::read_body_json(res).await;
    assert_eq!(payload["details"]["code"], "payload_too_large");
}

#[given("a service unavailable error code")]
fn a_service_unavailable_error_code() -> ErrorCode {
    ErrorCode::ServiceUnavailable
}

#[when("the adapter maps the code to an HTTP status")]
fn the_adapter_maps_the_code_to_http_status(code: ErrorCode) -> StatusCode {
    super::status_for(code)
}

#[then("the status is 503 Service Unavailable")]
fn the_status_is_503(status: StatusCode) {
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[rstest]
fn upstream_outage_maps_to_503() {
    let code = a_service_unavailable_error_code();
    let status = the_adapter_maps_the_code_to_http_status(code);
    the_status_is_503(status);
}

#[rstest]
fn framework_errors_are_redacted() {
    let err: Error = actix_web::error::ErrorBadRequest("boom").into();
    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(err.message(), "Internal server error");
    assert_eq!(err.details(), None);
}
