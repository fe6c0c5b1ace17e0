//! Tests for HTTP error mapping.

use super::*;
use crate::domain::Error;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use actix_web::{App, ResponseError, test as actix_test, web};
use rstest::{fixture, rstest};
use serde::Deserialize;
use serde_json::{Value, json};

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[fixture]
fn internal_error_case(expected_trace_id: String) -> Error {
    Error::internal("boom")
        .with_trace_id(expected_trace_id)
        .with_details(json!({"secret": "x"}))
}

#[fixture]
fn version_conflict_case(expected_trace_id: String) -> Error {
    Error::conflict("The version doesn't match with the current one")
        .with_trace_id(expected_trace_id)
        .with_details(json!({"code": "version_mismatch", "expected": 3, "actual": 1}))
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("no auth"), StatusCode::UNAUTHORIZED)]
#[case(Error::forbidden("denied"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::conflict("stale"), StatusCode::CONFLICT)]
#[case(Error::service_unavailable("down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), status);
}

async fn assert_error_response(
    error: Error,
    expected_status: StatusCode,
    expected_trace_id: Option<&str>,
) -> Error {
    let response = ResponseError::error_response(&error);
    assert_eq!(response.status(), expected_status);

    let header = response.headers().get(TRACE_ID_HEADER);
    match expected_trace_id {
        Some(expected) => {
            let trace_id = header
                .expect("trace-id header is set by error_response")
                .to_str()
                .expect("trace-id not valid UTF-8");
            assert_eq!(trace_id, expected);
        }
        None => assert!(header.is_none(), "trace-id header should not be present"),
    }

    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");

    serde_json::from_slice(&bytes).expect("Error JSON deserialisation succeeds")
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted(
    #[from(internal_error_case)] internal_error: Error,
    expected_trace_id: String,
) {
    let redacted = assert_error_response(
        internal_error,
        StatusCode::INTERNAL_SERVER_ERROR,
        Some(expected_trace_id.as_str()),
    )
    .await;

    assert_eq!(redacted.code(), ErrorCode::InternalError);
    assert_eq!(redacted.message(), "Internal server error");
    assert!(redacted.details().is_none());
}

#[rstest]
#[actix_web::test]
async fn conflicts_keep_their_details(
    #[from(version_conflict_case)] conflict: Error,
    expected_trace_id: String,
) {
    let payload = assert_error_response(
        conflict,
        StatusCode::CONFLICT,
        Some(expected_trace_id.as_str()),
    )
    .await;

    assert_eq!(payload.code(), ErrorCode::Conflict);
    assert_eq!(
        payload.details().and_then(|details| details.get("code")),
        Some(&json!("version_mismatch"))
    );
}

#[rstest]
#[actix_web::test]
async fn error_without_trace_id_omits_trace_header() {
    let error = Error::invalid_request("bad").with_details(json!({"field": "name"}));

    let payload = assert_error_response(error, StatusCode::BAD_REQUEST, None).await;
    assert_eq!(payload.code(), ErrorCode::InvalidRequest);
    assert_eq!(payload.message(), "bad");
    assert_eq!(payload.trace_id(), None);
    assert_eq!(payload.details(), Some(&json!({"field": "name"})));
}

#[rstest]
fn redaction_leaves_client_errors_untouched() {
    let error = Error::forbidden("denied").with_trace_id(TRACE_ID);

    assert_eq!(redact_if_internal(&error), error);
}

#[rstest]
fn from_actix_error_is_redacted_internal_error() {
    use actix_web::error;

    let actix_err = error::ErrorBadRequest("boom");
    let err: Error = actix_err.into();

    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(err.message(), "Internal server error");
    assert_eq!(err.details(), None);
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[expect(dead_code, reason = "deserialised only to exercise the extractor")]
    subject: String,
}

#[derive(Debug, Deserialize)]
struct Filter {
    #[expect(dead_code, reason = "deserialised only to exercise the extractor")]
    project: i64,
}

async fn accept_payload(_payload: web::Json<Payload>) -> HttpResponse {
    HttpResponse::Ok().finish()
}

async fn accept_filter(_filter: web::Query<Filter>) -> HttpResponse {
    HttpResponse::Ok().finish()
}

#[rstest]
#[case("{\"subject\": ", "Invalid JSON body")]
#[case("{\"title\": \"x\"}", "Invalid JSON body")]
#[actix_web::test]
async fn malformed_json_is_a_bad_request(#[case] body: &'static str, #[case] prefix: &str) {
    let app = actix_test::init_service(
        App::new()
            .app_data(json_config())
            .route("/", web::post().to(accept_payload)),
    )
    .await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/")
            .insert_header(("content-type", "application/json"))
            .set_payload(body)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value: Value = actix_test::read_body_json(response).await;
    assert_eq!(value["code"], "invalid_request");
    assert!(
        value["message"]
            .as_str()
            .is_some_and(|message| message.starts_with(prefix))
    );
}

#[rstest]
#[actix_web::test]
async fn malformed_query_is_a_bad_request() {
    let app = actix_test::init_service(
        App::new()
            .app_data(query_config())
            .route("/", web::get().to(accept_filter)),
    )
    .await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/?project=abc")
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value: Value = actix_test::read_body_json(response).await;
    assert_eq!(value["code"], "invalid_request");
}
