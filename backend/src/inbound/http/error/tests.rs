//! Tests for HTTP error mapping.

use super::*;
use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use rstest::rstest;
use serde_json::{Value, json};

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("no auth"), StatusCode::UNAUTHORIZED)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::service_unavailable("db down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::gateway_timeout("slow"), StatusCode::GATEWAY_TIMEOUT)]
#[case(Error::upstream(None, "refused"), StatusCode::BAD_GATEWAY)]
#[case(Error::upstream(Some(404), "remote 404"), StatusCode::NOT_FOUND)]
#[case(Error::upstream(Some(500), "remote 500"), StatusCode::INTERNAL_SERVER_ERROR)]
#[case(Error::upstream(Some(42), "nonsense"), StatusCode::BAD_GATEWAY)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error(#[case] err: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&err), status);
}

async fn body_of(error: &Error) -> (StatusCode, Option<String>, Value) {
    let response = ResponseError::error_response(error);
    let status = response.status();
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(response.into_body()).await.expect("read body");
    let body = serde_json::from_slice(&bytes).expect("json body");
    (status, header, body)
}

#[tokio::test]
async fn internal_errors_are_redacted() {
    let error = Error::internal("connection string leaked")
        .with_trace_id(TRACE_ID)
        .with_details(json!({"secret": "x"}));
    let (status, header, body) = body_of(&error).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header.as_deref(), Some(TRACE_ID));
    assert_eq!(
        body,
        json!({"code": "internal_error", "message": "Internal server error", "traceId": TRACE_ID})
    );
}

#[tokio::test]
async fn client_errors_keep_details() {
    let error = Error::invalid_request("Email already exists.")
        .with_details(json!({"field": "email", "code": "email_taken"}));
    let (status, header, body) = body_of(&error).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(header.is_none());
    assert_eq!(body["details"]["code"], "email_taken");
    assert_eq!(body["message"], "Email already exists.");
}

#[tokio::test]
async fn upstream_failures_carry_upstream_failure_code() {
    let (status, _, body) = body_of(&Error::upstream(Some(404), "Error fetching tasks")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "upstream_failure");
}
