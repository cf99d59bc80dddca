//! Assertion helpers for tests.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use super::app::TestResponse;

/// Assert response has expected status code
pub fn assert_status(response: &TestResponse, expected: StatusCode) {
    assert_eq!(
        response.status,
        expected,
        "Expected status {}, got {}. Body: {}",
        expected,
        response.status,
        response.text()
    );
}

/// Assert response is OK (200)
pub fn assert_ok(response: &TestResponse) {
    assert_status(response, StatusCode::OK);
}

/// Assert a 400 whose plain-text body contains `needle`
pub fn assert_bad_request(response: &TestResponse, needle: &str) {
    assert_status(response, StatusCode::BAD_REQUEST);
    assert_plain_text(response);
    assert!(
        response.text().contains(needle),
        "Expected body to contain {needle:?}, got {:?}",
        response.text()
    );
}

/// Assert a 404
pub fn assert_not_found(response: &TestResponse) {
    assert_status(response, StatusCode::NOT_FOUND);
}

/// Assert the body is short plain text
pub fn assert_plain_text(response: &TestResponse) {
    let content_type = response
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok());
    assert_eq!(content_type, Some("text/plain; charset=utf-8"));
}

/// Assert a successful file delivery with exactly `expected` as the body
pub fn assert_file(response: &TestResponse, expected: &[u8]) {
    assert_ok(response);
    assert_eq!(response.content_length(), Some(expected.len() as u64));
    assert!(
        response.body.as_slice() == expected,
        "Body differs from stored object ({} bytes vs {} bytes)",
        response.body.len(),
        expected.len()
    );
}
