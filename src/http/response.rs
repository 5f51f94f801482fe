//! Plain-text responses generated by the proxy itself.
//!
//! Upstream responses pass through untouched. These helpers cover the cases
//! where the proxy answers on its own: authentication challenges, dial and
//! round-trip failures, and malformed CONNECT requests.

use std::fmt::Display;

use axum::body::Body;
use axum::http::header::{HeaderValue, CONTENT_TYPE, PROXY_AUTHENTICATE, X_CONTENT_TYPE_OPTIONS};
use axum::http::StatusCode;
use axum::response::Response;

use crate::security::BASIC_SCHEME;

/// A `text/plain` response whose body is `message` plus a trailing newline.
pub fn error_response(status: StatusCode, message: impl Display) -> Response {
    let mut response = Response::new(Body::from(format!("{message}\n")));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}

/// `407` challenging the client for Basic credentials.
pub fn proxy_auth_required() -> Response {
    let status = StatusCode::PROXY_AUTHENTICATION_REQUIRED;
    let mut response = error_response(status, status.canonical_reason().unwrap_or_default());
    response
        .headers_mut()
        .insert(PROXY_AUTHENTICATE, HeaderValue::from_static(BASIC_SCHEME));
    response
}

/// `503` carrying the upstream error text.
pub fn service_unavailable(err: impl Display) -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, err)
}
