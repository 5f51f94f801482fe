//! Forwarding of absolute-form HTTP requests.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers from the client request
//! - Send the request through the pooled upstream client
//! - Relay status, headers and a streamed body back to the client
//!
//! # Design Decisions
//! - Bodies are never buffered in either direction
//! - The request body is bounded by the read deadline; the upstream exchange
//!   by the write deadline, which the dispatcher also puts on the response body
//! - Upstream failures become `503` with the error text

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use hyper::body::Incoming;
use tracing::error;

use crate::error::UpstreamError;
use crate::http::deadline::Deadline;
use crate::http::response::service_unavailable;
use crate::http::server::AppState;
use crate::security::strip_hop_by_hop;

/// Forward a non-CONNECT request and relay the upstream answer.
pub async fn handle_http(
    state: &AppState,
    mut req: Request<Body>,
    read: Deadline,
    write: Deadline,
) -> Response {
    strip_hop_by_hop(req.headers_mut());
    let req = req.map(|body| read.wrap(body));

    match round_trip(state, req, write).await {
        Ok(response) => response.map(Body::new),
        Err(err) => {
            error!("handleHTTP - RoundTrip error: {err}");
            service_unavailable(err)
        }
    }
}

async fn round_trip(
    state: &AppState,
    req: Request<Body>,
    deadline: Deadline,
) -> Result<hyper::Response<Incoming>, UpstreamError> {
    let pending = state.client.request(req);
    let Some(at) = deadline.instant() else {
        return Ok(pending.await?);
    };

    match tokio::time::timeout_at(at, pending).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(UpstreamError::ResponseTimeout(deadline.budget())),
    }
}
