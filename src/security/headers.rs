//! Hop-by-hop header handling.
//!
//! These headers describe a single transport hop and are removed from client
//! requests before they travel upstream. The list is the RFC 2616 §13.5.1 set
//! plus `Proxy-Connection`, which libcurl still sends.

use axum::http::header::{
    HeaderMap, HeaderName, CONNECTION, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER,
    TRANSFER_ENCODING, UPGRADE,
};

pub const PROXY_CONNECTION: HeaderName = HeaderName::from_static("proxy-connection");
pub const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");

/// Headers that are never forwarded.
pub fn hop_by_hop_headers() -> [HeaderName; 9] {
    [
        CONNECTION,
        PROXY_CONNECTION,
        KEEP_ALIVE,
        PROXY_AUTHENTICATE,
        PROXY_AUTHORIZATION,
        TE,
        TRAILER,
        TRANSFER_ENCODING,
        UPGRADE,
    ]
}

/// Remove every hop-by-hop header, all values included.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in hop_by_hop_headers() {
        headers.remove(&name);
    }
}
