//! Error types shared by the listeners and request handlers.

use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

use crate::config::Scheme;

/// Terminal result of a listener task, delivered on the errors channel.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The listener stopped because shutdown was requested.
    #[error("{0} server closed")]
    Closed(Scheme),

    #[error("{scheme} server: cannot resolve bind address {address}: {source}")]
    Resolve {
        scheme: Scheme,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{scheme} server: failed to load TLS configuration: {source}")]
    Tls {
        scheme: Scheme,
        #[source]
        source: std::io::Error,
    },

    #[error("{scheme} server: {source}")]
    Serve {
        scheme: Scheme,
        #[source]
        source: std::io::Error,
    },
}

/// Failure reaching an origin on behalf of a client.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("dial tcp {addr}: {source}")]
    Dial {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("dial tcp {addr}: timed out after {}s", .timeout.as_secs())]
    DialTimeout { addr: String, timeout: Duration },

    #[error("{}", error_chain(.0))]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("no response from upstream within {}s", .0.as_secs())]
    ResponseTimeout(Duration),
}

/// Render an error followed by its sources, `: `-separated.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.ends_with(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}
