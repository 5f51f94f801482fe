//! CONNECT tunnelling.
//!
//! # Responsibilities
//! - Dial the requested `host:port`
//! - Answer `200`, then take over the client socket once hyper surrenders it
//! - Pump bytes both ways until either side finishes
//!
//! The `200` is written and flushed by hyper before the upgrade future
//! resolves, so no tunnelled byte can precede it.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::error::UpstreamError;
use crate::http::response::{error_response, service_unavailable};
use crate::http::server::AppState;
use crate::net::TunnelGuard;

/// Handle a CONNECT request.
pub async fn handle_tunneling(state: &AppState, mut req: Request<Body>) -> Response {
    let Some(target) = req.uri().authority().map(|a| a.to_string()) else {
        return error_response(StatusCode::BAD_REQUEST, "CONNECT must be to a socket address");
    };

    let upstream = match dial(&target, state.config.timeouts.dial).await {
        Ok(stream) => stream,
        Err(err) => {
            error!("handleTunneling - DialTimeout error: {err}");
            return service_unavailable(err);
        }
    };

    // Dropping `upstream` here closes the dialed connection.
    let Some(on_upgrade) = req.extensions_mut().remove::<OnUpgrade>() else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Hijacking not supported");
    };

    let guard = state.tunnels.track();
    debug!(tunnel_id = %guard.id(), target = %target, "Tunnel dialed");

    tokio::spawn(async move {
        match on_upgrade.await {
            Ok(upgraded) => splice(TokioIo::new(upgraded), upstream, guard).await,
            Err(err) => error!("handleTunneling - Hijack error: {err}"),
        }
    });

    Response::new(Body::empty())
}

/// Open a TCP connection to `addr`. A zero timeout waits indefinitely.
pub async fn dial(addr: &str, timeout: Duration) -> Result<TcpStream, UpstreamError> {
    let connect = TcpStream::connect(addr);
    let result = if timeout.is_zero() {
        connect.await
    } else {
        tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| UpstreamError::DialTimeout {
                addr: addr.to_string(),
                timeout,
            })?
    };

    result.map_err(|source| UpstreamError::Dial {
        addr: addr.to_string(),
        source,
    })
}

/// Relay bytes between the client and upstream until either direction ends.
///
/// The guard is held for the lifetime of both pumps.
pub async fn splice<C>(client: C, upstream: TcpStream, guard: TunnelGuard)
where
    C: AsyncRead + AsyncWrite + Send + 'static,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (upstream_read, upstream_write) = upstream.into_split();

    let (closed_tx, _) = watch::channel(false);
    let closed = Arc::new(closed_tx);

    let to_upstream = tokio::spawn(pipe(client_read, upstream_write, Arc::clone(&closed)));
    let to_client = tokio::spawn(pipe(upstream_read, client_write, closed));
    let _ = tokio::join!(to_upstream, to_client);

    debug!(tunnel_id = %guard.id(), "Tunnel finished");
}

/// Copy `from` into `to` until EOF, an error, or the opposite pump finishing.
/// Either way both pumps are told to stop and `to` is shut down.
async fn pipe<R, W>(mut from: R, mut to: W, closed: Arc<watch::Sender<bool>>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut closed_rx = closed.subscribe();

    tokio::select! {
        result = tokio::io::copy(&mut from, &mut to) => {
            if let Err(err) = result {
                debug!(error = %err, "Tunnel copy ended");
            }
        }
        _ = closed_rx.wait_for(|closed| *closed) => {}
    }

    closed.send_replace(true);
    let _ = to.shutdown().await;
}
