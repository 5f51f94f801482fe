//! Listener setup, request dispatch and server lifecycle.
//!
//! # Responsibilities
//! - Build the shared state (upstream client, credentials, tunnel tracker)
//! - Authenticate and classify each request (forward or CONNECT)
//! - Run the HTTP and HTTPS listeners on their own tasks
//! - Coordinate graceful shutdown on signal or on the first listener error
//!
//! # Design Decisions
//! - Requests bypass axum's `Router`: CONNECT carries an authority-form target
//!   that path routing cannot match
//! - HTTP/1.1 only on both listeners; the TLS listener advertises no ALPN
//!   protocols
//! - One deadline pair per request, fixed when its head has been read
//! - Shutdown drains in-flight exchanges but leaves tunnels running

use std::convert::Infallible;
use std::future::{ready, Future, Ready};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::header::PROXY_AUTHORIZATION;
use axum::http::{Method, Request};
use axum::response::Response;
use axum_server::Handle;
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tower::Service;
use tracing::{error, info};

use crate::config::{ProxyConfig, Scheme, TimeoutConfig};
use crate::error::ProxyError;
use crate::http::deadline::Deadline;
use crate::http::response::proxy_auth_required;
use crate::http::{forward, tunnel};
use crate::lifecycle::{signals, Shutdown};
use crate::net::{load_tls_config, TunnelTracker};
use crate::observability::{LogSink, CONNECTION_TARGET};
use crate::security::Credentials;

/// Upstream HTTP client used by the forward handler.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// Application state shared by every connection.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub client: UpstreamClient,
    /// Present only when authentication is enabled.
    pub credentials: Option<Credentials>,
    pub tunnels: TunnelTracker,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Self {
        let client = build_client(&config.timeouts);
        let credentials = config
            .auth
            .enabled
            .then(|| Credentials::from_config(&config.auth));

        Self {
            config: Arc::new(config),
            client,
            credentials,
            tunnels: TunnelTracker::new(),
        }
    }
}

/// Pooled HTTP/1.1 client whose TCP connect is bounded by the dial timeout.
pub fn build_client(timeouts: &TimeoutConfig) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    if !timeouts.dial.is_zero() {
        connector.set_connect_timeout(Some(timeouts.dial));
    }
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Entry point for every request on either listener.
///
/// Every response body, proxy-generated ones included, must be written out
/// before the write deadline.
pub async fn dispatch(
    state: AppState,
    remote: SocketAddr,
    req: Request<Body>,
) -> Result<Response, Infallible> {
    let received = Instant::now();
    let timeouts = &state.config.timeouts;
    let read = Deadline::after(received, timeouts.read);
    let write = Deadline::after(received, timeouts.write);

    let response = route(&state, remote, req, read, write).await;
    Ok(response.map(|body| write.wrap(body)))
}

async fn route(
    state: &AppState,
    remote: SocketAddr,
    req: Request<Body>,
    read: Deadline,
    write: Deadline,
) -> Response {
    if let Some(credentials) = &state.credentials {
        let presented = req
            .headers()
            .get(PROXY_AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !credentials.check(presented) {
            error!("authentication failed {remote}");
            return proxy_auth_required();
        }
    }

    info!(target: CONNECTION_TARGET, "new connection from {remote}");

    if req.method() == Method::CONNECT {
        tunnel::handle_tunneling(state, req).await
    } else {
        forward::handle_http(state, req, read, write).await
    }
}

/// Makes one [`ProxyService`] per accepted connection.
#[derive(Clone)]
struct MakeProxyService {
    state: AppState,
}

impl Service<SocketAddr> for MakeProxyService {
    type Response = ProxyService;
    type Error = Infallible;
    type Future = Ready<Result<ProxyService, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, remote: SocketAddr) -> Self::Future {
        ready(Ok(ProxyService {
            state: self.state.clone(),
            remote,
        }))
    }
}

/// Per-connection service that hands requests to [`dispatch`].
#[derive(Clone)]
struct ProxyService {
    state: AppState,
    remote: SocketAddr,
}

impl Service<Request<Incoming>> for ProxyService {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Incoming>) -> Self::Future {
        Box::pin(dispatch(self.state.clone(), self.remote, req.map(Body::new)))
    }
}

/// Certificate and key for the TLS listener.
#[derive(Debug, Clone)]
struct TlsFiles {
    cert: PathBuf,
    key: PathBuf,
}

/// A running listener and the handle used to stop it.
struct Listener {
    scheme: Scheme,
    handle: Handle,
    task: JoinHandle<()>,
}

impl Listener {
    fn spawn(
        scheme: Scheme,
        address: String,
        tls: Option<TlsFiles>,
        state: AppState,
        errors: mpsc::Sender<ProxyError>,
    ) -> Self {
        let handle = Handle::new();
        let task = tokio::spawn({
            let handle = handle.clone();
            async move {
                let result = serve(scheme, address, tls, handle, state).await;
                let _ = errors.send(result).await;
            }
        });
        Self {
            scheme,
            handle,
            task,
        }
    }
}

/// Run one listener to completion and describe how it ended.
async fn serve(
    scheme: Scheme,
    address: String,
    tls: Option<TlsFiles>,
    handle: Handle,
    state: AppState,
) -> ProxyError {
    let addr = match resolve(&address).await {
        Ok(addr) => addr,
        Err(source) => {
            return ProxyError::Resolve {
                scheme,
                address,
                source,
            }
        }
    };

    let read_timeout = state.config.timeouts.read;
    let make_service = MakeProxyService { state };

    let result = match tls {
        None => {
            let mut server = axum_server::bind(addr).handle(handle);
            configure_http(server.http_builder(), read_timeout);
            info!("{scheme} server listening on {addr}");
            server.serve(make_service).await
        }
        Some(files) => {
            let tls_config = match load_tls_config(&files.cert, &files.key).await {
                Ok(config) => config,
                Err(source) => return ProxyError::Tls { scheme, source },
            };
            let mut server = axum_server::bind_rustls(addr, tls_config).handle(handle);
            configure_http(server.http_builder(), read_timeout);
            info!("{scheme} server listening on {addr}");
            server.serve(make_service).await
        }
    };

    match result {
        Ok(()) => ProxyError::Closed(scheme),
        Err(source) => ProxyError::Serve { scheme, source },
    }
}

/// Restrict a listener to HTTP/1.1 and bound reading of the request head.
/// A zero read timeout leaves the head unbounded.
fn configure_http(builder: &mut auto::Builder<TokioExecutor>, read: Duration) {
    let current = std::mem::replace(builder, auto::Builder::new(TokioExecutor::new()));
    *builder = current.http1_only();

    if !read.is_zero() {
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(read);
    }
}

/// Resolve a `host:port` bind address. An empty host means all interfaces.
async fn resolve(address: &str) -> io::Result<SocketAddr> {
    let address = if address.starts_with(':') {
        format!("0.0.0.0{address}")
    } else {
        address.to_string()
    };

    let found = tokio::net::lookup_host(&address).await?.next();
    found.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no address found for {address}"),
        )
    })
}

/// The forward proxy: up to two listeners sharing one [`AppState`].
pub struct ProxyServer {
    state: AppState,
}

impl ProxyServer {
    /// `config` must already have passed validation.
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            state: AppState::new(config),
        }
    }

    /// Serve until SIGINT/SIGTERM or a listener failure, then shut down.
    pub async fn run(self, log: LogSink) {
        self.run_until(log, async {
            if let Err(err) = signals::terminate().await {
                error!("failed to listen for shutdown signals: {err}");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serve until `signal` resolves or a listener fails.
    ///
    /// Returns once every listener has drained and the log sink is closed.
    pub async fn run_until<F>(self, log: LogSink, signal: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (errors_tx, mut errors_rx) = mpsc::channel::<ProxyError>(2);
        let (idle_tx, idle_rx) = oneshot::channel::<()>();
        let shutdown = Shutdown::new();

        let config = Arc::clone(&self.state.config);
        let mut listeners = Vec::with_capacity(2);
        if config.http.enabled {
            listeners.push(Listener::spawn(
                Scheme::Http,
                config.http.address.clone(),
                None,
                self.state.clone(),
                errors_tx.clone(),
            ));
        }
        if config.https.enabled {
            let files = TlsFiles {
                cert: PathBuf::from(&config.https.cert_file),
                key: PathBuf::from(&config.https.key_file),
            };
            listeners.push(Listener::spawn(
                Scheme::Https,
                config.https.address.clone(),
                Some(files),
                self.state.clone(),
                errors_tx.clone(),
            ));
        }

        let tunnels = self.state.tunnels.clone();
        let requested = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = signal => info!("shutdown signal received"),
                _ = requested.wait() => {}
            }

            stop(listeners, &tunnels).await;
            log.close();
            drop(errors_tx);
            let _ = idle_tx.send(());
        });

        if let Some(err) = errors_rx.recv().await {
            error!("{err}");
        }
        shutdown.trigger();
        let _ = idle_rx.await;
    }
}

/// Ask every listener to stop, then wait for each to drain.
async fn stop(listeners: Vec<Listener>, tunnels: &TunnelTracker) {
    for listener in &listeners {
        listener.handle.graceful_shutdown(None);
    }

    for listener in listeners {
        match listener.task.await {
            Ok(()) => info!("{} server shutdown", listener.scheme),
            Err(err) => error!("{} server shutdown error: {err}", listener.scheme),
        }
    }

    let open = tunnels.open_count();
    if open > 0 {
        info!("{open} tunnel(s) still open at shutdown");
    }
}
