//! HTTP/HTTPS forward proxy library.
//!
//! Plain requests in absolute form are forwarded to their origin and CONNECT
//! requests become raw TCP tunnels. Listeners, dispatch and shutdown live in
//! [`http`]; everything else supports them.

// Core subsystems
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::ProxyServer;
pub use lifecycle::Shutdown;
