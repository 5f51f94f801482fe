//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! HTTPS listener
//!     → tls.rs (certificate loading, HTTP/1.1 only)
//!
//! CONNECT accepted
//!     → connection.rs (tunnel ID, open-tunnel count)
//!     → byte pumps in http::tunnel
//! ```

pub mod connection;
pub mod tls;

pub use connection::{TunnelGuard, TunnelId, TunnelTracker};
pub use tls::load_tls_config;
