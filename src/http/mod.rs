//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (per-connection service, dispatch, auth check)
//!     → deadline.rs (read deadline on the request body, write deadline on
//!       the upstream exchange and every response body)
//!     → forward.rs (absolute-form request → upstream client → response)
//!       or tunnel.rs (CONNECT → dial → 200 → byte pumps)
//!     → response.rs (proxy-generated errors)
//!     → Send to client
//! ```

pub mod deadline;
pub mod forward;
pub mod response;
pub mod server;
pub mod tunnel;

pub use server::{dispatch, AppState, ProxyServer};
