//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → auth.rs (Proxy-Authorization check, when enabled)
//!     → [dispatch to forward or tunnel handler]
//!     → headers.rs (strip hop-by-hop headers before forwarding)
//! ```
//!
//! # Design Decisions
//! - Fail closed: any malformed credential is a rejection
//! - Credentials are held only as digests

pub mod auth;
pub mod headers;

pub use auth::{Credentials, BASIC_SCHEME};
pub use headers::strip_hop_by_hop;
