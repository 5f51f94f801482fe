//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → terminate() resolves
//!
//! Shutdown (shutdown.rs):
//!     first listener error → trigger() → wait() resolves
//!     signal or wait() → listeners stop accepting and drain → log closed → idle
//! ```
//!
//! # Design Decisions
//! - Graceful shutdown has no deadline: in-flight requests run to completion
//! - Hijacked tunnels are not drained; their count is logged

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::terminate;
