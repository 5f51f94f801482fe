//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and listeners emit tracing events:
//!     info!(..)                      → [info] channel
//!     error!(..) / warn!(..)         → [error] channel
//!     info!(target: "connection", ..) → [connection] channel
//!
//! logging.rs formats each event as one line and writes it to
//! stdout, the dated log file, both, or nowhere.
//! ```

pub mod logging;

pub use logging::{LogError, LogSink, CONNECTION_TARGET};
