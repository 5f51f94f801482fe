//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     ← loader.rs (flat YAML file, optional)
//!     ← cli.rs (command-line flags, highest precedence)
//!     → validation.rs (semantic checks, derived fields)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to the listeners and handlers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once validated
//! - All fields have defaults to allow minimal configs
//! - Validation stops at the first failure

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigError, FileConfig};
pub use schema::{
    AuthConfig, ListenerConfig, LogConfig, ProxyConfig, Scheme, TimeoutConfig, TlsListenerConfig,
};
pub use validation::{validate_config, ValidationError};
