//! Configuration schema definitions.
//!
//! `ProxyConfig` is populated by the loader from defaults, the optional YAML
//! file and the command line. The derived fields (bind addresses, credential
//! digests, durations) stay empty until `validate_config` fills them in.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default plain HTTP port.
pub const DEFAULT_HTTP_PORT: i64 = 80;
/// Default TLS port.
pub const DEFAULT_HTTPS_PORT: i64 = 443;
/// Default upstream dial timeout in seconds.
pub const DEFAULT_DIAL_TIMEOUT_SECS: i64 = 10;
/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "log";

/// Root configuration for the forward proxy.
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// Bind host shared by both listeners. Empty means all interfaces.
    pub host: String,

    /// Plain HTTP listener.
    pub http: ListenerConfig,

    /// TLS listener.
    pub https: TlsListenerConfig,

    /// Proxy authentication.
    pub auth: AuthConfig,

    /// Read, write and dial timeouts.
    pub timeouts: TimeoutConfig,

    /// Log file settings.
    pub log: LogConfig,

    /// Suppress stdout output.
    pub quiet: bool,
}

/// Which of the two listeners a setting or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => f.write_str("HTTP"),
            Scheme::Https => f.write_str("HTTPS"),
        }
    }
}

/// Plain listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub enabled: bool,

    /// Signed so that out-of-range values survive until validation.
    pub port: i64,

    /// `host:port`, derived by validation.
    pub address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_HTTP_PORT,
            address: String::new(),
        }
    }
}

/// TLS listener configuration.
#[derive(Debug, Clone)]
pub struct TlsListenerConfig {
    pub enabled: bool,
    pub port: i64,
    pub address: String,

    /// Path to certificate file (PEM).
    pub cert_file: String,

    /// Path to private key file (PEM).
    pub key_file: String,
}

impl Default for TlsListenerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_HTTPS_PORT,
            address: String::new(),
            cert_file: String::new(),
            key_file: String::new(),
        }
    }
}

/// Basic proxy authentication.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub username: String,
    pub password: String,

    /// SHA-256 of `username`, derived by validation.
    pub user_hash: [u8; 32],

    /// SHA-256 of `password`, derived by validation.
    pub pass_hash: [u8; 32],
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.enabled)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Timeout configuration. Zero disables read and write timeouts.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub read_secs: i64,
    pub write_secs: i64,
    pub dial_secs: i64,

    pub read: Duration,
    pub write: Duration,
    pub dial: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 0,
            write_secs: 0,
            dial_secs: DEFAULT_DIAL_TIMEOUT_SECS,
            read: Duration::ZERO,
            write: Duration::ZERO,
            dial: Duration::ZERO,
        }
    }
}

/// Log file configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Write log lines to a dated file.
    pub enabled: bool,

    /// Directory holding the dated log files.
    pub dir: PathBuf,

    /// Emit `[connection]` lines.
    pub connections: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from(DEFAULT_LOG_DIR),
            connections: true,
        }
    }
}
