//! Command-line surface.
//!
//! Every flag is optional so an explicit flag can be told apart from its
//! default; `Cli::into_config` layers defaults, the YAML file and the flags.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::loader::{load_config_file, ConfigError, FileConfig};
use crate::config::schema::ProxyConfig;

/// Program version.
pub const VERSION: &str = "v1.0.0";

/// HTTP(S) Proxy Server
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "forward-proxy",
    about = "HTTP(S) Proxy Server",
    version = VERSION,
    disable_version_flag = true,
    override_usage = "forward-proxy [options]"
)]
pub struct Cli {
    /// Server host [default: ""]
    #[arg(long, value_name = "host")]
    pub host: Option<String>,

    /// Enable HTTP server [default: false]
    #[arg(
        long,
        value_name = "bool",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub enable_http: Option<bool>,

    /// HTTP port [default: 80]
    #[arg(long, value_name = "port", allow_negative_numbers = true)]
    pub port_http: Option<i64>,

    /// Enable HTTPS server [default: false]
    #[arg(
        long,
        value_name = "bool",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub enable_https: Option<bool>,

    /// HTTPS port [default: 443]
    #[arg(long, value_name = "port", allow_negative_numbers = true)]
    pub port_https: Option<i64>,

    /// Location of the SSL certificate file
    #[arg(long, value_name = "file")]
    pub crt_file: Option<String>,

    /// Location of the RSA private key file
    #[arg(long, value_name = "file")]
    pub key_file: Option<String>,

    /// Enable authentication [default: false]
    #[arg(
        long,
        value_name = "bool",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub enable_auth: Option<bool>,

    /// Username
    #[arg(long)]
    pub username: Option<String>,

    /// Password
    #[arg(long)]
    pub password: Option<String>,

    /// Maximum duration in seconds for reading the entire request, including the body [default: 0]
    #[arg(long, value_name = "secs", allow_negative_numbers = true)]
    pub timeout_read: Option<i64>,

    /// Maximum duration in seconds before timing out writes of the response [default: 0]
    #[arg(long, value_name = "secs", allow_negative_numbers = true)]
    pub timeout_write: Option<i64>,

    /// Dial timeout in seconds [default: 10]
    #[arg(long, value_name = "secs", allow_negative_numbers = true)]
    pub timeout_dial: Option<i64>,

    /// Enable file logging [default: false]
    #[arg(
        long,
        value_name = "bool",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub enable_log: Option<bool>,

    /// Location of the log directory [default: log]
    #[arg(long, value_name = "dir")]
    pub log_dir: Option<PathBuf>,

    /// Log HTTP(S) connections [default: true]
    #[arg(
        long,
        value_name = "bool",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub log_connections: Option<bool>,

    /// Activate quiet mode [default: false]
    #[arg(
        short,
        long,
        value_name = "bool",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub quiet: Option<bool>,

    /// Location of the configuration file in .yml format
    #[arg(short, long, value_name = "file")]
    pub config: Option<PathBuf>,

    /// Print program version and exit
    #[arg(short = 'v', long, action = ArgAction::Version)]
    pub version: Option<bool>,
}

impl Cli {
    /// Build the unvalidated configuration, reading `--config` if given.
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let file = match &self.config {
            Some(path) if !path.as_os_str().is_empty() => load_config_file(path)?,
            _ => FileConfig::default(),
        };
        Ok(self.merge(file))
    }

    /// Layer `self` (flags) over `file` over the defaults.
    pub fn merge(self, file: FileConfig) -> ProxyConfig {
        let mut config = ProxyConfig::default();

        if let Some(host) = self.host.or(file.host) {
            config.host = host;
        }

        if let Some(enabled) = self.enable_http.or(file.enable_http) {
            config.http.enabled = enabled;
        }
        if let Some(port) = self.port_http.or(file.port_http) {
            config.http.port = port;
        }

        if let Some(enabled) = self.enable_https.or(file.enable_https) {
            config.https.enabled = enabled;
        }
        if let Some(port) = self.port_https.or(file.port_https) {
            config.https.port = port;
        }
        if let Some(cert) = self.crt_file.or(file.crt_file) {
            config.https.cert_file = cert;
        }
        if let Some(key) = self.key_file.or(file.key_file) {
            config.https.key_file = key;
        }

        if let Some(enabled) = self.enable_auth.or(file.enable_auth) {
            config.auth.enabled = enabled;
        }
        if let Some(username) = self.username.or(file.username) {
            config.auth.username = username;
        }
        if let Some(password) = self.password.or(file.password) {
            config.auth.password = password;
        }

        if let Some(secs) = self.timeout_read.or(file.timeout_read) {
            config.timeouts.read_secs = secs;
        }
        if let Some(secs) = self.timeout_write.or(file.timeout_write) {
            config.timeouts.write_secs = secs;
        }
        if let Some(secs) = self.timeout_dial.or(file.timeout_dial) {
            config.timeouts.dial_secs = secs;
        }

        if let Some(enabled) = self.enable_log.or(file.enable_log) {
            config.log.enabled = enabled;
        }
        if let Some(dir) = self.log_dir.or(file.log_dir) {
            config.log.dir = dir;
        }
        if let Some(enabled) = self.log_connections.or(file.log_connections) {
            config.log.connections = enabled;
        }

        if let Some(quiet) = self.quiet.or(file.quiet) {
            config.quiet = quiet;
        }

        config
    }
}
