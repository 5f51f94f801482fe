//! Configuration validation.
//!
//! # Responsibilities
//! - Check that at least one listener is enabled
//! - Validate port ranges and derive bind addresses
//! - Check that TLS files exist (existence only, contents are not read)
//! - Hash the proxy credentials
//! - Convert timeout seconds to durations
//!
//! # Design Decisions
//! - Stops at the first failure; every condition has its own message
//! - Never opens sockets and never consults the clock

use std::path::Path;
use std::time::Duration;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::schema::{ProxyConfig, Scheme};

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("HTTP or HTTPS must be enabled")]
    NoListener,

    #[error("{0} port must be specified")]
    MissingPort(Scheme),

    #[error("invalid {scheme} port number: {port}")]
    InvalidPort { scheme: Scheme, port: i64 },

    #[error("SSL certificate file must be specified")]
    MissingCertFile,

    #[error("SSL certificate file specified but not found: {0}")]
    CertFileNotFound(String),

    #[error("RSA private key file must be specified")]
    MissingKeyFile,

    #[error("RSA private key file specified but not found: {0}")]
    KeyFileNotFound(String),

    #[error("username cannot be empty")]
    EmptyUsername,

    #[error("password cannot be empty")]
    EmptyPassword,

    #[error("timeout-{0} cannot be smaller than 0")]
    NegativeTimeout(&'static str),
}

/// Validate `config` in place, filling in the derived fields.
pub fn validate_config(config: &mut ProxyConfig) -> Result<(), ValidationError> {
    if !config.http.enabled && !config.https.enabled {
        return Err(ValidationError::NoListener);
    }

    if config.http.enabled {
        let port = check_port(Scheme::Http, config.http.port)?;
        config.http.address = join_host_port(&config.host, port);
    }

    if config.https.enabled {
        let port = check_port(Scheme::Https, config.https.port)?;
        config.https.address = join_host_port(&config.host, port);

        let https = &config.https;
        if https.cert_file.is_empty() {
            return Err(ValidationError::MissingCertFile);
        } else if !file_exists(&https.cert_file) {
            return Err(ValidationError::CertFileNotFound(https.cert_file.clone()));
        }

        if https.key_file.is_empty() {
            return Err(ValidationError::MissingKeyFile);
        } else if !file_exists(&https.key_file) {
            return Err(ValidationError::KeyFileNotFound(https.key_file.clone()));
        }
    }

    if config.auth.enabled {
        let auth = &mut config.auth;
        if auth.username.is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        auth.user_hash = Sha256::digest(auth.username.as_bytes()).into();

        if auth.password.is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        auth.pass_hash = Sha256::digest(auth.password.as_bytes()).into();
    }

    let timeouts = &mut config.timeouts;
    timeouts.read = to_duration("read", timeouts.read_secs)?;
    timeouts.write = to_duration("write", timeouts.write_secs)?;
    timeouts.dial = to_duration("dial", timeouts.dial_secs)?;

    Ok(())
}

fn check_port(scheme: Scheme, port: i64) -> Result<u16, ValidationError> {
    if port == 0 {
        return Err(ValidationError::MissingPort(scheme));
    }
    u16::try_from(port).map_err(|_| ValidationError::InvalidPort { scheme, port })
}

fn to_duration(name: &'static str, secs: i64) -> Result<Duration, ValidationError> {
    u64::try_from(secs)
        .map(Duration::from_secs)
        .map_err(|_| ValidationError::NegativeTimeout(name))
}

/// Join a host and port, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// True when `path` exists and is not a directory.
pub fn file_exists(path: impl AsRef<Path>) -> bool {
    std::fs::metadata(path).map(|m| !m.is_dir()).unwrap_or(false)
}

/// True when `path` exists, whatever it is.
pub fn folder_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn http_config(port: i64) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.http.enabled = true;
        config.http.port = port;
        config
    }

    fn https_config(cert: &str, key: &str) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.https.enabled = true;
        config.https.cert_file = cert.to_string();
        config.https.key_file = key.to_string();
        config
    }

    fn path_of(file: &NamedTempFile) -> String {
        file.path().to_string_lossy().into_owned()
    }

    #[test]
    fn minimal_http_config_is_valid() {
        let mut config = http_config(8080);
        validate_config(&mut config).unwrap();
        assert_eq!(config.http.address, ":8080");
        assert_eq!(config.timeouts.dial, Duration::from_secs(10));
        assert_eq!(config.timeouts.read, Duration::ZERO);
    }

    #[test]
    fn rejects_no_listener() {
        let mut config = ProxyConfig::default();
        let err = validate_config(&mut config).unwrap_err();
        assert_eq!(err, ValidationError::NoListener);
        assert_eq!(err.to_string(), "HTTP or HTTPS must be enabled");
    }

    #[test]
    fn rejects_http_ports() {
        let err = validate_config(&mut http_config(0)).unwrap_err();
        assert_eq!(err.to_string(), "HTTP port must be specified");

        let err = validate_config(&mut http_config(-1)).unwrap_err();
        assert_eq!(err.to_string(), "invalid HTTP port number: -1");

        let err = validate_config(&mut http_config(65536)).unwrap_err();
        assert_eq!(err.to_string(), "invalid HTTP port number: 65536");

        assert!(validate_config(&mut http_config(65535)).is_ok());
        assert!(validate_config(&mut http_config(1)).is_ok());
    }

    #[test]
    fn rejects_https_ports() {
        let cert = NamedTempFile::new().unwrap();
        let key = NamedTempFile::new().unwrap();

        let mut config = https_config(&path_of(&cert), &path_of(&key));
        config.https.port = 0;
        let err = validate_config(&mut config).unwrap_err();
        assert_eq!(err.to_string(), "HTTPS port must be specified");

        config.https.port = 70000;
        let err = validate_config(&mut config).unwrap_err();
        assert_eq!(err.to_string(), "invalid HTTPS port number: 70000");
    }

    #[test]
    fn https_requires_existing_files() {
        let cert = NamedTempFile::new().unwrap();
        let key = NamedTempFile::new().unwrap();
        let cert_path = path_of(&cert);
        let key_path = path_of(&key);

        let err = validate_config(&mut https_config("", &key_path)).unwrap_err();
        assert_eq!(err, ValidationError::MissingCertFile);

        let err = validate_config(&mut https_config("/no/such/cert.pem", &key_path)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "SSL certificate file specified but not found: /no/such/cert.pem"
        );

        let err = validate_config(&mut https_config(&cert_path, "")).unwrap_err();
        assert_eq!(err.to_string(), "RSA private key file must be specified");

        let err = validate_config(&mut https_config(&cert_path, "/no/such/key.pem")).unwrap_err();
        assert_eq!(err, ValidationError::KeyFileNotFound("/no/such/key.pem".into()));

        let mut config = https_config(&cert_path, &key_path);
        validate_config(&mut config).unwrap();
        assert_eq!(config.https.address, ":443");
    }

    #[test]
    fn directory_is_not_a_cert_file() {
        let dir = tempfile::tempdir().unwrap();
        let key = NamedTempFile::new().unwrap();
        let dir_path = dir.path().to_string_lossy().into_owned();

        let err = validate_config(&mut https_config(&dir_path, &path_of(&key))).unwrap_err();
        assert_eq!(err, ValidationError::CertFileNotFound(dir_path));
    }

    #[test]
    fn auth_hashes_credentials() {
        let mut config = http_config(8080);
        config.auth.enabled = true;
        config.auth.username = "u".into();
        config.auth.password = "p".into();
        validate_config(&mut config).unwrap();

        let user: [u8; 32] = Sha256::digest(b"u").into();
        let pass: [u8; 32] = Sha256::digest(b"p").into();
        assert_eq!(config.auth.user_hash, user);
        assert_eq!(config.auth.pass_hash, pass);
    }

    #[test]
    fn auth_rejects_empty_credentials() {
        let mut config = http_config(8080);
        config.auth.enabled = true;
        config.auth.password = "p".into();
        assert_eq!(
            validate_config(&mut config).unwrap_err().to_string(),
            "username cannot be empty"
        );

        config.auth.username = "u".into();
        config.auth.password.clear();
        assert_eq!(
            validate_config(&mut config).unwrap_err().to_string(),
            "password cannot be empty"
        );
    }

    #[test]
    fn disabled_auth_skips_credentials() {
        let mut config = http_config(8080);
        validate_config(&mut config).unwrap();
        assert_eq!(config.auth.user_hash, [0u8; 32]);
    }

    #[test]
    fn rejects_negative_timeouts() {
        let mut config = http_config(8080);
        config.timeouts.read_secs = -1;
        assert_eq!(
            validate_config(&mut config).unwrap_err().to_string(),
            "timeout-read cannot be smaller than 0"
        );

        config.timeouts.read_secs = 5;
        config.timeouts.write_secs = -3;
        assert_eq!(
            validate_config(&mut config).unwrap_err(),
            ValidationError::NegativeTimeout("write")
        );

        config.timeouts.write_secs = 0;
        config.timeouts.dial_secs = -10;
        assert_eq!(
            validate_config(&mut config).unwrap_err().to_string(),
            "timeout-dial cannot be smaller than 0"
        );

        config.timeouts.dial_secs = 3;
        validate_config(&mut config).unwrap();
        assert_eq!(config.timeouts.read, Duration::from_secs(5));
        assert_eq!(config.timeouts.dial, Duration::from_secs(3));
    }

    #[test]
    fn joins_hosts_like_a_dialer() {
        assert_eq!(join_host_port("", 80), ":80");
        assert_eq!(join_host_port("127.0.0.1", 8080), "127.0.0.1:8080");
        assert_eq!(join_host_port("::1", 443), "[::1]:443");
    }
}
