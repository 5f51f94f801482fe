//! `Proxy-Authorization: Basic` verification.
//!
//! Credentials are stored only as SHA-256 digests. A presented credential is
//! hashed and both digests are compared in constant time, so neither the
//! verdict timing nor an early exit reveals which half was wrong.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;

/// Authentication scheme accepted in `Proxy-Authorization`.
pub const BASIC_SCHEME: &str = "Basic";

/// Digests of the configured username and password.
#[derive(Clone)]
pub struct Credentials {
    user_hash: [u8; 32],
    pass_hash: [u8; 32],
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            user_hash: Sha256::digest(username.as_bytes()).into(),
            pass_hash: Sha256::digest(password.as_bytes()).into(),
        }
    }

    /// Use the digests computed during validation.
    pub fn from_config(auth: &AuthConfig) -> Self {
        Self {
            user_hash: auth.user_hash,
            pass_hash: auth.pass_hash,
        }
    }

    /// Check a raw `Proxy-Authorization` header value.
    pub fn check(&self, header_value: &str) -> bool {
        let Some(decoded) = decode_basic(header_value) else {
            return false;
        };
        let Some((username, password)) = split_credentials(&decoded) else {
            return false;
        };

        let user_match = Sha256::digest(username).as_slice().ct_eq(&self.user_hash);
        let pass_match = Sha256::digest(password).as_slice().ct_eq(&self.pass_hash);
        (user_match & pass_match).into()
    }
}

/// Decode the base64 payload of `Basic <b64>`.
fn decode_basic(header_value: &str) -> Option<Vec<u8>> {
    let encoded = header_value
        .strip_prefix(BASIC_SCHEME)?
        .strip_prefix(' ')?;
    STANDARD.decode(encoded).ok()
}

/// Split `username:password` at the first colon.
fn split_credentials(decoded: &[u8]) -> Option<(&[u8], &[u8])> {
    let colon = decoded.iter().position(|&b| b == b':')?;
    Some((&decoded[..colon], &decoded[colon + 1..]))
}
