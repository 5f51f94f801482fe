//! TLS configuration and certificate loading.

use std::path::Path;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;

/// Load the certificate chain and private key for the HTTPS listener.
///
/// ALPN is left empty so clients always speak HTTP/1.1, which CONNECT
/// tunnelling relies on.
pub async fn load_tls_config(
    cert_path: &Path,
    key_path: &Path,
) -> Result<RustlsConfig, std::io::Error> {
    let loaded = RustlsConfig::from_pem_file(cert_path, key_path).await?;

    let mut server_config = (*loaded.get_inner()).clone();
    server_config.alpn_protocols.clear();

    Ok(RustlsConfig::from_config(Arc::new(server_config)))
}
