//! TLS setup for the HTTPS listener.
//!
//! Certificates and keys are PEM files. The handshake itself is lazy and runs on
//! the connection's worker coroutine, never on the accept loop.

use anyhow::{bail, Context, Result};
use rustls::ServerConfig;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Certificate chain used when none is configured.
pub const DEFAULT_CERT_FILE: &str = "certificate-chain.crt";
/// Private key used when none is configured.
pub const DEFAULT_KEY_FILE: &str = "server.key";

/// Build a rustls server configuration from a PEM certificate chain and key.
///
/// The certificate file may hold several PEM blocks (leaf first). The key file
/// must hold one PKCS#1, PKCS#8 or SEC1 private key.
///
/// # Errors
///
/// Fails when either file is missing or unparseable, when the chain is empty,
/// or when rustls rejects the key for the certificate.
pub fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>> {
    debug!(path = %cert_path.display(), "Loading certificate chain");
    let certs: Vec<CertificateDer<'static>> = CertificateDer::pem_file_iter(cert_path)
        .with_context(|| format!("opening certificate file {}", cert_path.display()))?
        .collect::<Result<_, _>>()
        .with_context(|| format!("parsing certificate file {}", cert_path.display()))?;
    if certs.is_empty() {
        bail!("no certificates found in {}", cert_path.display());
    }

    debug!(path = %key_path.display(), "Loading private key");
    let key = PrivateKeyDer::from_pem_file(key_path)
        .with_context(|| format!("loading private key {}", key_path.display()))?;

    let cert_count = certs.len();
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .context("selecting TLS protocol versions")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("building TLS server configuration")?;

    debug!(cert_count, "Certificates and server key loaded");
    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_certificate_is_reported() {
        let err = load_tls_config(
            Path::new("/no/such/certificate-chain.crt"),
            Path::new("/no/such/server.key"),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("certificate"));
    }

    #[test]
    fn file_without_pem_blocks_is_rejected() {
        let mut cert = tempfile::NamedTempFile::new().unwrap();
        writeln!(cert, "not a certificate").unwrap();
        let key = tempfile::NamedTempFile::new().unwrap();

        assert!(load_tls_config(cert.path(), key.path()).is_err());
    }
}
