//! rustls configuration for the sync listener.

use crate::error::{ServerError, ServerResult};
use filesync_engine::TlsMaterial;
use std::fmt;
use std::sync::Arc;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::server::WebPkiClientVerifier;
use tokio_rustls::rustls::{RootCertStore, ServerConfig};

fn tls_error(context: &str, e: impl fmt::Display) -> ServerError {
    ServerError::Tls(format!("{context}: {e}"))
}

fn parse_certs(pem: &[u8], what: &str) -> ServerResult<Vec<CertificateDer<'static>>> {
    let certs = rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| tls_error(what, e))?;
    if certs.is_empty() {
        return Err(ServerError::Tls(format!("{what}: no certificates found")));
    }
    Ok(certs)
}

fn parse_key(pem: &[u8]) -> ServerResult<PrivateKeyDer<'static>> {
    rustls_pemfile::private_key(&mut &pem[..])
        .map_err(|e| tls_error("private key", e))?
        .ok_or_else(|| ServerError::Tls("private key: none found".into()))
}

/// Builds a server configuration that presents the material's certificate
/// and accepts only clients whose certificate chains to its trust root.
pub fn tls_config(material: &TlsMaterial) -> ServerResult<Arc<ServerConfig>> {
    let provider = Arc::new(ring::default_provider());

    let chain = parse_certs(&material.cert_chain_pem, "certificate chain")?;
    let key = parse_key(&material.private_key_pem)?;

    let mut roots = RootCertStore::empty();
    for cert in parse_certs(&material.trust_root_pem, "trust root")? {
        roots
            .add(cert)
            .map_err(|e| tls_error("trust root", e))?;
    }

    let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .build()
        .map_err(|e| tls_error("client verifier", e))?;

    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error("protocol versions", e))?
        .with_client_cert_verifier(verifier)
        .with_single_cert(chain, key)
        .map_err(|e| tls_error("server certificate", e))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filesync_testkit::TestPki;

    #[test]
    fn builds_from_generated_material() {
        let pki = TestPki::generate();
        let server = pki.server();
        let material = TlsMaterial::new(server.cert_pem, server.key_pem, pki.ca_pem()).unwrap();

        let config = tls_config(&material).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"http/1.1".to_vec()]);
    }

    #[test]
    fn rejects_material_without_certificates() {
        let pki = TestPki::generate();
        let server = pki.server();
        let material = TlsMaterial::new("garbage", server.key_pem, pki.ca_pem()).unwrap();

        let err = tls_config(&material).unwrap_err();
        assert!(err.to_string().contains("certificate chain"), "{err}");
    }

    #[test]
    fn rejects_material_without_key() {
        let pki = TestPki::generate();
        let server = pki.server();
        let material = TlsMaterial::new(server.cert_pem, "garbage", pki.ca_pem()).unwrap();

        assert!(matches!(tls_config(&material), Err(ServerError::Tls(_))));
    }
}
