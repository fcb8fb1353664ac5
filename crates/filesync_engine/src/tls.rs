//! Certificate material for mutual TLS.

use crate::error::{SyncError, SyncResult};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// PEM-encoded key pair and trust root.
#[derive(Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    /// Leaf certificate first, then intermediates.
    pub cert_chain_pem: Vec<u8>,
    /// Private key of the leaf certificate.
    pub private_key_pem: Vec<u8>,
    /// CA certificate(s) peers must chain to.
    pub trust_root_pem: Vec<u8>,
}

impl TlsMaterial {
    /// Creates material from PEM buffers, rejecting empty ones.
    pub fn new(
        cert_chain_pem: impl Into<Vec<u8>>,
        private_key_pem: impl Into<Vec<u8>>,
        trust_root_pem: impl Into<Vec<u8>>,
    ) -> SyncResult<Self> {
        let material = Self {
            cert_chain_pem: cert_chain_pem.into(),
            private_key_pem: private_key_pem.into(),
            trust_root_pem: trust_root_pem.into(),
        };
        for (name, pem) in [
            ("certificate chain", &material.cert_chain_pem),
            ("private key", &material.private_key_pem),
            ("trust root", &material.trust_root_pem),
        ] {
            if pem.iter().all(u8::is_ascii_whitespace) {
                return Err(SyncError::Tls(format!("{name} is empty")));
            }
        }
        Ok(material)
    }

    /// Private key followed by the certificate chain, as one PEM buffer.
    pub fn identity_pem(&self) -> Vec<u8> {
        let mut pem = Vec::with_capacity(self.private_key_pem.len() + self.cert_chain_pem.len() + 1);
        pem.extend_from_slice(&self.private_key_pem);
        if !pem.ends_with(b"\n") {
            pem.push(b'\n');
        }
        pem.extend_from_slice(&self.cert_chain_pem);
        pem
    }
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("cert_chain_pem", &self.cert_chain_pem.len())
            .field("private_key_pem", &"<redacted>")
            .field("trust_root_pem", &self.trust_root_pem.len())
            .finish()
    }
}

/// Supplies TLS material on demand.
///
/// Issuance and rotation live behind this trait; callers ask again whenever
/// they build a new client or listener.
pub trait CertificateSource: Send + Sync {
    /// Returns the current key pair and trust root.
    fn certificate_material(&self) -> SyncResult<TlsMaterial>;
}

impl CertificateSource for TlsMaterial {
    fn certificate_material(&self) -> SyncResult<TlsMaterial> {
        Ok(self.clone())
    }
}

/// Reads PEM files from disk each time material is requested.
#[derive(Debug, Clone)]
pub struct PemFiles {
    /// Certificate chain file.
    pub cert: PathBuf,
    /// Private key file.
    pub key: PathBuf,
    /// Trust root file.
    pub ca: PathBuf,
}

impl PemFiles {
    /// Creates a source from three file paths.
    pub fn new(cert: impl Into<PathBuf>, key: impl Into<PathBuf>, ca: impl Into<PathBuf>) -> Self {
        Self {
            cert: cert.into(),
            key: key.into(),
            ca: ca.into(),
        }
    }
}

fn read_pem(path: &Path) -> SyncResult<Vec<u8>> {
    fs::read(path).map_err(|e| SyncError::Tls(format!("reading {}: {e}", path.display())))
}

impl CertificateSource for PemFiles {
    fn certificate_material(&self) -> SyncResult<TlsMaterial> {
        TlsMaterial::new(
            read_pem(&self.cert)?,
            read_pem(&self.key)?,
            read_pem(&self.ca)?,
        )
    }
}
