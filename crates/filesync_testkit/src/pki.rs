//! Throwaway PKI for mutual-TLS tests.
//!
//! Every leaf carries both server and client usages and the names
//! `localhost` and `127.0.0.1`.

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose,
};
use std::fs;
use std::path::{Path, PathBuf};

/// PEM pair for one leaf certificate.
#[derive(Debug, Clone)]
pub struct LeafPem {
    /// Certificate.
    pub cert_pem: String,
    /// Private key.
    pub key_pem: String,
}

impl LeafPem {
    /// Writes `<name>.crt` and `<name>.key` into `dir`, returning both paths.
    pub fn write_to(&self, dir: &Path, name: &str) -> (PathBuf, PathBuf) {
        let cert = dir.join(format!("{name}.crt"));
        let key = dir.join(format!("{name}.key"));
        fs::write(&cert, &self.cert_pem).expect("Failed to write certificate");
        fs::write(&key, &self.key_pem).expect("Failed to write key");
        (cert, key)
    }
}

/// A self-signed CA that issues leaf certificates.
pub struct TestPki {
    ca_cert: Certificate,
    ca_key: KeyPair,
}

impl TestPki {
    /// Generates a fresh CA.
    pub fn generate() -> Self {
        Self::with_name("filesync test CA")
    }

    /// Generates a fresh CA with the given common name.
    pub fn with_name(common_name: &str) -> Self {
        let ca_key = KeyPair::generate().expect("Failed to generate CA key");
        let mut params =
            CertificateParams::new(Vec::<String>::new()).expect("Failed to create CA params");
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let ca_cert = params
            .self_signed(&ca_key)
            .expect("Failed to self-sign CA");

        Self { ca_cert, ca_key }
    }

    /// CA certificate, the trust root.
    pub fn ca_pem(&self) -> String {
        self.ca_cert.pem()
    }

    /// Writes the CA certificate to `<dir>/ca.crt`.
    pub fn write_ca(&self, dir: &Path) -> PathBuf {
        let path = dir.join("ca.crt");
        fs::write(&path, self.ca_pem()).expect("Failed to write CA certificate");
        path
    }

    /// Issues a leaf for the listening side.
    pub fn server(&self) -> LeafPem {
        self.leaf("filesync server")
    }

    /// Issues a leaf for the connecting side.
    pub fn client(&self) -> LeafPem {
        self.leaf("filesync client")
    }

    /// Issues a leaf with the given common name.
    pub fn leaf(&self, common_name: &str) -> LeafPem {
        let key = KeyPair::generate().expect("Failed to generate leaf key");
        let mut params =
            CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()])
                .expect("Failed to create leaf params");
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
        ];
        params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];
        let cert = params
            .signed_by(&key, &self.ca_cert, &self.ca_key)
            .expect("Failed to sign leaf");

        LeafPem {
            cert_pem: cert.pem(),
            key_pem: key.serialize_pem(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_pem_material() {
        let pki = TestPki::generate();
        assert!(pki.ca_pem().starts_with("-----BEGIN CERTIFICATE-----"));

        let leaf = pki.client();
        assert!(leaf.cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(leaf.key_pem.contains("PRIVATE KEY"));
    }

    #[test]
    fn separate_authorities_differ() {
        let trusted = TestPki::generate();
        let rogue = TestPki::with_name("rogue CA");
        assert_ne!(trusted.ca_pem(), rogue.ca_pem());
    }

    #[test]
    fn writes_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let pki = TestPki::generate();
        let (cert, key) = pki.server().write_to(dir.path(), "server");
        let ca = pki.write_ca(dir.path());

        assert!(cert.exists());
        assert!(key.exists());
        assert!(ca.ends_with("ca.crt"));
    }
}
