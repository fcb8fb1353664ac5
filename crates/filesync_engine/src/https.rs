//! HTTPS transport with client certificates.
//!
//! The client presents its own certificate and trusts only the configured
//! root; the platform's web roots are never consulted.

use crate::config::TransportConfig;
use crate::error::{SyncError, SyncResult};
use crate::tls::{CertificateSource, TlsMaterial};
use crate::transport::{accept, SyncTransport};
use async_trait::async_trait;
use filesync_protocol::{Operation, SyncResponse};
use reqwest::{Certificate, Client, Identity, StatusCode};
use std::error::Error as StdError;
use tracing::debug;

/// Sends operations as JSON to `https://<destination>/api/sync`.
#[derive(Debug, Clone)]
pub struct HttpsTransport {
    client: Client,
    config: TransportConfig,
}

impl HttpsTransport {
    /// Builds a client from PEM material.
    pub fn new(material: &TlsMaterial, config: TransportConfig) -> SyncResult<Self> {
        let identity = Identity::from_pem(&material.identity_pem())
            .map_err(|e| SyncError::Tls(format!("client identity: {e}")))?;
        let root = Certificate::from_pem(&material.trust_root_pem)
            .map_err(|e| SyncError::Tls(format!("trust root: {e}")))?;

        let client = Client::builder()
            .use_rustls_tls()
            .tls_built_in_root_certs(false)
            .add_root_certificate(root)
            .identity(identity)
            .https_only(true)
            .timeout(config.timeout)
            .build()
            .map_err(|e| SyncError::Tls(format!("building client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Builds a client from whatever `source` currently supplies.
    pub fn from_source(source: &dyn CertificateSource, config: TransportConfig) -> SyncResult<Self> {
        Self::new(&source.certificate_material()?, config)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

#[async_trait]
impl SyncTransport for HttpsTransport {
    async fn send(&self, operation: &Operation) -> SyncResult<SyncResponse> {
        let url = self.config.sync_url(&operation.destination);
        debug!(url = %url, operation = %operation, "sending operation");

        let response = self
            .client
            .post(&url)
            .json(operation)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SyncError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(request_error)?;
        accept(SyncResponse::from_json(&body)?)
    }
}

fn request_error(e: reqwest::Error) -> SyncError {
    if e.is_timeout() {
        return SyncError::Timeout;
    }

    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    SyncError::transport(message)
}
