//! Acknowledgement messages.

use crate::error::ProtocolResult;
use crate::operation::{Operation, Verb};
use serde::{Deserialize, Serialize};

/// Application status for an applied operation.
pub const STATUS_OK: u16 = 200;

/// Response returned by the receiving peer for one operation.
///
/// The transport status only says the request reached the peer; success
/// also requires `status_code == 200`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// Verb of the operation being acknowledged.
    #[serde(rename = "type")]
    pub verb: Verb,
    /// Path of the operation being acknowledged.
    #[serde(rename = "fileName")]
    pub path: String,
    /// Application status, 200 on success.
    pub status_code: u16,
    /// `ok` on success, otherwise the error message.
    pub status_text: String,
}

impl SyncResponse {
    /// Creates a success response for `operation`.
    pub fn ok(operation: &Operation) -> Self {
        Self {
            verb: operation.verb,
            path: operation.path.clone(),
            status_code: STATUS_OK,
            status_text: "ok".into(),
        }
    }

    /// Creates a failure response for `operation`.
    pub fn failed(operation: &Operation, status_code: u16, message: impl Into<String>) -> Self {
        Self {
            verb: operation.verb,
            path: operation.path.clone(),
            status_code,
            status_text: message.into(),
        }
    }

    /// Returns true if the peer applied the operation.
    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    /// Encodes to JSON bytes.
    pub fn to_json(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
