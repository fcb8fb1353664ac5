//! File operations.

use crate::error::{ProtocolError, ProtocolResult};
use crate::hash::content_sha256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of file mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    /// Create a file that must not exist yet.
    Put,
    /// Overwrite a file that must already exist.
    Patch,
    /// Remove a file.
    Delete,
    /// Copy a file to `new_path`, leaving the source in place.
    Copy,
    /// Rename a file to `new_path`.
    Move,
}

impl Verb {
    /// All verbs, in wire order.
    pub const ALL: [Verb; 5] = [
        Verb::Put,
        Verb::Patch,
        Verb::Delete,
        Verb::Copy,
        Verb::Move,
    ];

    /// Returns the wire name of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Put => "put",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
            Verb::Copy => "copy",
            Verb::Move => "move",
        }
    }

    /// Returns true if the verb carries file content read from the source root.
    pub fn requires_content(&self) -> bool {
        matches!(self, Verb::Put | Verb::Patch)
    }

    /// Returns true if the verb needs a second path.
    pub fn requires_new_path(&self) -> bool {
        matches!(self, Verb::Copy | Verb::Move)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownVerb(s.to_string()))
    }
}

/// A single file mutation, as carried on the wire.
///
/// Paths are relative; they are joined against the receiver's destination
/// root before any filesystem access. When both `content` and
/// `content_base64` are present the base64 form wins.
///
/// The JSON field names match the peers already deployed:
/// `type, fileName, newFileName, force, fileContent, fileContentBase64,
/// sha256, id, retryCount, retryLastError, destination`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Idempotency token, assigned on first enqueue when absent.
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Kind of mutation.
    #[serde(rename = "type")]
    pub verb: Verb,
    /// Host and port of the receiving peer.
    #[serde(default)]
    pub destination: String,
    /// Target path, relative to the root.
    #[serde(rename = "fileName")]
    pub path: String,
    /// Second path for copy and move.
    #[serde(
        rename = "newFileName",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub new_path: Option<String>,
    /// Downgrades existence preconditions to warnings.
    #[serde(default)]
    pub force: bool,
    /// Plain-text content.
    #[serde(
        rename = "fileContent",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<String>,
    /// Base64-encoded content.
    #[serde(
        rename = "fileContentBase64",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub content_base64: Option<String>,
    /// Expected hex SHA-256 of the content.
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub sha256: Option<String>,
    /// Number of failed delivery attempts so far.
    #[serde(default)]
    pub retry_count: u32,
    /// Error from the most recent failed attempt.
    #[serde(
        rename = "retryLastError",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_error: Option<String>,
}

impl Operation {
    /// Creates an operation with no content and no retry history.
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            id: None,
            verb,
            destination: String::new(),
            path: path.into(),
            new_path: None,
            force: false,
            content: None,
            content_base64: None,
            sha256: None,
            retry_count: 0,
            last_error: None,
        }
    }

    /// Creates a put operation carrying `bytes`.
    pub fn put(path: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(Verb::Put, path).with_content(bytes)
    }

    /// Creates a patch operation carrying `bytes`.
    pub fn patch(path: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(Verb::Patch, path).with_content(bytes)
    }

    /// Creates a delete operation.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Verb::Delete, path)
    }

    /// Creates a copy operation.
    pub fn copy(path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self::new(Verb::Copy, path).with_new_path(new_path)
    }

    /// Creates a move operation.
    pub fn rename(path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self::new(Verb::Move, path).with_new_path(new_path)
    }

    /// Sets the second path.
    pub fn with_new_path(mut self, new_path: impl Into<String>) -> Self {
        self.new_path = Some(new_path.into());
        self
    }

    /// Attaches `bytes` as base64 content together with their digest.
    pub fn with_content(mut self, bytes: &[u8]) -> Self {
        self.content_base64 = Some(STANDARD.encode(bytes));
        self.sha256 = Some(content_sha256(bytes));
        self
    }

    /// Sets the force flag.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Sets the destination peer.
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Returns the bytes to write, preferring the base64 form.
    pub fn decoded_content(&self) -> ProtocolResult<Vec<u8>> {
        if let Some(encoded) = &self.content_base64 {
            return Ok(STANDARD.decode(encoded)?);
        }
        Ok(self
            .content
            .as_ref()
            .map(|text| text.as_bytes().to_vec())
            .unwrap_or_default())
    }

    /// Records a failed attempt.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_error = Some(error.into());
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

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type={},filename={}", self.verb, self.path)
    }
}

/// Older peers send every field, using `""` for "not set".
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_names() {
        for verb in Verb::ALL {
            assert_eq!(verb.as_str().parse::<Verb>().unwrap(), verb);
        }
        assert!(matches!(
            "chmod".parse::<Verb>(),
            Err(ProtocolError::UnknownVerb(_))
        ));
        assert!("PUT".parse::<Verb>().is_err());
    }

    #[test]
    fn verb_classification() {
        assert!(Verb::Put.requires_content());
        assert!(Verb::Patch.requires_content());
        assert!(!Verb::Delete.requires_content());
        assert!(Verb::Copy.requires_new_path());
        assert!(Verb::Move.requires_new_path());
        assert!(!Verb::Put.requires_new_path());
    }

    #[test]
    fn put_carries_base64_and_digest() {
        let op = Operation::put("tests/test.txt", b"dsdd");
        assert_eq!(op.verb, Verb::Put);
        assert_eq!(op.content_base64.as_deref(), Some("ZHNkZA=="));
        assert_eq!(
            op.sha256.as_deref(),
            Some("701df70cc797a5d18f69fbf8fa538b15c5adcc06e51de80b446d465696d6c3b5")
        );
        assert_eq!(op.decoded_content().unwrap(), b"dsdd");
    }

    #[test]
    fn base64_takes_precedence() {
        let mut op = Operation::new(Verb::Put, "a.txt");
        op.content = Some("plain".into());
        assert_eq!(op.decoded_content().unwrap(), b"plain");

        op.content_base64 = Some("ZHNkZA==".into());
        assert_eq!(op.decoded_content().unwrap(), b"dsdd");
    }

    #[test]
    fn invalid_base64_is_an_error() {
        let mut op = Operation::new(Verb::Put, "a.txt");
        op.content_base64 = Some("not base64!".into());
        assert!(matches!(
            op.decoded_content(),
            Err(ProtocolError::InvalidContent(_))
        ));
    }

    #[test]
    fn wire_field_names() {
        let mut op = Operation::copy("a.txt", "b.txt").with_destination("peer:9335");
        op.id = Some("abc".into());
        op.record_failure("status != 200");

        let value: serde_json::Value = serde_json::from_slice(&op.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "copy");
        assert_eq!(value["fileName"], "a.txt");
        assert_eq!(value["newFileName"], "b.txt");
        assert_eq!(value["destination"], "peer:9335");
        assert_eq!(value["id"], "abc");
        assert_eq!(value["retryCount"], 1);
        assert_eq!(value["retryLastError"], "status != 200");
        assert_eq!(value["force"], false);
        assert!(value.get("fileContentBase64").is_none());
    }

    #[test]
    fn decodes_legacy_message_with_empty_strings() {
        let json = br#"{
            "id": "",
            "type": "put",
            "destination": "",
            "fileName": "x/y.txt",
            "newFileName": "",
            "force": true,
            "fileContent": "hello",
            "fileContentBase64": "",
            "sha256": ""
        }"#;

        let op = Operation::from_json(json).unwrap();
        assert_eq!(op.verb, Verb::Put);
        assert_eq!(op.path, "x/y.txt");
        assert!(op.force);
        assert_eq!(op.id, None);
        assert_eq!(op.new_path, None);
        assert_eq!(op.content_base64, None);
        assert_eq!(op.sha256, None);
        assert_eq!(op.retry_count, 0);
        assert_eq!(op.decoded_content().unwrap(), b"hello");
    }

    #[test]
    fn unknown_verb_on_wire_is_rejected() {
        let json = br#"{"type":"chmod","fileName":"a"}"#;
        assert!(matches!(
            Operation::from_json(json),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn record_failure_increments() {
        let mut op = Operation::delete("gone.txt");
        op.record_failure("first");
        op.record_failure("second");
        assert_eq!(op.retry_count, 2);
        assert_eq!(op.last_error.as_deref(), Some("second"));
    }

    #[test]
    fn display_for_logs() {
        let op = Operation::delete("a/b.txt");
        assert_eq!(op.to_string(), "type=delete,filename=a/b.txt");
    }
}
