//! Content hashing.

use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of `data`.
pub fn content_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
