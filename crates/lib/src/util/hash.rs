//! Hashing utilities for content-addressed identities.
//!
//! Plans and lowered graphs are identified by a truncated SHA-256 of their JSON
//! form. Two plans with the same hash lower to the same graph.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::OBJ_HASH_PREFIX_LEN;

pub type HashError = serde_json::Error;

/// A content-addressed hash identifying a unique object.
///
/// The hash is a 20-character truncated SHA-256 of the JSON-serialized struct.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string, e.g., `"a1b2c3d4e5f6789012ab"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

pub trait Hashable: Serialize {
  fn compute_hash(&self) -> Result<ObjectHash, HashError> {
    let serialized = serde_json::to_string(self)?;
    Ok(ObjectHash(hash_prefix(serialized.as_bytes())))
  }
}

/// Hex-encoded SHA-256 of `bytes`, truncated to [`OBJ_HASH_PREFIX_LEN`].
pub fn hash_prefix(bytes: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  let full = hex::encode(hasher.finalize());
  full[..OBJ_HASH_PREFIX_LEN].to_string()
}
