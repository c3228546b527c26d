//! Hashing utilities for content-addressed cache keys.
//!
//! This module provides:
//! - `ContentHash`: A full 64-character SHA-256 hex digest
//! - `hash_bytes()`: Arbitrary byte hashing
//! - `hash_lines()`: Hashing of an ordered list of strings joined by newlines

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA256 hash.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA256 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}

/// Hash an ordered list of strings.
///
/// The lines are joined with `\n` (no trailing newline) before hashing, so
/// `["a", "b"]` and `["a\nb"]` produce the same digest.
pub fn hash_lines<S: AsRef<str>>(lines: &[S]) -> ContentHash {
  let joined = lines.iter().map(|l| l.as_ref()).collect::<Vec<_>>().join("\n");
  hash_bytes(joined.as_bytes())
}
