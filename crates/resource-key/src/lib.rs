//! Deterministic cache keys for remote resources
//!
//! Maps a resource URI to a fixed-width hex digest that is safe to use as a
//! filesystem entry name. Equal URIs always produce equal keys.

use sha2::{Digest, Sha256};
use std::fmt;

/// Number of hex characters in a rendered key (SHA-256).
pub const KEY_LEN: usize = 64;

/// Opaque fixed-length cache key derived from a resource URI.
///
/// The key is the sole identity a resource has inside the cache tiers; the
/// URI itself is never used as a storage name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Derive the key for a URI.
    pub fn from_uri(uri: &str) -> Self {
        let digest = Sha256::digest(uri.as_bytes());
        Self(hex::encode(digest))
    }

    /// Reconstruct a key from its rendered hex form, e.g. a file stem found
    /// while scanning a cache directory.
    ///
    /// Returns `None` unless the input is exactly 64 lowercase hex
    /// characters.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() == KEY_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    /// The 64-character lowercase hex form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
