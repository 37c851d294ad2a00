//! Stable identifiers for checksum state.

use sha2::{Digest, Sha256};

/// Derive the state key for a ruleset location (local path or URL).
///
/// The same location always maps to the same key, so each ruleset keeps its
/// own fingerprint.
pub fn state_key(ruleset_location: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ruleset_location.as_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash[..8]) // Use first 8 bytes
}

/// Sanitize a key for use in filenames.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
