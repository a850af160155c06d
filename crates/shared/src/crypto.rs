//! Cryptographic utilities for API key generation and hashing.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extracts the prefix from an API key (first 8 characters after "pm_").
pub fn extract_key_prefix(key: &str) -> Option<&str> {
    if key.starts_with("pm_") && key.len() >= 11 {
        Some(&key[3..11])
    } else {
        None
    }
}
