//! Content hashing helpers.
//!
//! All identities in Terracast that must survive process restarts are
//! content hashes: the envelope's input hash, asset instance ids, and
//! pricing snapshot hashes. Everything funnels through SHA-256.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of the given bytes.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Short stable identifier: the first 16 hex chars of SHA-256.
///
/// Used for asset instance ids, where the full digest would be noise.
#[must_use]
pub fn short_id(bytes: &[u8]) -> String {
    let mut id = sha256_hex(bytes);
    id.truncate(16);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn short_id_is_16_chars_and_deterministic() {
        let a = short_id(b"aws_instance.web|0");
        let b = short_id(b"aws_instance.web|0");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }
}
