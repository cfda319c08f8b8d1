//! Authentication: JWT tokens, password hashing, device fingerprints.

pub mod jwt;
pub mod password;

use sha2::{Digest, Sha256};

/// Role carried by operator (admin console) tokens.
pub const ROLE_OPERATOR: &str = "operator";
/// Role carried by player tokens.
pub const ROLE_PLAYER: &str = "player";

/// Compute the SHA-256 hex digest of a raw device fingerprint.
///
/// Only the digest is persisted, so the players table never holds the
/// raw browser-derived identifier.
pub fn hash_fingerprint(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_hash_is_stable_hex() {
        let a = hash_fingerprint("device-abc");
        let b = hash_fingerprint("device-abc");
        assert_eq!(a, b, "same input must hash to the same digest");
        assert_eq!(a.len(), 64, "SHA-256 hex digest is 64 chars");
        assert_ne!(a, hash_fingerprint("device-xyz"));
    }
}
