//! Bearer key digests for the HTTP layer.
//!
//! The server never keeps the configured key itself, only its SHA-256
//! digest. Presented keys are hashed and compared in constant time.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// SHA-256 digest of the accepted API key.
#[derive(Clone)]
pub struct ApiKeyDigest([u8; 32]);

impl ApiKeyDigest {
    pub fn of(key: &str) -> Self {
        Self(Sha256::digest(key.as_bytes()).into())
    }

    /// Whether `presented` hashes to this digest.
    pub fn matches(&self, presented: &str) -> bool {
        Self::of(presented).0[..].ct_eq(&self.0[..]).into()
    }

    /// Short hex prefix of the digest, safe to log.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl std::fmt::Debug for ApiKeyDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKeyDigest({}..)", self.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_matches_only_its_key() {
        let digest = ApiKeyDigest::of("fx_live_abc123");

        assert!(digest.matches("fx_live_abc123"));
        assert!(!digest.matches("fx_live_abc124"));
        assert!(!digest.matches(""));
    }

    #[test]
    fn test_fingerprint_is_sha256_prefix() {
        // sha256("abc") = ba7816bf...
        assert_eq!(ApiKeyDigest::of("abc").fingerprint(), "ba7816bf");
        assert_eq!(format!("{:?}", ApiKeyDigest::of("abc")), "ApiKeyDigest(ba7816bf..)");
    }
}
