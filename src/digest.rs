//! Content digest helpers
//!
//! Digests follow the OCI convention of an algorithm prefix followed by the
//! lowercase hex encoding of the hash, e.g. `sha256:abcd...`.

use sha2::{Digest, Sha256};

pub struct DigestUtils;

impl DigestUtils {
    /// Compute the raw sha256 hex string for the given bytes.
    pub fn compute_sha256(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Compute an OCI-style digest reference (`sha256:<hex>`).
    pub fn compute_digest(data: &[u8]) -> String {
        format!("sha256:{}", Self::compute_sha256(data))
    }

    /// Verify bytes against an expected digest reference.
    ///
    /// Digests with an algorithm other than sha256 are accepted unverified,
    /// since the content store may serve content addressed by algorithms this
    /// crate does not hash.
    pub fn verify(data: &[u8], expected: &str) -> bool {
        match expected.strip_prefix("sha256:") {
            Some(hex_part) => Self::compute_sha256(data) == hex_part.to_lowercase(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_matches_known_vector() {
        // sha256 of the empty string
        assert_eq!(
            DigestUtils::compute_digest(b""),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_verify_round_trip() {
        let data = b"some manifest payload";
        let digest = DigestUtils::compute_digest(data);
        assert!(DigestUtils::verify(data, &digest));
        assert!(!DigestUtils::verify(b"other payload", &digest));
    }

    #[test]
    fn test_verify_skips_unknown_algorithms() {
        assert!(DigestUtils::verify(b"data", "sha512:deadbeef"));
    }
}
