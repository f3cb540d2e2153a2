use std::fmt;

use blake2::digest::consts::U32;
use blake2::digest::{FixedOutput, KeyInit, Update};
use blake2::Blake2bMac;

use super::StrongDigest;

/// Keyed BLAKE2b-256 hasher, the recommended strong digest.
///
/// The four magic bytes of the signature format key the hash, so a digest
/// computed for one format never confirms a block in another. This uses
/// BLAKE2's native keying rather than an HMAC construction.
#[derive(Clone)]
pub struct Blake2bKeyed {
    inner: Blake2bMac<U32>,
}

impl fmt::Debug for Blake2bKeyed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blake2bKeyed").finish_non_exhaustive()
    }
}

impl Blake2bKeyed {
    /// Creates a hasher keyed with the four `key` bytes.
    #[must_use]
    pub fn new(key: [u8; 4]) -> Self {
        let inner = Blake2bMac::new_from_slice(&key)
            .expect("a 4-byte key is always within the BLAKE2b key bound");
        Self { inner }
    }

    /// Convenience helper that hashes `data` in one shot under `key`.
    #[must_use]
    pub fn digest(key: [u8; 4], data: &[u8]) -> [u8; 32] {
        let mut hasher = Self::new(key);
        StrongDigest::update(&mut hasher, data);
        StrongDigest::finalize(hasher)
    }
}

impl StrongDigest for Blake2bKeyed {
    type Digest = [u8; 32];
    const DIGEST_LEN: usize = 32;

    fn update(&mut self, data: &[u8]) {
        Update::update(&mut self.inner, data);
    }

    fn finalize(self) -> Self::Digest {
        self.inner.finalize_fixed().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSIC_KEY: [u8; 4] = [0x72, 0x73, 0x01, 0x37];
    const RABINKARP_KEY: [u8; 4] = [0x72, 0x73, 0x01, 0x47];

    fn to_hex(bytes: &[u8]) -> String {
        use std::fmt::Write as _;

        let mut out = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            write!(&mut out, "{byte:02x}").expect("write! to String cannot fail");
        }
        out
    }

    // Expected values cross-checked against an independent keyed BLAKE2b
    // implementation with digest_size 32.
    #[test]
    fn keyed_digest_matches_reference_vectors() {
        assert_eq!(
            to_hex(&Blake2bKeyed::digest(CLASSIC_KEY, b"")),
            "6c673f3772ea8e17fb36e1670d4acd04740ff05e77bfb14f3859c63510bc023b"
        );
        assert_eq!(
            to_hex(&Blake2bKeyed::digest(RABINKARP_KEY, b"")),
            "34693258dabab34ee359ba694e4f0d31b79796cea261263c039dd014844e71bf"
        );
        assert_eq!(
            to_hex(&Blake2bKeyed::digest(RABINKARP_KEY, b"abcd")),
            "c2e3339902b3954271fa5a232c96e2d1d946f1cfeea14e707c0fef4f4bda3626"
        );
    }

    #[test]
    fn key_separates_domains() {
        assert_ne!(
            Blake2bKeyed::digest(CLASSIC_KEY, b"same input"),
            Blake2bKeyed::digest(RABINKARP_KEY, b"same input")
        );
    }

    #[test]
    fn streaming_matches_one_shot() {
        let mut streamed = Blake2bKeyed::new(RABINKARP_KEY);
        StrongDigest::update(&mut streamed, b"ab");
        StrongDigest::update(&mut streamed, b"cd");
        assert_eq!(
            StrongDigest::finalize(streamed),
            Blake2bKeyed::digest(RABINKARP_KEY, b"abcd")
        );
    }
}
