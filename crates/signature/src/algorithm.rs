//! crates/signature/src/algorithm.rs
//!
//! Checksum algorithm selection from the stream magic.

use checksums::{Blake2bKeyed, Md4, StrongDigest, WeakSum};
use protocol::{Magic, StrongKind, WeakKind};

/// Strong checksum strategy pinned by a signature magic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignatureAlgorithm {
    /// MD4, for compatibility with historical signatures only.
    Md4,
    /// BLAKE2b-256 keyed with the magic bytes for domain separation.
    Blake2 {
        /// The four magic bytes used as the BLAKE2b key.
        key: [u8; 4],
    },
}

impl SignatureAlgorithm {
    /// Derives the strong algorithm from a signature magic.
    ///
    /// Returns `None` for the delta magic, which carries no checksums.
    #[must_use]
    pub fn from_magic(magic: Magic) -> Option<Self> {
        match magic.strong_kind()? {
            StrongKind::Md4 => Some(SignatureAlgorithm::Md4),
            StrongKind::Blake2 => Some(SignatureAlgorithm::Blake2 {
                key: magic.to_bytes(),
            }),
        }
    }

    /// Returns the full digest width in bytes.
    #[must_use]
    pub const fn digest_len(&self) -> usize {
        match self {
            SignatureAlgorithm::Md4 => 16,
            SignatureAlgorithm::Blake2 { .. } => 32,
        }
    }

    /// Computes the strong digest of `data`, zero-padded to 32 bytes.
    ///
    /// Only the first [`digest_len`](Self::digest_len) bytes are meaningful;
    /// comparisons truncate further to the table's strong-sum length.
    #[must_use]
    pub fn compute(&self, data: &[u8]) -> [u8; 32] {
        let mut out = [0u8; 32];
        match self {
            SignatureAlgorithm::Md4 => {
                let mut hasher = Md4::new();
                hasher.update(data);
                out[..16].copy_from_slice(&hasher.finalize());
            }
            SignatureAlgorithm::Blake2 { key } => {
                out = Blake2bKeyed::digest(*key, data);
            }
        }
        out
    }
}

/// Returns an empty rolling sum of the variant the magic pins.
///
/// Returns `None` for the delta magic.
#[must_use]
pub fn weak_sum_for(magic: Magic) -> Option<WeakSum> {
    match magic.weak_kind()? {
        WeakKind::Classic => Some(WeakSum::classic()),
        WeakKind::RabinKarp => Some(WeakSum::rabinkarp()),
    }
}
