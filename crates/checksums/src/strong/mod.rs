//! Strong block digests.
//!
//! Weak-sum hits are confirmed by hashing the candidate window with a
//! cryptographic (or near-cryptographic) digest and comparing a truncated
//! prefix. MD4 exists for compatibility with historical signatures and must
//! not be used on untrusted data; keyed BLAKE2b is the recommended choice.

mod blake2;
mod md4;

pub use self::blake2::Blake2bKeyed;
pub use self::md4::Md4;

/// Streaming digest over a block of basis or input bytes.
///
/// Callers feed data incrementally through [`update`](Self::update) and
/// obtain the final hash from [`finalize`](Self::finalize). Signature layers
/// truncate the result to their configured strong-sum length at comparison
/// and emission time.
pub trait StrongDigest: Sized {
    /// Digest output type.
    type Digest: AsRef<[u8]>;

    /// Width of the full digest in bytes.
    const DIGEST_LEN: usize;

    /// Feeds additional bytes into the digest state.
    fn update(&mut self, data: &[u8]);

    /// Finalises the digest and returns the resulting hash.
    fn finalize(self) -> Self::Digest;
}
