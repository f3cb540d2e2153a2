use digest::Digest;

use super::StrongDigest;

/// Streaming MD4 hasher backing the legacy signature formats.
///
/// MD4 is broken as a cryptographic hash; it is retained only so old
/// signatures keep working and must never be used where an attacker controls
/// the basis contents.
#[derive(Clone, Debug, Default)]
pub struct Md4 {
    inner: md4::Md4,
}

impl Md4 {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: md4::Md4::new() }
    }

    /// Convenience helper that computes the MD4 digest of `data` in one shot.
    #[must_use]
    pub fn digest(data: &[u8]) -> [u8; 16] {
        md4::Md4::digest(data).into()
    }
}

impl StrongDigest for Md4 {
    type Digest = [u8; 16];
    const DIGEST_LEN: usize = 16;

    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.inner, data);
    }

    fn finalize(self) -> Self::Digest {
        self.inner.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_hex(bytes: &[u8]) -> String {
        use std::fmt::Write as _;

        let mut out = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            write!(&mut out, "{byte:02x}").expect("write! to String cannot fail");
        }
        out
    }

    #[test]
    fn md4_matches_rfc_vectors() {
        let vectors = [
            (b"".as_slice(), "31d6cfe0d16ae931b73c59d7e0c089c0"),
            (b"a".as_slice(), "bde52cb31de33e46245e05fbdbd6fb24"),
            (b"abc".as_slice(), "a448017aaf21d8525fc10ae87aa6729d"),
            (
                b"message digest".as_slice(),
                "d9130a8164549fe818874806e1c7014b",
            ),
        ];

        for (input, expected) in vectors {
            assert_eq!(to_hex(&Md4::digest(input)), expected);

            let mut streamed = Md4::new();
            let mid = input.len() / 2;
            streamed.update(&input[..mid]);
            streamed.update(&input[mid..]);
            assert_eq!(to_hex(&streamed.finalize()), expected);
        }
    }

    #[test]
    fn block_digests_differ() {
        assert_ne!(Md4::digest(b"abcd"), Md4::digest(b"abce"));
    }
}
