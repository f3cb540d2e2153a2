use crate::error::ProtocolError;

/// Weak rolling-checksum variant implied by a signature magic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WeakKind {
    /// Classic two-half rolling sum.
    Classic,
    /// RabinKarp polynomial rolling hash.
    RabinKarp,
}

/// Strong digest variant implied by a signature magic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StrongKind {
    /// MD4, kept for compatibility with historical signatures.
    Md4,
    /// BLAKE2b-256 keyed with the magic bytes.
    Blake2,
}

/// Four-byte big-endian stream prefix identifying the file format.
///
/// The set is closed: exactly one delta format and four signature formats
/// exist. Signature magics pin both checksum algorithms so a loaded table
/// always hashes windows the same way the producer did.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum Magic {
    /// A delta file, `"rs\x026"`.
    Delta = 0x7273_0236,
    /// Signature with the classic weak sum and MD4 strong sums, `"rs\x016"`.
    ///
    /// Deprecated: MD4 is trivially collidable, so these signatures are
    /// unsafe whenever the basis contains attacker-influenced bytes.
    Md4Sig = 0x7273_0136,
    /// Signature with the classic weak sum and BLAKE2b strong sums, `"rs\x017"`.
    Blake2Sig = 0x7273_0137,
    /// Signature with the RabinKarp weak sum and MD4 strong sums, `"rs\x01F"`.
    RkMd4Sig = 0x7273_0146,
    /// Signature with the RabinKarp weak sum and BLAKE2b strong sums,
    /// `"rs\x01G"`. The recommended format.
    RkBlake2Sig = 0x7273_0147,
}

impl Magic {
    /// Decodes a raw big-endian value into a known magic.
    pub fn from_raw(raw: u32) -> Result<Self, ProtocolError> {
        match raw {
            0x7273_0236 => Ok(Magic::Delta),
            0x7273_0136 => Ok(Magic::Md4Sig),
            0x7273_0137 => Ok(Magic::Blake2Sig),
            0x7273_0146 => Ok(Magic::RkMd4Sig),
            0x7273_0147 => Ok(Magic::RkBlake2Sig),
            other => Err(ProtocolError::UnknownMagic(other)),
        }
    }

    /// Returns the raw 32-bit value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self as u32
    }

    /// Returns the four bytes emitted at the start of a stream.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 4] {
        (self as u32).to_be_bytes()
    }

    /// Returns `true` for the signature formats.
    #[must_use]
    pub const fn is_signature(self) -> bool {
        !matches!(self, Magic::Delta)
    }

    /// Returns the weak-sum variant for signature magics.
    #[must_use]
    pub const fn weak_kind(self) -> Option<WeakKind> {
        match self {
            Magic::Md4Sig | Magic::Blake2Sig => Some(WeakKind::Classic),
            Magic::RkMd4Sig | Magic::RkBlake2Sig => Some(WeakKind::RabinKarp),
            Magic::Delta => None,
        }
    }

    /// Returns the strong-digest variant for signature magics.
    #[must_use]
    pub const fn strong_kind(self) -> Option<StrongKind> {
        match self {
            Magic::Md4Sig | Magic::RkMd4Sig => Some(StrongKind::Md4),
            Magic::Blake2Sig | Magic::RkBlake2Sig => Some(StrongKind::Blake2),
            Magic::Delta => None,
        }
    }

    /// Returns the widest usable strong-sum truncation for signature magics.
    #[must_use]
    pub const fn max_strong_len(self) -> Option<u32> {
        match self.strong_kind() {
            Some(StrongKind::Md4) => Some(16),
            Some(StrongKind::Blake2) => Some(32),
            None => None,
        }
    }
}
