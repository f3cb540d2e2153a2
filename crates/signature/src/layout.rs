//! crates/signature/src/layout.rs
//!
//! Signature layout parameters and their recommended defaults.

use protocol::Magic;
use thiserror::Error;

/// Errors raised when validating layout parameters.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LayoutError {
    /// The magic does not describe a signature format.
    #[error("{0:?} is not a signature magic")]
    NotASignature(Magic),
    /// The block length falls outside the accepted range.
    #[error("block length {0} outside {min}..={max}", min = SignatureLayout::MIN_BLOCK_LEN, max = SignatureLayout::MAX_BLOCK_LEN)]
    BlockLenOutOfRange(u32),
    /// The strong-sum length falls outside what the algorithm provides.
    #[error("strong sum length {requested} outside 1..={max}")]
    StrongLenOutOfRange {
        /// Requested truncation in bytes.
        requested: u32,
        /// Widest truncation the magic's digest supports.
        max: u32,
    },
}

/// Validated block parameters for one signature.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignatureLayout {
    magic: Magic,
    block_len: u32,
    strong_len: u32,
}

impl SignatureLayout {
    /// Smallest accepted block length.
    pub const MIN_BLOCK_LEN: u32 = 1;
    /// Largest accepted block length.
    pub const MAX_BLOCK_LEN: u32 = 1 << 16;
    /// Block length used when nothing better is known.
    pub const DEFAULT_BLOCK_LEN: u32 = 2048;
    /// Strong-sum length used when the basis size is unknown.
    pub const DEFAULT_MIN_STRONG_LEN: u32 = 12;

    /// Validates explicit layout parameters.
    ///
    /// # Errors
    ///
    /// Rejects the delta magic, block lengths outside
    /// [`MIN_BLOCK_LEN`](Self::MIN_BLOCK_LEN)..=[`MAX_BLOCK_LEN`](Self::MAX_BLOCK_LEN),
    /// and strong lengths outside `1..=` the digest width.
    pub fn new(magic: Magic, block_len: u32, strong_len: u32) -> Result<Self, LayoutError> {
        let Some(max_strong) = magic.max_strong_len() else {
            return Err(LayoutError::NotASignature(magic));
        };
        if !(Self::MIN_BLOCK_LEN..=Self::MAX_BLOCK_LEN).contains(&block_len) {
            return Err(LayoutError::BlockLenOutOfRange(block_len));
        }
        if strong_len == 0 || strong_len > max_strong {
            return Err(LayoutError::StrongLenOutOfRange {
                requested: strong_len,
                max: max_strong,
            });
        }
        Ok(Self {
            magic,
            block_len,
            strong_len,
        })
    }

    /// Chooses recommended parameters for a basis of `old_fsize` bytes.
    ///
    /// The block length scales with the square root of the file size (so
    /// signature and delta overhead grow together) rounded to a power of two
    /// and clamped to `[256, 65536]`. The strong length is sized so the
    /// expected whole-signature false-match probability stays below 2⁻¹⁰ per
    /// block; with an unknown size it falls back to a conservative
    /// [`DEFAULT_MIN_STRONG_LEN`](Self::DEFAULT_MIN_STRONG_LEN) bytes.
    ///
    /// # Errors
    ///
    /// Rejects the delta magic.
    pub fn recommended(magic: Magic, old_fsize: Option<u64>) -> Result<Self, LayoutError> {
        let Some(max_strong) = magic.max_strong_len() else {
            return Err(LayoutError::NotASignature(magic));
        };

        let block_len = match old_fsize {
            None | Some(0) => Self::DEFAULT_BLOCK_LEN,
            Some(size) => {
                let target = ((8.0 * size as f64).sqrt()) as u64;
                nearest_power_of_two(target).clamp(256, u64::from(Self::MAX_BLOCK_LEN)) as u32
            }
        };

        let strong_len = match old_fsize {
            None => Self::DEFAULT_MIN_STRONG_LEN,
            Some(size) => {
                // Collision budget: #blocks * #window positions * 2^-bits
                // below 2^-10 overall.
                let bits = (10 + 2 * log2_ceil(size.max(1)))
                    .saturating_sub(log2_ceil(u64::from(block_len)));
                ((bits + 7) / 8).clamp(2, u64::from(max_strong)) as u32
            }
        };

        Self::new(magic, block_len, strong_len.min(max_strong))
    }

    /// Returns the signature magic.
    #[must_use]
    pub const fn magic(&self) -> Magic {
        self.magic
    }

    /// Returns the block length in bytes.
    #[must_use]
    pub const fn block_len(&self) -> u32 {
        self.block_len
    }

    /// Returns the strong-sum truncation in bytes.
    #[must_use]
    pub const fn strong_len(&self) -> u32 {
        self.strong_len
    }

    /// Number of blocks a basis of `size` bytes produces under this layout.
    #[must_use]
    pub const fn block_count_for(&self, size: u64) -> u64 {
        size.div_ceil(self.block_len as u64)
    }
}

fn log2_ceil(value: u64) -> u64 {
    u64::from(64 - value.saturating_sub(1).leading_zeros())
}

fn nearest_power_of_two(value: u64) -> u64 {
    let value = value.max(1);
    let above = value.next_power_of_two();
    let below = (above / 2).max(1);
    if value - below < above - value {
        below
    } else {
        above
    }
}
