//! crates/signature/src/table.rs
//!
//! The signature table and its match lookup.

use std::collections::VecDeque;

use protocol::Magic;

use crate::algorithm::SignatureAlgorithm;
use crate::block::SignatureBlock;
use crate::index::WeakIndex;
use crate::layout::SignatureLayout;

/// Result of probing the table with a weak sum.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchOutcome {
    /// A block whose strong sum confirms the window; carries the block number.
    Match(u32),
    /// At least one block shared the weak sum but none confirmed. The delta
    /// engine counts these as false matches.
    WeakOnly,
    /// No block shares the weak sum.
    Absent,
}

/// In-memory signature of one basis file.
///
/// Blocks are held in basis order; [`build_index`](Self::build_index) adds
/// the weak-sum lookup structure that delta generation requires. Once built,
/// the table is read-only and may be shared by any number of delta jobs.
#[derive(Clone, Debug)]
pub struct Signature {
    layout: SignatureLayout,
    algorithm: SignatureAlgorithm,
    blocks: Vec<SignatureBlock>,
    index: Option<WeakIndex>,
}

impl Signature {
    /// Creates an empty table with the given layout.
    #[must_use]
    pub fn new(layout: SignatureLayout) -> Self {
        let algorithm = SignatureAlgorithm::from_magic(layout.magic())
            .expect("layout validation only accepts signature magics");
        Self {
            layout,
            algorithm,
            blocks: Vec::new(),
            index: None,
        }
    }

    /// Returns the signature magic.
    #[must_use]
    pub fn magic(&self) -> Magic {
        self.layout.magic()
    }

    /// Returns the layout the table was built with.
    #[must_use]
    pub const fn layout(&self) -> SignatureLayout {
        self.layout
    }

    /// Returns the block length in bytes.
    #[must_use]
    pub fn block_len(&self) -> u32 {
        self.layout.block_len()
    }

    /// Returns the strong-sum truncation in bytes.
    #[must_use]
    pub fn strong_len(&self) -> u32 {
        self.layout.strong_len()
    }

    /// Returns the strong algorithm pinned by the magic.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Returns the blocks in basis order.
    #[must_use]
    pub fn blocks(&self) -> &[SignatureBlock] {
        &self.blocks
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` once [`build_index`](Self::build_index) has run.
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Appends the checksums of the next basis block.
    ///
    /// Blocks must arrive in basis order. Appending drops a previously built
    /// index; rebuild it before the next delta.
    pub fn push_block(&mut self, weak: u32, strong: &[u8]) {
        debug_assert_eq!(strong.len(), self.layout.strong_len() as usize);
        self.index = None;
        self.blocks.push(SignatureBlock::new(weak, strong));
    }

    /// Builds the weak-sum index.
    ///
    /// Idempotent: rebuilding an already indexed table is a no-op.
    pub fn build_index(&mut self) {
        if self.index.is_none() {
            self.index = Some(WeakIndex::build(&self.blocks));
        }
    }

    /// Probes for a block matching a window given as one contiguous slice.
    ///
    /// The strong sum of the window is computed lazily, once, and only when
    /// some block shares the weak sum. Among several candidates the lowest
    /// block number wins.
    #[must_use]
    pub fn find_match_bytes(&self, weak: u32, window: &[u8]) -> MatchOutcome {
        let Some(index) = self.index.as_ref() else {
            debug_assert!(false, "find_match called before build_index");
            return MatchOutcome::Absent;
        };

        let strong_len = self.layout.strong_len() as usize;
        let mut strong: Option<[u8; 32]> = None;
        let mut saw_weak = false;

        for candidate in index.probe(weak) {
            let block = &self.blocks[candidate as usize];
            if block.weak() != weak {
                continue;
            }
            saw_weak = true;
            let digest = strong.get_or_insert_with(|| self.algorithm.compute(window));
            if digest[..strong_len] == block.strong()[..strong_len] {
                return MatchOutcome::Match(candidate);
            }
        }

        if saw_weak {
            MatchOutcome::WeakOnly
        } else {
            MatchOutcome::Absent
        }
    }

    /// Probes for a block matching a window held in a ring buffer.
    ///
    /// `scratch` is reused to flatten the window when (and only when) a
    /// strong comparison is actually needed.
    #[must_use]
    pub fn find_match(
        &self,
        weak: u32,
        window: &VecDeque<u8>,
        scratch: &mut Vec<u8>,
    ) -> MatchOutcome {
        let (front, back) = window.as_slices();
        if back.is_empty() {
            return self.find_match_bytes(weak, front);
        }
        scratch.clear();
        scratch.extend_from_slice(front);
        scratch.extend_from_slice(back);
        self.find_match_bytes(weak, scratch.as_slice())
    }
}
