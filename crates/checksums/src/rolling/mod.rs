//! Rolling weak checksums.
//!
//! A rolling sum hashes a window of up to one block of bytes and can slide
//! that window one byte at a time in constant work. Two variants exist on the
//! wire: the classic two-half sum used by historical signatures and the
//! RabinKarp polynomial hash used by newer ones. Both are cheap to compute
//! and easy to collide, so every weak hit is confirmed with a strong digest
//! before a block is reused.

mod rabinkarp;
mod rollsum;

pub use rabinkarp::RabinKarp;
pub use rollsum::Rollsum;

/// Constant-work sliding-window checksum over at most one block of bytes.
///
/// `rollin` appends a byte while the window grows, `rotate` slides a full
/// window by one byte, and `rollout` shrinks the window from the left once
/// input is exhausted. Implementations track the window length themselves;
/// callers must pair every evicted byte with the byte that actually left the
/// window.
pub trait RollingSum: Default {
    /// Clears the state back to an empty window.
    fn reset(&mut self);

    /// Appends `byte` to the window without evicting anything.
    fn rollin(&mut self, byte: u8);

    /// Slides the window: evicts `outgoing` from the left, appends `incoming`.
    fn rotate(&mut self, outgoing: u8, incoming: u8);

    /// Shrinks the window by evicting `outgoing` from the left.
    fn rollout(&mut self, outgoing: u8);

    /// Returns the 32-bit digest of the current window.
    fn digest(&self) -> u32;

    /// Returns the number of bytes currently in the window.
    fn len(&self) -> usize;

    /// Returns `true` when the window holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends every byte of `chunk` via [`rollin`](Self::rollin).
    fn update(&mut self, chunk: &[u8]) {
        for &byte in chunk {
            self.rollin(byte);
        }
    }
}

/// Runtime-selected rolling sum variant.
///
/// The stream magic decides which variant a job uses; this enum lets the
/// signature and delta state machines hold either without generics.
#[derive(Clone, Debug)]
pub enum WeakSum {
    /// Classic two-half rolling sum.
    Classic(Rollsum),
    /// RabinKarp polynomial rolling hash.
    RabinKarp(RabinKarp),
}

impl WeakSum {
    /// Creates an empty classic rolling sum.
    #[must_use]
    pub fn classic() -> Self {
        WeakSum::Classic(Rollsum::default())
    }

    /// Creates an empty RabinKarp rolling hash.
    #[must_use]
    pub fn rabinkarp() -> Self {
        WeakSum::RabinKarp(RabinKarp::default())
    }
}

impl Default for WeakSum {
    fn default() -> Self {
        WeakSum::classic()
    }
}

impl RollingSum for WeakSum {
    fn reset(&mut self) {
        match self {
            WeakSum::Classic(sum) => sum.reset(),
            WeakSum::RabinKarp(sum) => sum.reset(),
        }
    }

    fn rollin(&mut self, byte: u8) {
        match self {
            WeakSum::Classic(sum) => sum.rollin(byte),
            WeakSum::RabinKarp(sum) => sum.rollin(byte),
        }
    }

    fn rotate(&mut self, outgoing: u8, incoming: u8) {
        match self {
            WeakSum::Classic(sum) => sum.rotate(outgoing, incoming),
            WeakSum::RabinKarp(sum) => sum.rotate(outgoing, incoming),
        }
    }

    fn rollout(&mut self, outgoing: u8) {
        match self {
            WeakSum::Classic(sum) => sum.rollout(outgoing),
            WeakSum::RabinKarp(sum) => sum.rollout(outgoing),
        }
    }

    fn digest(&self) -> u32 {
        match self {
            WeakSum::Classic(sum) => sum.digest(),
            WeakSum::RabinKarp(sum) => sum.digest(),
        }
    }

    fn len(&self) -> usize {
        match self {
            WeakSum::Classic(sum) => sum.len(),
            WeakSum::RabinKarp(sum) => sum.len(),
        }
    }
}
