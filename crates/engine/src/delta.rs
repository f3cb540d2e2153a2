//! The delta-producing job.
//!
//! The scan keeps a rolling window of up to one block of new-file bytes. A
//! weak-sum hit against the signature table is confirmed with the strong
//! digest; confirmed blocks become COPY commands (fused with an adjacent
//! predecessor when they continue the same basis region) and everything that
//! falls out of the window unmatched accumulates into a pending LITERAL.
//! Once input ends the window shrinks byte by byte, still probing the table
//! so a shared short final block is found, before the remainder flushes as
//! the last LITERAL and the END byte terminates the stream.

use std::collections::VecDeque;

use checksums::{RollingSum, WeakSum};
use protocol::{Command, Magic};
use signature::{weak_sum_for, MatchOutcome, Signature};

use crate::buffers::Buffers;
use crate::error::JobError;
use crate::job::{JobCore, Progress, StateMachine, Status, StepIo};
use crate::stats::Stats;

/// Pending-literal size that forces a flush mid-scan. Fixed, so the emitted
/// command stream is identical however the caller chops its buffers.
const LITERAL_FLUSH_LEN: usize = 32 * 1024;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AfterFlush {
    Scan,
    Tail,
    End,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum DeltaState {
    Header,
    Scan,
    Tail,
    FlushLiteral { emitted: usize, then: AfterFlush },
    End,
}

#[derive(Debug)]
pub(crate) struct DeltaMachine<'a> {
    sig: &'a Signature,
    block_len: usize,
    state: DeltaState,
    weak: WeakSum,
    window: VecDeque<u8>,
    /// Whether the current window contents have already been probed, so a
    /// re-entry after gathering more input does not probe (and count) the
    /// same position twice.
    probed: bool,
    scratch: Vec<u8>,
    literal: Vec<u8>,
    pending_copy: Option<(u64, u64)>,
}

impl<'a> DeltaMachine<'a> {
    fn new(sig: &'a Signature) -> Self {
        let block_len = sig.block_len() as usize;
        let weak = weak_sum_for(sig.magic())
            .expect("signature tables always carry a signature magic");
        Self {
            sig,
            block_len,
            state: DeltaState::Header,
            weak,
            window: VecDeque::with_capacity(block_len),
            probed: false,
            scratch: Vec::with_capacity(block_len),
            literal: Vec::new(),
            pending_copy: None,
        }
    }

    fn emit_copy(&mut self, (offset, len): (u64, u64), io: &mut StepIo<'_>) {
        let encoded = Command::Copy { offset, len }.encode();
        io.push(encoded.as_bytes());
        io.stats.copy_cmds += 1;
        io.stats.copy_bytes += len;
        io.stats.copy_cmdbytes += encoded.len() as u64;
    }

    /// Emits the LITERAL command header and switches to the flushing state;
    /// the payload streams out from there.
    fn begin_literal_flush(&mut self, then: AfterFlush, io: &mut StepIo<'_>) {
        debug_assert!(!self.literal.is_empty());
        let encoded = Command::Literal {
            len: self.literal.len() as u64,
        }
        .encode();
        io.push(encoded.as_bytes());
        io.stats.lit_cmds += 1;
        io.stats.lit_cmdbytes += encoded.len() as u64;
        self.state = DeltaState::FlushLiteral { emitted: 0, then };
    }

    /// Books a confirmed match. Returns `true` when the machine switched to
    /// literal flushing and the caller must yield to the runtime.
    fn on_match(&mut self, block: u32, then: AfterFlush, io: &mut StepIo<'_>) -> bool {
        let len = self.window.len() as u64;
        let offset = u64::from(block) * self.block_len as u64;
        self.window.clear();
        self.weak.reset();
        self.probed = false;

        if !self.literal.is_empty() {
            // The accumulated literal precedes this copy; the copy waits as
            // pending so later matches can still fuse onto it.
            debug_assert!(self.pending_copy.is_none());
            self.pending_copy = Some((offset, len));
            self.begin_literal_flush(then, io);
            return true;
        }

        match self.pending_copy {
            Some((prev_offset, prev_len)) if prev_offset + prev_len == offset => {
                self.pending_copy = Some((prev_offset, prev_len + len));
            }
            Some(prev) => {
                self.emit_copy(prev, io);
                self.pending_copy = Some((offset, len));
            }
            None => self.pending_copy = Some((offset, len)),
        }
        false
    }

    /// Demotes one unmatched byte to the pending literal. Returns `true`
    /// when the literal hit its flush threshold and the machine switched to
    /// flushing.
    fn push_literal_byte(&mut self, byte: u8, then: AfterFlush, io: &mut StepIo<'_>) -> bool {
        if let Some(pending) = self.pending_copy.take() {
            self.emit_copy(pending, io);
        }
        self.literal.push(byte);
        if self.literal.len() >= LITERAL_FLUSH_LEN {
            self.begin_literal_flush(then, io);
            return true;
        }
        false
    }

    /// Probes the table for the current window, at most once per position.
    fn probe(&mut self, io: &mut StepIo<'_>) -> Option<u32> {
        if self.probed {
            return None;
        }
        self.probed = true;
        let outcome = self
            .sig
            .find_match(self.weak.digest(), &self.window, &mut self.scratch);
        if outcome == MatchOutcome::WeakOnly {
            io.stats.false_matches += 1;
        }
        match outcome {
            MatchOutcome::Match(block) => Some(block),
            MatchOutcome::WeakOnly | MatchOutcome::Absent => None,
        }
    }

    fn scan_step(&mut self, io: &mut StepIo<'_>) -> Result<Progress, JobError> {
        loop {
            // Emitted commands may have spilled into the tube; never let the
            // spill grow past one record before the runtime drains it.
            if !io.is_clear() {
                return Ok(Progress::Blocked);
            }

            while self.window.len() < self.block_len {
                let data = io.data();
                if data.is_empty() {
                    if io.eof() {
                        self.state = DeltaState::Tail;
                    }
                    return Ok(Progress::Continue);
                }
                let n = (self.block_len - self.window.len()).min(data.len());
                for &byte in io.take(n) {
                    self.weak.rollin(byte);
                    self.window.push_back(byte);
                }
                self.probed = false;
            }

            if let Some(block) = self.probe(io) {
                if self.on_match(block, AfterFlush::Scan, io) {
                    return Ok(Progress::Continue);
                }
            } else {
                let data = io.data();
                if data.is_empty() {
                    if io.eof() {
                        self.state = DeltaState::Tail;
                    }
                    return Ok(Progress::Continue);
                }
                let incoming = data[0];
                io.consume(1);
                let outgoing = self
                    .window
                    .pop_front()
                    .expect("scan window is full at this point");
                self.weak.rotate(outgoing, incoming);
                self.window.push_back(incoming);
                self.probed = false;
                if self.push_literal_byte(outgoing, AfterFlush::Scan, io) {
                    return Ok(Progress::Continue);
                }
            }
        }
    }

    fn tail_step(&mut self, io: &mut StepIo<'_>) -> Result<Progress, JobError> {
        loop {
            if !io.is_clear() {
                return Ok(Progress::Blocked);
            }

            if self.window.is_empty() {
                if let Some(pending) = self.pending_copy.take() {
                    self.emit_copy(pending, io);
                }
                if !self.literal.is_empty() {
                    self.begin_literal_flush(AfterFlush::End, io);
                } else {
                    self.state = DeltaState::End;
                }
                return Ok(Progress::Continue);
            }

            if let Some(block) = self.probe(io) {
                if self.on_match(block, AfterFlush::Tail, io) {
                    return Ok(Progress::Continue);
                }
            } else {
                let outgoing = self
                    .window
                    .pop_front()
                    .expect("tail window is non-empty here");
                self.weak.rollout(outgoing);
                self.probed = false;
                if self.push_literal_byte(outgoing, AfterFlush::Tail, io) {
                    return Ok(Progress::Continue);
                }
            }
        }
    }

    fn flush_step(
        &mut self,
        emitted: usize,
        then: AfterFlush,
        io: &mut StepIo<'_>,
    ) -> Result<Progress, JobError> {
        let n = io.avail_out().min(self.literal.len() - emitted);
        if n == 0 {
            return Ok(Progress::Blocked);
        }
        io.push(&self.literal[emitted..emitted + n]);
        io.stats.lit_bytes += n as u64;

        let emitted = emitted + n;
        if emitted == self.literal.len() {
            self.literal.clear();
            self.state = match then {
                AfterFlush::Scan => DeltaState::Scan,
                AfterFlush::Tail => DeltaState::Tail,
                AfterFlush::End => DeltaState::End,
            };
        } else {
            self.state = DeltaState::FlushLiteral { emitted, then };
        }
        Ok(Progress::Continue)
    }
}

impl StateMachine for DeltaMachine<'_> {
    fn required(&self) -> usize {
        match self.state {
            DeltaState::Scan => {
                if self.window.len() < self.block_len {
                    self.block_len - self.window.len()
                } else {
                    1
                }
            }
            _ => 0,
        }
    }

    fn step(&mut self, io: &mut StepIo<'_>) -> Result<Progress, JobError> {
        match self.state {
            DeltaState::Header => {
                io.push(&Magic::Delta.to_bytes());
                self.state = DeltaState::Scan;
                Ok(Progress::Continue)
            }
            DeltaState::Scan => self.scan_step(io),
            DeltaState::Tail => self.tail_step(io),
            DeltaState::FlushLiteral { emitted, then } => self.flush_step(emitted, then, io),
            DeltaState::End => {
                io.push(&[0x00]);
                Ok(Progress::Finished)
            }
        }
    }
}

/// Streaming job that computes the delta from a loaded signature to a new
/// file.
///
/// The signature table is borrowed read-only for the life of the job, so one
/// table can serve many concurrent delta jobs.
#[derive(Debug)]
pub struct DeltaJob<'a> {
    core: JobCore<DeltaMachine<'a>>,
}

impl<'a> DeltaJob<'a> {
    /// Creates a delta job over an indexed signature table.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Param`] when [`Signature::build_index`] has not
    /// been called on the table.
    pub fn new(sig: &'a Signature) -> Result<Self, JobError> {
        if !sig.is_indexed() {
            return Err(JobError::Param {
                detail: "signature index not built; call build_index first".into(),
            });
        }
        let mut core = JobCore::new(DeltaMachine::new(sig), "delta");
        core.stats_mut().block_len = sig.block_len();
        core.stats_mut().sig_blocks = sig.block_count() as u64;
        Ok(Self { core })
    }

    /// Advances the job across the caller's buffers.
    ///
    /// # Errors
    ///
    /// Terminal failures are sticky; see [`JobError`].
    pub fn iter(&mut self, buffers: &mut Buffers<'_, '_>) -> Result<Status, JobError> {
        self.core.iter(buffers)
    }

    /// Returns the statistics accumulated so far.
    #[must_use]
    pub fn statistics(&self) -> &Stats {
        self.core.stats()
    }
}
