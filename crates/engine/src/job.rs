//! The pull-driven job runtime.
//!
//! A job is a state machine advanced by repeated `iter` calls. The runtime
//! loop here is shared by all four job kinds: it first drains held-back
//! output, then gathers the input bytes the next state function requires
//! (borrowing straight from the caller's buffer when possible, accumulating
//! through the tube's scoop otherwise), and finally steps the machine. A
//! state function therefore always sees either a contiguous view of at least
//! its requirement or, once `eof_in` is set, whatever genuinely remains.

use std::collections::VecDeque;

use crate::buffers::Buffers;
use crate::error::JobError;
use crate::stats::Stats;
use crate::tube::Tube;

/// Outcome of a successful `iter` call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    /// The stream is complete; further calls keep returning `Done`.
    Done,
    /// The job needs more input or more output room to continue.
    Blocked,
}

/// What a state function achieved in one step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Progress {
    /// Advanced; run the (possibly new) state immediately.
    Continue,
    /// Cannot proceed until the caller supplies buffers.
    Blocked,
    /// The final state ran; the stream is complete.
    Finished,
}

/// The view a state function works through: gathered input on one side,
/// caller output plus spill-over on the other.
pub(crate) struct StepIo<'a> {
    data: &'a [u8],
    eof: bool,
    consumed: usize,
    out: &'a mut [u8],
    out_pos: &'a mut usize,
    spill: &'a mut VecDeque<u8>,
    pub(crate) stats: &'a mut Stats,
}

impl<'a> StepIo<'a> {
    /// The gathered, not-yet-consumed input bytes.
    pub(crate) fn data(&self) -> &'a [u8] {
        &self.data[self.consumed..]
    }

    /// `true` when `data` is everything the stream will ever provide.
    pub(crate) fn eof(&self) -> bool {
        self.eof
    }

    /// Marks `n` bytes of `data` as consumed.
    pub(crate) fn consume(&mut self, n: usize) {
        self.consumed += n;
        debug_assert!(self.consumed <= self.data.len());
    }

    /// Consumes and returns the next `n` bytes.
    pub(crate) fn take(&mut self, n: usize) -> &'a [u8] {
        let taken = &self.data[self.consumed..self.consumed + n];
        self.consumed += n;
        taken
    }

    /// `true` when no spilled output is pending. Machines emit at most one
    /// small record while the tube is dirty, so the spill stays bounded by
    /// one record regardless of caller buffer sizes.
    pub(crate) fn is_clear(&self) -> bool {
        self.spill.is_empty()
    }

    /// Direct output room. Zero while spilled output is pending, which stops
    /// bulk copy loops from growing the spill without bound.
    pub(crate) fn avail_out(&self) -> usize {
        if self.spill.is_empty() {
            self.out.len() - *self.out_pos
        } else {
            0
        }
    }

    /// Appends output, spilling into the tube once the caller's buffer is
    /// full. Ordering is preserved: once anything has spilled, everything
    /// further spills behind it.
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        if self.spill.is_empty() {
            let room = self.out.len() - *self.out_pos;
            let n = room.min(bytes.len());
            self.out[*self.out_pos..*self.out_pos + n].copy_from_slice(&bytes[..n]);
            *self.out_pos += n;
            if n < bytes.len() {
                self.spill.extend(&bytes[n..]);
            }
        } else {
            self.spill.extend(bytes);
        }
    }
}

/// One node of a job's state machine.
pub(crate) trait StateMachine {
    /// Input bytes the next step needs gathered before it runs. Zero for
    /// output-only states. The runtime either satisfies the requirement or
    /// passes a short view with `eof` set.
    fn required(&self) -> usize;

    /// Runs one state function.
    fn step(&mut self, io: &mut StepIo<'_>) -> Result<Progress, JobError>;
}

/// Machine-independent job state: the tube, statistics, and terminal status.
#[derive(Debug)]
pub(crate) struct JobCore<M> {
    machine: M,
    tube: Tube,
    stats: Stats,
    complete: bool,
    failed: Option<JobError>,
}

impl<M: StateMachine> JobCore<M> {
    pub(crate) fn new(machine: M, op: &'static str) -> Self {
        Self {
            machine,
            tube: Tube::new(),
            stats: Stats::for_op(op),
            complete: false,
            failed: None,
        }
    }

    pub(crate) fn stats(&self) -> &Stats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.complete
    }

    pub(crate) fn into_machine(self) -> M {
        self.machine
    }

    /// Advances the job until it completes or blocks on the buffers.
    pub(crate) fn iter(&mut self, buffers: &mut Buffers<'_, '_>) -> Result<Status, JobError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }

        let consumed_before = buffers.consumed();
        let produced_before = buffers.produced();
        let result = self.run(buffers);
        self.stats.in_bytes += (buffers.consumed() - consumed_before) as u64;
        self.stats.out_bytes += (buffers.produced() - produced_before) as u64;

        match result {
            Ok(Status::Done) => {
                if self.stats.elapsed.is_none() {
                    self.stats.elapsed = self.stats.start.map(|start| start.elapsed());
                }
                Ok(Status::Done)
            }
            Ok(Status::Blocked) => Ok(Status::Blocked),
            Err(err) => {
                self.failed = Some(err.clone());
                Err(err)
            }
        }
    }

    fn run(&mut self, buffers: &mut Buffers<'_, '_>) -> Result<Status, JobError> {
        loop {
            // Held output always leaves first; a machine never runs while
            // earlier output is stuck in the tube.
            if !self.tube.drain_out(buffers) {
                return Ok(Status::Blocked);
            }
            if self.complete {
                return Ok(Status::Done);
            }

            let required = self.machine.required();
            let direct = self.tube.scoop_len() == 0 && buffers.avail_in() >= required;
            if required > 0 && !direct {
                let have = self.tube.scoop_len();
                if have < required {
                    self.tube.absorb(buffers, required - have);
                }
                if self.tube.scoop_len() < required && !buffers.eof_in() {
                    return Ok(Status::Blocked);
                }
            }

            let scooped = self.tube.scoop_len() > 0;
            let eof = if scooped {
                buffers.eof_in && buffers.avail_in() == 0
            } else {
                buffers.eof_in
            };

            let input: &[u8] = buffers.input;
            let data: &[u8] = if scooped {
                &self.tube.scoop[self.tube.scoop_pos..]
            } else {
                &input[buffers.in_pos..]
            };

            let mut io = StepIo {
                data,
                eof,
                consumed: 0,
                out: &mut *buffers.output,
                out_pos: &mut buffers.out_pos,
                spill: &mut self.tube.out,
                stats: &mut self.stats,
            };
            let progress = self.machine.step(&mut io)?;
            let consumed = io.consumed;

            if scooped {
                self.tube.consume_scoop(consumed);
            } else {
                buffers.in_pos += consumed;
            }

            match progress {
                Progress::Continue => {}
                Progress::Blocked => {
                    // A machine blocked on output while the caller still has
                    // room gets another chance after the spill drains.
                    if !self.tube.out.is_empty() && buffers.avail_out() > 0 {
                        continue;
                    }
                    return Ok(Status::Blocked);
                }
                Progress::Finished => {
                    self.complete = true;
                }
            }
        }
    }
}
