//! The signature-loading job.

use protocol::Magic;
use signature::{Signature, SignatureLayout};

use crate::buffers::Buffers;
use crate::error::JobError;
use crate::job::{JobCore, Progress, StateMachine, Status, StepIo};
use crate::stats::Stats;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LoadState {
    Magic,
    Header { magic: Magic },
    Entries,
}

pub(crate) struct LoadMachine {
    state: LoadState,
    entry_len: usize,
    sig: Option<Signature>,
}

impl LoadMachine {
    fn new() -> Self {
        Self {
            state: LoadState::Magic,
            entry_len: 0,
            sig: None,
        }
    }
}

impl StateMachine for LoadMachine {
    fn required(&self) -> usize {
        match self.state {
            LoadState::Magic => 4,
            LoadState::Header { .. } => 8,
            LoadState::Entries => self.entry_len,
        }
    }

    fn step(&mut self, io: &mut StepIo<'_>) -> Result<Progress, JobError> {
        match self.state {
            LoadState::Magic => {
                if io.data().len() < 4 {
                    return Err(JobError::InputEnded);
                }
                let raw = u32::from_be_bytes(io.take(4).try_into().expect("4 bytes"));
                let magic = Magic::from_raw(raw)
                    .ok()
                    .filter(|magic| magic.is_signature())
                    .ok_or(JobError::BadMagic { found: raw })?;
                self.state = LoadState::Header { magic };
                Ok(Progress::Continue)
            }
            LoadState::Header { magic } => {
                if io.data().len() < 8 {
                    return Err(JobError::InputEnded);
                }
                let header = io.take(8);
                let block_len = u32::from_be_bytes(header[..4].try_into().expect("4 bytes"));
                let strong_len = u32::from_be_bytes(header[4..].try_into().expect("4 bytes"));
                let layout =
                    SignatureLayout::new(magic, block_len, strong_len).map_err(|err| {
                        JobError::Corrupt {
                            detail: format!("signature header rejected: {err}"),
                        }
                    })?;

                io.stats.block_len = block_len;
                self.entry_len = 4 + strong_len as usize;
                self.sig = Some(Signature::new(layout));
                self.state = LoadState::Entries;
                Ok(Progress::Continue)
            }
            LoadState::Entries => {
                let data = io.data();
                if data.len() < self.entry_len {
                    return if data.is_empty() && io.eof() {
                        Ok(Progress::Finished)
                    } else if io.eof() {
                        Err(JobError::InputEnded)
                    } else {
                        Ok(Progress::Blocked)
                    };
                }

                let entry = io.take(self.entry_len);
                let weak = u32::from_be_bytes(entry[..4].try_into().expect("4 bytes"));
                let sig = self
                    .sig
                    .as_mut()
                    .ok_or(JobError::Internal {
                        detail: "entry state reached without a table",
                    })?;
                sig.push_block(weak, &entry[4..]);

                io.stats.sig_cmds += 1;
                io.stats.sig_blocks += 1;
                io.stats.sig_bytes += self.entry_len as u64;
                Ok(Progress::Continue)
            }
        }
    }
}

/// Streaming job that parses a signature stream into a [`Signature`] table.
///
/// Feed the signature bytes through [`iter`](Self::iter); once it reports
/// [`Status::Done`], [`into_signature`](Self::into_signature) yields the
/// table. Call [`Signature::build_index`] before handing it to a delta job.
pub struct LoadSignatureJob {
    core: JobCore<LoadMachine>,
}

impl Default for LoadSignatureJob {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadSignatureJob {
    /// Creates the loader job.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: JobCore::new(LoadMachine::new(), "load signature"),
        }
    }

    /// Advances the job across the caller's buffers. The job consumes input
    /// only; it produces no output bytes.
    ///
    /// # Errors
    ///
    /// [`JobError::BadMagic`] for an unrecognised prefix (including the delta
    /// magic), [`JobError::Corrupt`] for out-of-range header fields, and
    /// [`JobError::InputEnded`] when the stream stops mid-record.
    pub fn iter(&mut self, buffers: &mut Buffers<'_, '_>) -> Result<Status, JobError> {
        self.core.iter(buffers)
    }

    /// Returns the statistics accumulated so far.
    #[must_use]
    pub fn statistics(&self) -> &Stats {
        self.core.stats()
    }

    /// Consumes the finished job and returns the loaded table.
    ///
    /// Returns `None` while the job has not reported [`Status::Done`].
    #[must_use]
    pub fn into_signature(self) -> Option<Signature> {
        if !self.core.is_complete() {
            return None;
        }
        self.core.into_machine().sig
    }
}
