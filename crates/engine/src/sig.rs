//! The signature-producing job.

use checksums::{RollingSum, WeakSum};
use signature::{weak_sum_for, SignatureAlgorithm, SignatureLayout};

use crate::buffers::Buffers;
use crate::error::JobError;
use crate::job::{JobCore, Progress, StateMachine, Status, StepIo};
use crate::stats::Stats;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SigState {
    Header,
    Blocks,
}

pub(crate) struct SigMachine {
    layout: SignatureLayout,
    algorithm: SignatureAlgorithm,
    weak: WeakSum,
    state: SigState,
}

impl SigMachine {
    fn new(layout: SignatureLayout) -> Self {
        let algorithm = SignatureAlgorithm::from_magic(layout.magic())
            .expect("layout validation only accepts signature magics");
        let weak = weak_sum_for(layout.magic())
            .expect("layout validation only accepts signature magics");
        Self {
            layout,
            algorithm,
            weak,
            state: SigState::Header,
        }
    }
}

impl StateMachine for SigMachine {
    fn required(&self) -> usize {
        match self.state {
            SigState::Header => 0,
            SigState::Blocks => self.layout.block_len() as usize,
        }
    }

    fn step(&mut self, io: &mut StepIo<'_>) -> Result<Progress, JobError> {
        match self.state {
            SigState::Header => {
                let mut header = [0u8; 12];
                header[..4].copy_from_slice(&self.layout.magic().to_bytes());
                header[4..8].copy_from_slice(&self.layout.block_len().to_be_bytes());
                header[8..12].copy_from_slice(&self.layout.strong_len().to_be_bytes());
                io.push(&header);
                self.state = SigState::Blocks;
                Ok(Progress::Continue)
            }
            SigState::Blocks => {
                if !io.is_clear() {
                    return Ok(Progress::Blocked);
                }

                let block_len = self.layout.block_len() as usize;
                let data = io.data();
                let take = if data.len() >= block_len {
                    block_len
                } else if io.eof() {
                    data.len()
                } else {
                    // The runtime gathers a full block before stepping.
                    return Ok(Progress::Blocked);
                };
                if take == 0 {
                    return Ok(Progress::Finished);
                }

                let chunk = io.take(take);
                self.weak.reset();
                self.weak.update(chunk);
                let strong = self.algorithm.compute(chunk);
                let strong_len = self.layout.strong_len() as usize;

                let mut entry = [0u8; 4 + 32];
                entry[..4].copy_from_slice(&self.weak.digest().to_be_bytes());
                entry[4..4 + strong_len].copy_from_slice(&strong[..strong_len]);
                io.push(&entry[..4 + strong_len]);

                io.stats.sig_cmds += 1;
                io.stats.sig_blocks += 1;
                io.stats.sig_bytes += (4 + strong_len) as u64;
                Ok(Progress::Continue)
            }
        }
    }
}

/// Streaming job that reduces a basis file to its signature.
///
/// Feed the basis bytes through [`iter`](Self::iter); the job emits the
/// signature header followed by one `(weak, strong)` entry per block. The
/// final block may be short and is hashed over the bytes actually present.
pub struct SignatureJob {
    core: JobCore<SigMachine>,
}

impl SignatureJob {
    /// Creates a job from a validated layout.
    #[must_use]
    pub fn new(layout: SignatureLayout) -> Self {
        let mut core = JobCore::new(SigMachine::new(layout), "signature");
        core.stats_mut().block_len = layout.block_len();
        Self { core }
    }

    /// Creates a job from raw parameters, validating them first.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Param`] for a non-signature magic, a block length
    /// outside the accepted range, or a strong length the digest cannot
    /// provide.
    pub fn from_params(
        magic: protocol::Magic,
        block_len: u32,
        strong_len: u32,
    ) -> Result<Self, JobError> {
        let layout = SignatureLayout::new(magic, block_len, strong_len)?;
        Ok(Self::new(layout))
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
