//! The patch-applying job.

use std::io::{self, Read, Seek, SeekFrom};

use protocol::{Command, Magic, OpKind, ProtocolError, PROTOTAB};

use crate::buffers::Buffers;
use crate::error::JobError;
use crate::job::{JobCore, Progress, StateMachine, Status, StepIo};
use crate::stats::Stats;

/// Basis bytes fetched per callback round while replaying a COPY command.
const COPY_CHUNK: usize = 8 * 1024;

/// Source of basis-file bytes for COPY commands.
///
/// The patch job calls [`read_at`](Self::read_at) with an absolute offset and
/// loops on short reads, so implementations may return fewer bytes than the
/// buffer holds. Returning zero bytes for a positive request makes the job
/// fail with [`JobError::Corrupt`]; errors propagate to the caller unchanged.
pub trait BasisRead {
    /// Reads up to `buf.len()` bytes from `offset`, returning the count read.
    ///
    /// # Errors
    ///
    /// Any I/O failure aborts the patch job with [`JobError::Io`].
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

/// [`BasisRead`] over any seekable reader, remembering its position so
/// sequential COPY commands skip redundant seeks.
#[derive(Debug)]
pub struct SeekBasis<R> {
    inner: R,
    position: Option<u64>,
}

impl<R: Read + Seek> SeekBasis<R> {
    /// Wraps a seekable reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            position: None,
        }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> BasisRead for SeekBasis<R> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if self.position != Some(offset) {
            self.inner.seek(SeekFrom::Start(offset))?;
        }
        let got = loop {
            match self.inner.read(buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.position = None;
                    return Err(err);
                }
            }
        };
        self.position = Some(offset + got as u64);
        Ok(got)
    }
}

impl BasisRead for &[u8] {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Ok(offset) = usize::try_from(offset) else {
            return Ok(0);
        };
        if offset >= self.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.len() - offset);
        buf[..n].copy_from_slice(&self[offset..offset + n]);
        Ok(n)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PatchState {
    Header,
    Cmd,
    Params { cmd: u8 },
    Literal { remaining: u64 },
    Copy { offset: u64, remaining: u64 },
}

pub(crate) struct PatchMachine<B> {
    basis: B,
    state: PatchState,
    chunk: Vec<u8>,
}

impl<B: BasisRead> PatchMachine<B> {
    fn new(basis: B) -> Self {
        Self {
            basis,
            state: PatchState::Header,
            chunk: Vec::new(),
        }
    }

    fn corrupt(detail: impl Into<String>) -> JobError {
        JobError::Corrupt {
            detail: detail.into(),
        }
    }
}

impl<B: BasisRead> StateMachine for PatchMachine<B> {
    fn required(&self) -> usize {
        match self.state {
            PatchState::Header => 4,
            PatchState::Cmd => 1,
            PatchState::Params { cmd } => PROTOTAB[cmd as usize].total_size() - 1,
            PatchState::Literal { .. } => 1,
            PatchState::Copy { .. } => 0,
        }
    }

    fn step(&mut self, io: &mut StepIo<'_>) -> Result<Progress, JobError> {
        match self.state {
            PatchState::Header => {
                if io.data().len() < 4 {
                    return Err(JobError::InputEnded);
                }
                let raw = u32::from_be_bytes(io.take(4).try_into().expect("4 bytes"));
                if Magic::from_raw(raw) != Ok(Magic::Delta) {
                    return Err(JobError::BadMagic { found: raw });
                }
                self.state = PatchState::Cmd;
                Ok(Progress::Continue)
            }
            PatchState::Cmd => {
                let data = io.data();
                if data.is_empty() {
                    // A well-formed delta ends with the END byte, never by
                    // running out of input.
                    return Err(JobError::InputEnded);
                }
                let cmd = io.take(1)[0];
                let entry = &PROTOTAB[cmd as usize];
                match entry.kind {
                    OpKind::End => Ok(Progress::Finished),
                    OpKind::Literal if entry.immediate => {
                        io.stats.lit_cmds += 1;
                        io.stats.lit_cmdbytes += 1;
                        self.state = PatchState::Literal {
                            remaining: u64::from(cmd),
                        };
                        Ok(Progress::Continue)
                    }
                    OpKind::Literal | OpKind::Copy => {
                        self.state = PatchState::Params { cmd };
                        Ok(Progress::Continue)
                    }
                    OpKind::Signature | OpKind::Reserved => {
                        Err(Self::corrupt(ProtocolError::ReservedOpcode(cmd).to_string()))
                    }
                }
            }
            PatchState::Params { cmd } => {
                let entry = &PROTOTAB[cmd as usize];
                let params = entry.total_size() - 1;
                if io.data().len() < params {
                    return Err(JobError::InputEnded);
                }

                let mut header = [0u8; protocol::MAX_COMMAND_LEN];
                header[0] = cmd;
                header[1..1 + params].copy_from_slice(io.take(params));
                let (command, consumed) = Command::decode(&header[..1 + params])
                    .map_err(|err| Self::corrupt(err.to_string()))?;
                debug_assert_eq!(consumed, 1 + params);

                match command {
                    Command::Literal { len } => {
                        io.stats.lit_cmds += 1;
                        io.stats.lit_cmdbytes += (1 + params) as u64;
                        self.state = PatchState::Literal { remaining: len };
                    }
                    Command::Copy { offset, len } => {
                        io.stats.copy_cmds += 1;
                        io.stats.copy_cmdbytes += (1 + params) as u64;
                        self.state = PatchState::Copy {
                            offset,
                            remaining: len,
                        };
                    }
                    Command::End => {
                        return Err(JobError::Internal {
                            detail: "END reached the parameter state",
                        });
                    }
                }
                Ok(Progress::Continue)
            }
            PatchState::Literal { remaining } => {
                let data = io.data();
                if data.is_empty() {
                    return if io.eof() {
                        Err(JobError::InputEnded)
                    } else {
                        Ok(Progress::Blocked)
                    };
                }
                let n = data
                    .len()
                    .min(io.avail_out())
                    .min(usize::try_from(remaining).unwrap_or(usize::MAX));
                if n == 0 {
                    return Ok(Progress::Blocked);
                }
                let chunk = io.take(n);
                io.push(chunk);
                io.stats.lit_bytes += n as u64;

                let remaining = remaining - n as u64;
                self.state = if remaining == 0 {
                    PatchState::Cmd
                } else {
                    PatchState::Literal { remaining }
                };
                Ok(Progress::Continue)
            }
            PatchState::Copy { offset, remaining } => {
                let room = io.avail_out();
                if room == 0 {
                    return Ok(Progress::Blocked);
                }
                let want = room
                    .min(COPY_CHUNK)
                    .min(usize::try_from(remaining).unwrap_or(usize::MAX));
                if self.chunk.len() < want {
                    self.chunk.resize(want, 0);
                }

                let got = self.basis.read_at(offset, &mut self.chunk[..want])?;
                if got == 0 {
                    return Err(Self::corrupt(format!(
                        "basis read at offset {offset} returned no data for a \
                         {remaining}-byte copy"
                    )));
                }
                let got = got.min(want);
                io.push(&self.chunk[..got]);
                io.stats.copy_bytes += got as u64;

                let remaining = remaining - got as u64;
                self.state = if remaining == 0 {
                    PatchState::Cmd
                } else {
                    PatchState::Copy {
                        offset: offset + got as u64,
                        remaining,
                    }
                };
                Ok(Progress::Continue)
            }
        }
    }
}

/// Streaming job that applies a delta to a basis, producing the new file.
///
/// The job owns nothing beyond its basis-read callback; feed it the delta
/// stream and collect the reconstructed output.
pub struct PatchJob<B> {
    core: JobCore<PatchMachine<B>>,
}

impl<B: BasisRead> PatchJob<B> {
    /// Creates a patch job over the given basis source.
    #[must_use]
    pub fn new(basis: B) -> Self {
        Self {
            core: JobCore::new(PatchMachine::new(basis), "patch"),
        }
    }

    /// Advances the job across the caller's buffers.
    ///
    /// # Errors
    ///
    /// [`JobError::BadMagic`] for a stream that is not a delta,
    /// [`JobError::Corrupt`] for reserved opcodes, zero-length parameters, or
    /// a basis read that yields nothing, [`JobError::InputEnded`] for a
    /// truncated stream, and [`JobError::Io`] for callback failures.
    pub fn iter(&mut self, buffers: &mut Buffers<'_, '_>) -> Result<Status, JobError> {
        self.core.iter(buffers)
    }

    /// Returns the statistics accumulated so far.
    #[must_use]
    pub fn statistics(&self) -> &Stats {
        self.core.stats()
    }

    /// Consumes the job and returns the basis source.
    pub fn into_basis(self) -> B {
        self.core.into_machine().basis
    }
}
