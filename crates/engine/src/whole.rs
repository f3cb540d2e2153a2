//! Whole-file convenience drivers.
//!
//! These wrap the streaming jobs for callers that just have `std::io`
//! streams and want the operation run to completion. Each allocates a pair
//! of scratch buffers, pumps the job until it reports done, and returns the
//! job's statistics. The `_with_buf_len` variants override the scratch size,
//! mostly useful for exercising the streaming paths in tests.

use std::io::{self, Read, Seek, Write};

use signature::{Signature, SignatureLayout};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::buffers::Buffers;
use crate::delta::DeltaJob;
use crate::error::JobError;
use crate::job::Status;
use crate::loadsig::LoadSignatureJob;
use crate::patch::{PatchJob, SeekBasis};
use crate::sig::SignatureJob;
use crate::stats::Stats;

/// Default scratch-buffer size for the whole-file drivers.
pub const DEFAULT_BUF_LEN: usize = 64 * 1024;

fn read_retrying<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Pumps one job to completion between a reader and a writer.
fn pump<R, W, F>(
    mut iter: F,
    input: &mut R,
    output: &mut W,
    in_len: usize,
    out_len: usize,
) -> Result<(), JobError>
where
    R: Read,
    W: Write,
    F: FnMut(&mut Buffers<'_, '_>) -> Result<Status, JobError>,
{
    let mut in_buf = vec![0u8; in_len.max(1)];
    let mut out_buf = vec![0u8; out_len];
    let mut filled = 0usize;
    let mut eof = false;

    loop {
        if filled == 0 && !eof {
            filled = read_retrying(input, &mut in_buf)?;
            if filled == 0 {
                eof = true;
            }
        }

        let mut buffers = Buffers::new(&in_buf[..filled], &mut out_buf, eof);
        let status = iter(&mut buffers)?;
        let consumed = buffers.consumed();
        let produced = buffers.produced();

        if produced > 0 {
            output.write_all(&out_buf[..produced])?;
        }
        if consumed > 0 {
            in_buf.copy_within(consumed..filled, 0);
            filled -= consumed;
        }

        match status {
            Status::Done => return Ok(()),
            Status::Blocked => {
                if eof && filled == 0 && consumed == 0 && produced == 0 {
                    // Nothing left to feed and the job produced nothing:
                    // it can never make progress again.
                    return Err(JobError::Internal {
                        detail: "blocked job made no progress at end of input",
                    });
                }
            }
        }
    }
}

/// Generates the signature of `basis` into `sig_out`.
///
/// # Errors
///
/// Propagates I/O failures from either stream and any terminal job error.
pub fn signature_file<R: Read, W: Write>(
    basis: &mut R,
    sig_out: &mut W,
    layout: SignatureLayout,
) -> Result<Stats, JobError> {
    signature_file_with_buf_len(basis, sig_out, layout, DEFAULT_BUF_LEN)
}

/// [`signature_file`] with an explicit scratch-buffer size.
///
/// # Errors
///
/// As for [`signature_file`].
#[cfg_attr(
    feature = "tracing",
    instrument(skip(basis, sig_out), fields(block_len = layout.block_len()))
)]
pub fn signature_file_with_buf_len<R: Read, W: Write>(
    basis: &mut R,
    sig_out: &mut W,
    layout: SignatureLayout,
    buf_len: usize,
) -> Result<Stats, JobError> {
    let mut job = SignatureJob::new(layout);
    pump(|buffers| job.iter(buffers), basis, sig_out, buf_len, buf_len)?;
    Ok(job.statistics().clone())
}

/// Loads a signature stream into an in-memory table.
///
/// The returned table is not yet indexed; call [`Signature::build_index`]
/// before generating deltas against it.
///
/// # Errors
///
/// Propagates read failures and any terminal job error such as
/// [`JobError::BadMagic`].
pub fn load_signature_file<R: Read>(sig_in: &mut R) -> Result<(Signature, Stats), JobError> {
    load_signature_file_with_buf_len(sig_in, DEFAULT_BUF_LEN)
}

/// [`load_signature_file`] with an explicit scratch-buffer size.
///
/// # Errors
///
/// As for [`load_signature_file`].
#[cfg_attr(feature = "tracing", instrument(skip(sig_in)))]
pub fn load_signature_file_with_buf_len<R: Read>(
    sig_in: &mut R,
    buf_len: usize,
) -> Result<(Signature, Stats), JobError> {
    let mut job = LoadSignatureJob::new();
    let mut devnull = io::sink();
    pump(|buffers| job.iter(buffers), sig_in, &mut devnull, buf_len, 0)?;
    let stats = job.statistics().clone();
    let sig = job.into_signature().ok_or(JobError::Internal {
        detail: "loader finished without yielding a signature",
    })?;
    Ok((sig, stats))
}

/// Computes the delta from `sig` to the contents of `new` into `delta_out`.
///
/// # Errors
///
/// Returns [`JobError::Param`] when the signature's index has not been
/// built, plus any stream or job failure.
pub fn delta_file<R: Read, W: Write>(
    sig: &Signature,
    new: &mut R,
    delta_out: &mut W,
) -> Result<Stats, JobError> {
    delta_file_with_buf_len(sig, new, delta_out, DEFAULT_BUF_LEN)
}

/// [`delta_file`] with an explicit scratch-buffer size.
///
/// # Errors
///
/// As for [`delta_file`].
#[cfg_attr(
    feature = "tracing",
    instrument(skip(sig, new, delta_out), fields(blocks = sig.block_count()))
)]
pub fn delta_file_with_buf_len<R: Read, W: Write>(
    sig: &Signature,
    new: &mut R,
    delta_out: &mut W,
    buf_len: usize,
) -> Result<Stats, JobError> {
    let mut job = DeltaJob::new(sig)?;
    pump(|buffers| job.iter(buffers), new, delta_out, buf_len, buf_len)?;
    Ok(job.statistics().clone())
}

/// Applies `delta` to `basis`, writing the reconstructed file to `new_out`.
///
/// # Errors
///
/// Propagates stream failures and any terminal job error such as
/// [`JobError::Corrupt`] for a damaged delta.
pub fn patch_file<B, R, W>(basis: B, delta: &mut R, new_out: &mut W) -> Result<Stats, JobError>
where
    B: Read + Seek,
    R: Read,
    W: Write,
{
    patch_file_with_buf_len(basis, delta, new_out, DEFAULT_BUF_LEN)
}

/// [`patch_file`] with an explicit scratch-buffer size.
///
/// # Errors
///
/// As for [`patch_file`].
#[cfg_attr(feature = "tracing", instrument(skip(basis, delta, new_out)))]
pub fn patch_file_with_buf_len<B, R, W>(
    basis: B,
    delta: &mut R,
    new_out: &mut W,
    buf_len: usize,
) -> Result<Stats, JobError>
where
    B: Read + Seek,
    R: Read,
    W: Write,
{
    let mut job = PatchJob::new(SeekBasis::new(basis));
    pump(|buffers| job.iter(buffers), delta, new_out, buf_len, buf_len)?;
    Ok(job.statistics().clone())
}
