#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Streaming jobs implementing the delta algorithm.
//!
//! Four job kinds exist: [`SignatureJob`] reduces a basis file to checksums,
//! [`LoadSignatureJob`] parses a signature stream back into a
//! [`signature::Signature`], [`DeltaJob`] scans a new file against a loaded
//! table and emits COPY/LITERAL commands, and [`PatchJob`] replays a delta
//! against the basis to rebuild the new file.
//!
//! All four share the same pull-driven shape: the caller owns the buffers,
//! wraps them in a [`Buffers`] view, and calls `iter` until it returns
//! [`Status::Done`]. [`Status::Blocked`] means the job needs more input or
//! more output room; nothing blocks inside the library. Output already
//! handed to the caller is final and is never revised by a later call.
//!
//! The whole-file helpers ([`signature_file`], [`load_signature_file`],
//! [`delta_file`], [`patch_file`]) drive a job over `std::io` streams for
//! callers that do not need incremental control.

mod buffers;
mod delta;
mod error;
mod job;
mod loadsig;
mod patch;
mod sig;
mod stats;
mod tube;
mod whole;

pub use buffers::Buffers;
pub use delta::DeltaJob;
pub use error::JobError;
pub use job::Status;
pub use loadsig::LoadSignatureJob;
pub use patch::{BasisRead, PatchJob, SeekBasis};
pub use sig::SignatureJob;
pub use stats::Stats;
pub use whole::{
    delta_file, delta_file_with_buf_len, load_signature_file, load_signature_file_with_buf_len,
    patch_file, patch_file_with_buf_len, signature_file, signature_file_with_buf_len,
    DEFAULT_BUF_LEN,
};
