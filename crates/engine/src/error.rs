use std::io;
use std::sync::Arc;

use signature::LayoutError;
use thiserror::Error;

/// Terminal job failures.
///
/// Once `iter` returns one of these the job is dead: every further call
/// reports the same error. [`Status::Blocked`](crate::Status) is not an
/// error; it only asks the caller for more buffer space.
///
/// The I/O variant holds its source in an [`Arc`] so the error stays
/// cloneable for that sticky-failure behaviour.
#[derive(Clone, Debug, Error)]
pub enum JobError {
    /// An I/O failure from the basis-read callback or a whole-file driver.
    #[error("I/O error: {0}")]
    Io(#[source] Arc<io::Error>),
    /// The stream prefix is not an accepted magic value.
    #[error("bad magic {found:#010x} at start of stream")]
    BadMagic {
        /// The four bytes actually found, big-endian.
        found: u32,
    },
    /// A structurally valid stream carried an impossible value.
    #[error("corrupt stream: {detail}")]
    Corrupt {
        /// What was impossible about it.
        detail: String,
    },
    /// Input ended in the middle of a record.
    #[error("input ended in the middle of a record")]
    InputEnded,
    /// Invalid arguments to a job constructor.
    #[error("invalid parameter: {detail}")]
    Param {
        /// Which argument and why.
        detail: String,
    },
    /// The stream requested behaviour this build does not provide.
    #[error("unimplemented: {detail}")]
    Unimplemented {
        /// The missing behaviour.
        detail: &'static str,
    },
    /// An internal invariant failed; this is a library bug.
    #[error("internal error: {detail}")]
    Internal {
        /// The violated invariant.
        detail: &'static str,
    },
}

impl From<io::Error> for JobError {
    fn from(err: io::Error) -> Self {
        JobError::Io(Arc::new(err))
    }
}

impl From<LayoutError> for JobError {
    fn from(err: LayoutError) -> Self {
        JobError::Param {
            detail: err.to_string(),
        }
    }
}
