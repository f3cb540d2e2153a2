use std::fmt;
use std::time::{Duration, Instant};

/// Counters accumulated over the lifetime of one job.
///
/// Command counts and byte totals are split per command kind the way the
/// classic tooling reports them, so `literal[...]`/`copy[...]` summaries stay
/// comparable across implementations.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    /// Human-readable operation name, e.g. `"delta"`.
    pub op: &'static str,
    /// Number of LITERAL commands emitted or applied.
    pub lit_cmds: u64,
    /// Payload bytes carried by LITERAL commands.
    pub lit_bytes: u64,
    /// Header bytes spent on LITERAL commands.
    pub lit_cmdbytes: u64,
    /// Number of COPY commands emitted or applied.
    pub copy_cmds: u64,
    /// Basis bytes covered by COPY commands.
    pub copy_bytes: u64,
    /// Header bytes spent on COPY commands.
    pub copy_cmdbytes: u64,
    /// Number of signature entries produced or loaded.
    pub sig_cmds: u64,
    /// Bytes of signature entries produced or loaded.
    pub sig_bytes: u64,
    /// Blocks described by the signature in play.
    pub sig_blocks: u64,
    /// Weak-sum hits whose strong sum failed to confirm.
    pub false_matches: u64,
    /// Block length of the signature in play.
    pub block_len: u32,
    /// Total bytes consumed from the caller's input buffers.
    pub in_bytes: u64,
    /// Total bytes handed back through the caller's output buffers.
    pub out_bytes: u64,
    /// When the job was created.
    pub start: Option<Instant>,
    /// Wall-clock time from creation to completion, set once the job is done.
    pub elapsed: Option<Duration>,
}

impl Stats {
    pub(crate) fn for_op(op: &'static str) -> Self {
        Self {
            op,
            start: Some(Instant::now()),
            ..Self::default()
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} statistics:", self.op)?;
        if self.lit_cmds > 0 || self.copy_cmds > 0 {
            write!(
                f,
                " literal[{} cmds, {} bytes, {} cmdbytes]",
                self.lit_cmds, self.lit_bytes, self.lit_cmdbytes
            )?;
            write!(
                f,
                " copy[{} cmds, {} bytes, {} cmdbytes, {} false]",
                self.copy_cmds, self.copy_bytes, self.copy_cmdbytes, self.false_matches
            )?;
        }
        if self.sig_cmds > 0 {
            write!(
                f,
                " signature[{} entries, {} bytes, {} blocklen]",
                self.sig_cmds, self.sig_bytes, self.block_len
            )?;
        }
        write!(f, " in[{} bytes] out[{} bytes]", self.in_bytes, self.out_bytes)?;
        if let Some(elapsed) = self.elapsed {
            write!(f, " in {:.3}s", elapsed.as_secs_f64())?;
        }
        Ok(())
    }
}
