#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Wire-level definitions shared by the signature, delta, and patch layers.
//!
//! Every stream opens with a four-byte big-endian [`Magic`] that pins the
//! file kind and, for signatures, the weak/strong checksum pairing. Delta
//! streams then carry a sequence of commands encoded through a single
//! descriptor table ([`PROTOTAB`]) that drives both the encoder and the
//! decoder, so the two can never drift apart.

mod command;
mod error;
mod magic;
mod opcode;

pub use command::{Command, EncodedCommand, MAX_COMMAND_LEN};
pub use error::ProtocolError;
pub use magic::{Magic, StrongKind, WeakKind};
pub use opcode::{decode_param, OpKind, OpcodeEntry, PROTOTAB};
