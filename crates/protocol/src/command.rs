use crate::error::ProtocolError;
use crate::opcode::{
    decode_param, OpKind, COPY_BASE, LITERAL_BASE, MAX_IMMEDIATE_LITERAL, PROTOTAB,
};

/// Largest possible encoded command header: one command byte plus two
/// eight-byte parameters.
pub const MAX_COMMAND_LEN: usize = 17;

/// A decoded delta-stream command header.
///
/// `Literal` describes only the header; the payload bytes follow it on the
/// wire and are streamed separately.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    /// `len` verbatim bytes follow.
    Literal {
        /// Number of payload bytes; always positive.
        len: u64,
    },
    /// Copy `len` bytes starting at `offset` in the basis file.
    Copy {
        /// Byte offset into the basis.
        offset: u64,
        /// Number of bytes to copy; always positive.
        len: u64,
    },
    /// Stream terminator.
    End,
}

/// An encoded command header ready to be written to the stream.
#[derive(Clone, Copy, Debug)]
pub struct EncodedCommand {
    buf: [u8; MAX_COMMAND_LEN],
    len: usize,
}

impl EncodedCommand {
    /// Returns the encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Returns the encoded length.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no bytes were encoded; never the case for a
    /// well-formed command.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for EncodedCommand {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Smallest of the protocol's parameter widths that can hold `value`.
fn param_width(value: u64) -> u8 {
    if value <= 0xFF {
        1
    } else if value <= 0xFFFF {
        2
    } else if value <= 0xFFFF_FFFF {
        4
    } else {
        8
    }
}

/// Index of `width` within the table's width cycle.
fn width_index(width: u8) -> u8 {
    match width {
        1 => 0,
        2 => 1,
        4 => 2,
        _ => 3,
    }
}

fn push_param(buf: &mut [u8; MAX_COMMAND_LEN], at: usize, value: u64, width: u8) -> usize {
    let bytes = value.to_be_bytes();
    let width = width as usize;
    buf[at..at + width].copy_from_slice(&bytes[8 - width..]);
    at + width
}

impl Command {
    /// Encodes the command header in its minimal representation.
    ///
    /// Literal lengths 1..=64 use the immediate command bytes; larger values
    /// and COPY parameters use the narrowest widths that hold them.
    ///
    /// # Panics
    ///
    /// Panics when a literal or copy length is zero; the producers never emit
    /// empty commands.
    #[must_use]
    pub fn encode(&self) -> EncodedCommand {
        let mut buf = [0u8; MAX_COMMAND_LEN];
        let len = match *self {
            Command::End => {
                buf[0] = 0x00;
                1
            }
            Command::Literal { len } => {
                assert!(len > 0, "literal commands must carry payload");
                if len <= MAX_IMMEDIATE_LITERAL {
                    buf[0] = len as u8;
                    1
                } else {
                    let width = param_width(len);
                    buf[0] = LITERAL_BASE + width_index(width);
                    push_param(&mut buf, 1, len, width)
                }
            }
            Command::Copy { offset, len } => {
                assert!(len > 0, "copy commands must cover at least one byte");
                let off_width = param_width(offset);
                let len_width = param_width(len);
                buf[0] = COPY_BASE + width_index(off_width) * 4 + width_index(len_width);
                let at = push_param(&mut buf, 1, offset, off_width);
                push_param(&mut buf, at, len, len_width)
            }
        };
        EncodedCommand { buf, len }
    }

    /// Decodes one command header from the front of `bytes`.
    ///
    /// Returns the command and the number of header bytes consumed. `bytes`
    /// must hold the complete header; streaming callers gather
    /// [`OpcodeEntry::total_size`](crate::OpcodeEntry::total_size) bytes
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ReservedOpcode`] for unassigned command bytes
    /// and [`ProtocolError::ZeroLength`] when a length parameter is zero.
    ///
    /// # Panics
    ///
    /// Panics when `bytes` is shorter than the header the command byte
    /// declares.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), ProtocolError> {
        let cmd = bytes[0];
        let entry = &PROTOTAB[cmd as usize];
        let total = entry.total_size();
        assert!(
            bytes.len() >= total,
            "callers must supply the full {total}-byte header"
        );

        match entry.kind {
            OpKind::End => Ok((Command::End, 1)),
            OpKind::Literal => {
                let len = if entry.immediate {
                    u64::from(cmd)
                } else {
                    decode_param(&bytes[1..1 + entry.len_1 as usize])
                };
                if len == 0 {
                    return Err(ProtocolError::ZeroLength(cmd));
                }
                Ok((Command::Literal { len }, total))
            }
            OpKind::Copy => {
                let len_1 = entry.len_1 as usize;
                let offset = decode_param(&bytes[1..1 + len_1]);
                let len = decode_param(&bytes[1 + len_1..total]);
                if len == 0 {
                    return Err(ProtocolError::ZeroLength(cmd));
                }
                Ok((Command::Copy { offset, len }, total))
            }
            OpKind::Signature | OpKind::Reserved => Err(ProtocolError::ReservedOpcode(cmd)),
        }
    }
}
