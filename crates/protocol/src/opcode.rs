//! The command descriptor table.
//!
//! One immutable 256-entry array describes every possible command byte; the
//! encoder selects bytes by searching the same shapes the decoder reads back,
//! so the two directions cannot disagree about the wire layout.

/// Operation class of a command byte.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpKind {
    /// Stream terminator.
    End,
    /// Verbatim bytes follow the command header.
    Literal,
    /// Signature data; unused by the delta format but part of the table's
    /// vocabulary.
    Signature,
    /// Copy a range of the basis file.
    Copy,
    /// Not assigned; decoding one is a stream corruption.
    Reserved,
}

/// Descriptor for a single command byte.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OpcodeEntry {
    /// Operation class.
    pub kind: OpKind,
    /// When `true` the first parameter is the command byte itself and
    /// `len_1` is zero.
    pub immediate: bool,
    /// Bytes of the first parameter following the command byte.
    pub len_1: u8,
    /// Bytes of the second parameter; zero for everything but COPY.
    pub len_2: u8,
}

impl OpcodeEntry {
    /// Total encoded size of the command header including the command byte.
    #[must_use]
    pub const fn total_size(&self) -> usize {
        1 + self.len_1 as usize + self.len_2 as usize
    }
}

const RESERVED: OpcodeEntry = OpcodeEntry {
    kind: OpKind::Reserved,
    immediate: false,
    len_1: 0,
    len_2: 0,
};

/// Parameter widths in the order the COPY block of the table cycles through.
pub(crate) const PARAM_WIDTHS: [u8; 4] = [1, 2, 4, 8];

/// First command byte of the COPY width matrix.
pub(crate) const COPY_BASE: u8 = 0x45;

/// First command byte of the explicit-length LITERAL run.
pub(crate) const LITERAL_BASE: u8 = 0x41;

/// Largest literal length representable as an immediate command byte.
pub(crate) const MAX_IMMEDIATE_LITERAL: u64 = 0x40;

/// Descriptor table indexed by command byte.
///
/// Layout: `0x00` END; `0x01..=0x40` immediate literals whose length is the
/// command byte; `0x41..=0x44` literals with a 1/2/4/8-byte length;
/// `0x45..=0x54` the COPY matrix with every (offset, length) width pairing;
/// everything above is reserved.
pub static PROTOTAB: [OpcodeEntry; 256] = build_prototab();

const fn build_prototab() -> [OpcodeEntry; 256] {
    let mut tab = [RESERVED; 256];

    tab[0x00] = OpcodeEntry {
        kind: OpKind::End,
        immediate: false,
        len_1: 0,
        len_2: 0,
    };

    let mut cmd = 0x01;
    while cmd <= MAX_IMMEDIATE_LITERAL as usize {
        tab[cmd] = OpcodeEntry {
            kind: OpKind::Literal,
            immediate: true,
            len_1: 0,
            len_2: 0,
        };
        cmd += 1;
    }

    let mut width = 0;
    while width < PARAM_WIDTHS.len() {
        tab[LITERAL_BASE as usize + width] = OpcodeEntry {
            kind: OpKind::Literal,
            immediate: false,
            len_1: PARAM_WIDTHS[width],
            len_2: 0,
        };
        width += 1;
    }

    let mut off_width = 0;
    while off_width < PARAM_WIDTHS.len() {
        let mut len_width = 0;
        while len_width < PARAM_WIDTHS.len() {
            tab[COPY_BASE as usize + off_width * 4 + len_width] = OpcodeEntry {
                kind: OpKind::Copy,
                immediate: false,
                len_1: PARAM_WIDTHS[off_width],
                len_2: PARAM_WIDTHS[len_width],
            };
            len_width += 1;
        }
        off_width += 1;
    }

    tab
}

/// Reads a big-endian parameter of up to eight bytes.
///
/// # Panics
///
/// Panics when `bytes` is longer than eight bytes; callers size the slice
/// from a descriptor width, which never exceeds that.
#[must_use]
pub fn decode_param(bytes: &[u8]) -> u64 {
    assert!(bytes.len() <= 8, "parameters are at most eight bytes wide");
    let mut value = 0u64;
    for &byte in bytes {
        value = (value << 8) | u64::from(byte);
    }
    value
}
