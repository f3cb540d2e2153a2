use thiserror::Error;

/// Failures raised while decoding wire-level structures.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProtocolError {
    /// The stream prefix is not one of the recognised magic values.
    #[error("unknown stream magic {0:#010x}")]
    UnknownMagic(u32),
    /// The command byte maps to a reserved table entry.
    #[error("reserved command byte {0:#04x} in delta stream")]
    ReservedOpcode(u8),
    /// A command parameter was zero where the protocol requires a positive
    /// value.
    #[error("command {0:#04x} carries a zero-length parameter")]
    ZeroLength(u8),
}
