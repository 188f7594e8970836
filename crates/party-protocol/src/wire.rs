use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("packet truncated: needed {needed} bytes at offset {offset}, {remaining} left")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("invalid utf-16 string at offset {0}")]
    InvalidString(usize),
    #[error("unknown party request mode 0x{0:02X}")]
    UnknownMode(u8),
    #[error("unexpected opcode 0x{found:04X} (expected 0x{expected:04X})")]
    UnexpectedOpcode { expected: u16, found: u16 },
}
