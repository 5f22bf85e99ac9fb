/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    /// The frame does not start with the plaintext preamble.
    #[error("invalid frame preamble 0x{0:02x} (expected 0x00)")]
    InvalidPreamble(u8),

    /// A varint ran past 32 bits.
    #[error("varint exceeds 32 bits")]
    VarintOverflow,

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
