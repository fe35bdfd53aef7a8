use thiserror::Error;

/// Main error type for meter communication
///
/// Leaf layers (CRC, framer, codec) return these directly; the session
/// translates transport failures into its own decisions (abort the
/// association, or skip the object and continue).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeterError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Timeout")]
    Timeout,

    #[error("Frame format error: {0}")]
    FrameFormat(String),

    #[error("Checksum mismatch: computed 0x{computed:04X}, received 0x{received:04X}")]
    CrcMismatch { computed: u16, received: u16 },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Unsupported data type: 0x{0:02X}")]
    UnsupportedDataType(u8),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

// Carried as the rendered message rather than the source error so the
// session can keep a copy of the last failure for `last_error()`.
impl From<std::io::Error> for MeterError {
    fn from(err: std::io::Error) -> Self {
        MeterError::Io(err.to_string())
    }
}

/// Result type alias for meter operations
pub type MeterResult<T> = Result<T, MeterError>;
