/// Errors that can occur while encoding or decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// The buffer is shorter than the header or the declared payload requires.
    #[error("buffer too small ({actual} bytes, need {needed})")]
    TooSmallBuffer { needed: usize, actual: usize },

    /// The stored header checksum does not match the recomputed one.
    #[error("header CRC-8 mismatch (stored {actual:#04x}, computed {expected:#04x})")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// The buffer does not start with the sync marker.
    #[error("invalid sync marker {0:#06x} (expected 0xaa55)")]
    InvalidSync(u16),

    /// The header carries a protocol version other than the supported one.
    #[error("unsupported protocol version {0:#04x}")]
    UnsupportedVersion(u8),

    /// The header carries a type tag outside the defined set.
    #[error("unknown packet type {0:#04x}")]
    UnknownPacketType(u8),

    /// The payload does not fit the 16-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing packets.
    #[error("packet I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete packet was received.
    #[error("connection closed (incomplete packet)")]
    ConnectionClosed,
}

impl ProtoError {
    /// True for failures that leave the packet boundary unknown.
    ///
    /// A stream decoder must resynchronise on the next sync marker after one of these.
    pub fn is_header_error(&self) -> bool {
        matches!(
            self,
            ProtoError::ChecksumMismatch { .. }
                | ProtoError::InvalidSync(_)
                | ProtoError::UnsupportedVersion(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ProtoError>;
