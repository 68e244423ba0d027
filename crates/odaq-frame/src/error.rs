use odaq_transport::TransportError;

/// Errors that can occur while checking, encoding or reading frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The checksum prefix does not match the payload.
    #[error("checksum mismatch (expected {expected:#06x}, computed {actual:#06x})")]
    Integrity { expected: u16, actual: u16 },

    /// The buffer is too short to carry a checksum prefix.
    #[error("buffer too short for checksum prefix ({len} bytes)")]
    Truncated { len: usize },

    /// The input ended right after an escape marker.
    #[error("input ends with a dangling escape marker")]
    DanglingEscape,

    /// The payload does not fit the one-byte frame length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A data frame header used the value reserved for stop frames.
    #[error("header kind {0} is reserved for stop frames")]
    ReservedMarker(u8),

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An I/O error surfaced through the async codec.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
