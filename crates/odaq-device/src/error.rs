use odaq_frame::FrameError;
use odaq_transport::TransportError;

use crate::field::FieldKind;

/// Errors that can occur in device operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The response checksum does not match its payload.
    #[error("response checksum mismatch (expected {expected:#06x}, computed {actual:#06x})")]
    Integrity { expected: u16, actual: u16 },

    /// Fewer response bytes arrived than the command expects.
    #[error("short response ({actual} of {expected} bytes)")]
    Length { expected: usize, actual: usize },

    /// The response declares a field length other than the expected one.
    #[error("response declares {declared} field bytes, expected {expected}")]
    DeclaredLength { expected: usize, declared: usize },

    /// An argument is outside the range the device accepts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A decoded field does not have the kind the caller asked for.
    #[error("response field {index} is not {kind:?}")]
    UnexpectedField { index: usize, kind: FieldKind },

    /// A response field holds a value the driver has no meaning for.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Stream framing error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl DeviceError {
    /// Whether this is one of the two length error kinds.
    pub fn is_length_error(&self) -> bool {
        matches!(self, Self::Length { .. } | Self::DeclaredLength { .. })
    }

    /// Whether this is a checksum failure.
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
