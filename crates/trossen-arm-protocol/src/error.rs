//! Protocol-level error types.

use thiserror::Error;

/// Failures decoding or encoding a wire frame.
///
/// These are distinct from [`crate::ErrorState`]: a `ProtocolError` means the
/// bytes on the wire could not be turned into a frame at all (wrong length,
/// unknown indicator/status byte); an `ErrorState` is a *valid* frame whose
/// status byte reports that the controller itself is unhappy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame too short for indicator {indicator:?}: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        indicator: u8,
        expected: usize,
        actual: usize,
    },

    #[error("unknown robot command indicator byte: {0}")]
    UnknownIndicator(u8),

    #[error("unknown mode byte: {0}")]
    UnknownMode(u8),

    #[error("unknown status byte: {0}")]
    UnknownStatus(u8),

    #[error("response echoed indicator {got:?}, expected {expected:?}")]
    IndicatorMismatch { expected: u8, got: u8 },

    #[error("log payload was not valid UTF-8")]
    InvalidLog,

    #[error("decoding a get_configuration response requires knowing which address was requested")]
    MissingConfigurationAddress,
}
