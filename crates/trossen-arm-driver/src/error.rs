//! The three-band error taxonomy: usage errors raised synchronously, and
//! transport/protocol/controller errors latched by the daemon and re-raised
//! by every subsequent call until `cleanup`.

use thiserror::Error;
use trossen_arm_protocol::{ErrorState, ProtocolError};
use trossen_arm_transport::TransportError;

/// Errors raised synchronously from the offending call, never latched:
/// the caller asked for something the driver can reject without touching
/// the wire.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UsageError {
    #[error("expected a vector of length {expected}, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("joint index {index} out of range for {num_joints} joints")]
    IndexOutOfRange { index: usize, num_joints: usize },

    #[error("{field} value {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("invalid IPv4 address {0:?}")]
    InvalidIpAddress(String),

    #[error("driver has not been configured yet")]
    NotConfigured,

    #[error("driver has already been cleaned up")]
    AlreadyCleaned,

    #[error("configure() called on a driver that is not unconfigured")]
    AlreadyConfigured,
}

/// What latched a session shut: either the controller reported a non-`none`
/// status, or the driver's own transport/protocol layer failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKindSummary {
    Controller(ErrorState),
    Transport,
    Protocol,
}

impl std::fmt::Display for ErrorKindSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKindSummary::Controller(state) => write!(f, "{}", state.short_name()),
            ErrorKindSummary::Transport => write!(f, "transport_error"),
            ErrorKindSummary::Protocol => write!(f, "protocol_error"),
        }
    }
}

/// A latched, fatal condition: stored once by the daemon (or by a main-thread
/// call that fails directly) and re-raised by every subsequent non-cleanup
/// call until `cleanup()` tears the session down.
///
/// The Rust analogue of the source's static `ERROR_INFORMATION` table plus
/// the `get_log()` string: `kind` is the stable short name, `message` is the
/// detailed, possibly empty, human-readable explanation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct LatchedError {
    pub kind: ErrorKindSummary,
    pub message: String,
}

impl LatchedError {
    pub fn controller(state: ErrorState, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKindSummary::Controller(state),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKindSummary::Transport,
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKindSummary::Protocol,
            message: message.into(),
        }
    }
}

/// Top-level error type returned by every public driver method.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Latched(#[from] LatchedError),
}
