//! Transport-level error types.

use std::net::AddrParseError;
use thiserror::Error;

/// Failures establishing or using the UDP session.
///
/// These never carry payload bytes: decoding failures belong to
/// `trossen_arm_protocol::ProtocolError`, one layer up.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to parse host address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to bind local UDP socket: {0}")]
    Bind(#[source] std::io::Error),

    #[error("failed to connect UDP socket to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send datagram: {0}")]
    Send(#[source] std::io::Error),

    #[error("failed to receive datagram: {0}")]
    Receive(#[source] std::io::Error),

    /// No datagram arrived within the configured timeout. Distinct from
    /// every other variant: this is the expected shape of a dropped UDP
    /// packet, and callers treat it as a retry signal rather than a hard
    /// failure. Only a caller-tracked retry budget turns repeated timeouts
    /// into something fatal.
    #[error("no response within {timeout_us}us")]
    Timeout { timeout_us: u64 },

    #[error("failed to set socket timeout: {0}")]
    SetTimeout(#[source] std::io::Error),
}
