//! The retransmission loop: one logical request/response exchange, retried
//! up to [`DriverOptions::max_retransmission_attempts`] times on receive
//! timeout before the transaction is declared fatal.

use trossen_arm_protocol::{decode_response, ErrorState, Request, Response, ResponseContext};
use trossen_arm_transport::{Session, TransportError};

use crate::error::{DriverError, LatchedError};
use crate::options::DriverOptions;

/// Datagrams in this protocol top out around the end-effector configuration
/// payload (three link properties plus three floats); 1024 bytes leaves
/// comfortable headroom without allocating per call.
const MAX_DATAGRAM: usize = 1024;

/// Send `request` and wait for its matching response, retrying on timeout.
///
/// Returns the decoded `(status, response)` pair on success. A non-`none`
/// status is returned as `Ok` — the caller decides whether and how to latch
/// it, since some callers (e.g. `get_configuration(error_state)` right
/// after `handshake`) expect to observe a non-`none` status without it
/// being fatal yet.
pub fn call(
    session: &Session,
    request: &Request,
    ctx: &ResponseContext,
    options: &DriverOptions,
) -> Result<(ErrorState, Response), DriverError> {
    let bytes = request.encode();
    let indicator = request.indicator();
    let mut buf = [0u8; MAX_DATAGRAM];

    for attempt in 0..options.max_retransmission_attempts {
        session.send(&bytes)?;
        match session.receive(&mut buf, options.timeout()) {
            Ok(n) => return Ok(decode_response(&buf[..n], indicator, ctx)?),
            Err(TransportError::Timeout { .. }) => {
                tracing::warn!(?indicator, attempt, "udp receive timed out, retransmitting");
                continue;
            }
            Err(other) => return Err(other.into()),
        }
    }

    Err(LatchedError::transport(format!(
        "no response to {indicator:?} after {} attempts",
        options.max_retransmission_attempts
    ))
    .into())
}
