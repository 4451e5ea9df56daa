//! UDP session plumbing: bind an ephemeral local port, `connect` it to the
//! controller, and exchange single datagrams under a caller-supplied
//! timeout.
//!
//! This crate does not retry and does not know the wire format — it is
//! the only crate in the workspace that touches a socket, and it keeps
//! that responsibility narrow. Retransmission policy and frame layout
//! belong to `trossen-arm-driver` and `trossen-arm-protocol` respectively.

pub mod error;

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

pub use error::TransportError;

/// A connected UDP socket to a single controller.
///
/// `Session` is deliberately synchronous and single-threaded from its own
/// point of view: callers serialize access to it themselves (the driver
/// crate's two-mutex discipline is what makes that safe across the daemon
/// and main threads).
pub struct Session {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl Session {
    /// Bind an ephemeral local port and connect it to `server_ip:port`.
    pub fn connect(server_ip: Ipv4Addr, port: u16) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).map_err(TransportError::Bind)?;
        let peer = SocketAddr::V4(SocketAddrV4::new(server_ip, port));
        socket.connect(peer).map_err(|source| TransportError::Connect {
            address: peer.to_string(),
            source,
        })?;
        tracing::debug!(local = ?socket.local_addr().ok(), peer = %peer, "udp session connected");
        Ok(Self { socket, peer })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Send one datagram. The frame must already fit in a single UDP
    /// payload; this crate does no fragmentation.
    pub fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        tracing::trace!(len = bytes.len(), "udp send");
        self.socket.send(bytes).map_err(TransportError::Send)?;
        Ok(())
    }

    /// Receive one datagram, waiting at most `timeout`.
    ///
    /// Returns [`TransportError::Timeout`] if nothing arrives in time — the
    /// caller decides whether and how to retry, this layer does not.
    pub fn receive(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        self.socket
            .set_read_timeout(Some(timeout))
            .map_err(TransportError::SetTimeout)?;
        match self.socket.recv(buf) {
            Ok(n) => {
                tracing::trace!(len = n, "udp receive");
                Ok(n)
            }
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                Err(TransportError::Timeout {
                    timeout_us: timeout.as_micros() as u64,
                })
            }
            Err(e) => Err(TransportError::Receive(e)),
        }
    }

    /// Close the socket. `Session` also closes it on drop; this exists so
    /// the driver's cleanup path can log the transition explicitly and
    /// surface any close-time error instead of silently dropping it.
    pub fn close(self) {
        tracing::debug!(peer = %self.peer, "udp session closed");
        drop(self);
    }
}
