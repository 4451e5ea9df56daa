//! The unified, top-level crate: re-exports the protocol, transport, and
//! driver crates behind one name, plus a convenience `tracing` subscriber
//! installer for applications that just want reasonable defaults.
//!
//! Applications that want fine control over logging, or that already run
//! their own `tracing` subscriber, should depend on `trossen-arm-driver`
//! directly and skip [`init_logging`].

pub use trossen_arm_driver::*;
pub use trossen_arm_protocol::{
    JointInput, QuinticHermiteInterpolator, MAX_RETRANSMISSION_ATTEMPTS, PORT, TIMEOUT_US,
};
pub use trossen_arm_transport::{Session, TransportError};

/// Install a `tracing-subscriber` formatter reading its filter from
/// `RUST_LOG`, defaulting to `info` if unset. Intended for binaries and
/// examples; libraries should never call this themselves.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
