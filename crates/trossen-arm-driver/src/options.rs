//! Host-side tuning knobs. Orthogonal to the wire-level [`ConfigurationAddress`]
//! RPCs: these never leave the process, they just shape how the daemon talks
//! to the controller.
//!
//! [`ConfigurationAddress`]: trossen_arm_protocol::ConfigurationAddress

use std::time::Duration;

use trossen_arm_protocol::{MAX_RETRANSMISSION_ATTEMPTS, TIMEOUT_US};

/// Tuning knobs for the UDP session and the daemon loop.
#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    /// Per-attempt receive timeout, in microseconds.
    pub timeout_us: u64,
    /// Maximum number of retransmissions before a transaction is fatal.
    pub max_retransmission_attempts: u32,
    /// Extra sleep the daemon takes between slots, beyond what the receive
    /// timeout already imposes. Zero by default — the daemon paces itself
    /// off `timeout_us` the way the controller firmware expects.
    pub cycle_pacing: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            timeout_us: TIMEOUT_US,
            max_retransmission_attempts: MAX_RETRANSMISSION_ATTEMPTS,
            cycle_pacing: Duration::ZERO,
        }
    }
}

impl DriverOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_micros(self.timeout_us)
    }
}

/// Per-call motion parameters shared by every `set_*_position/velocity/effort`
/// method. Rust has no default arguments, so this struct stands in for the
/// source's `goal_time = 2.0f, blocking = true` defaults.
#[derive(Debug, Clone, Copy)]
pub struct MotionOptions {
    pub goal_time: f32,
    pub blocking: bool,
}

impl Default for MotionOptions {
    fn default() -> Self {
        Self {
            goal_time: 2.0,
            blocking: true,
        }
    }
}
