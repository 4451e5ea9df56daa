//! The host-side driver for a tethered Trossen arm: a UDP session, a
//! two-mutex preemption discipline between a background polling daemon and
//! blocking foreground calls, a quintic-Hermite trajectory engine, and a
//! mirror of the controller's configuration.
//!
//! [`Driver`] is the crate's single entry point. Everything else here is
//! either its supporting state (`trajectory`, `config_store`, `daemon`,
//! `state`) or the vocabulary it speaks in (`error`, `options`).

mod config_store;
mod daemon;
mod driver;
mod error;
mod options;
mod rpc;
mod state;
mod trajectory;

pub use config_store::ConfigurationMirror;
pub use driver::Driver;
pub use error::{DriverError, ErrorKindSummary, LatchedError, UsageError};
pub use options::{DriverOptions, MotionOptions};
pub use state::DriverState;

pub use trossen_arm_protocol::{
    ConfigurationAddress, ConfigurationValue, EndEffectorProperties, ErrorState, IpMethod, IpV4,
    JointOutput, LinkProperties, Mode, Model, EFFORT_CORRECTION_RANGE, SCALING_FACTOR_RANGE,
};
