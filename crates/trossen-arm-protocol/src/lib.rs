//! Wire-level building blocks for the Trossen arm UDP protocol: frame
//! layouts, the byte-exact codec, and quintic Hermite trajectory
//! interpolation.
//!
//! This crate has no knowledge of sockets, threads or retransmission — see
//! `trossen-arm-transport` for the UDP session and `trossen-arm-driver` for
//! the stateful API built on top of both.

pub mod config;
pub mod error;
pub mod frames;
pub mod ids;
pub mod interpolate;
pub mod joint;

pub use config::{
    ConfigurationValue, EndEffectorProperties, IpV4, LinkProperties, EFFORT_CORRECTION_RANGE,
    SCALING_FACTOR_RANGE,
};
pub use error::ProtocolError;
pub use frames::{decode_response, encode_response, Request, Response, ResponseContext};
pub use ids::{ConfigurationAddress, ErrorState, IpMethod, Mode, Model, RobotCommandIndicator};
pub use interpolate::QuinticHermiteInterpolator;
pub use joint::{
    decode_joint_inputs, decode_joint_outputs, encode_joint_inputs, encode_joint_outputs,
    JointInput, JointOutput, JOINT_INPUT_WIRE_SIZE, JOINT_OUTPUT_WIRE_SIZE,
};

/// UDP port the controller listens on.
pub const PORT: u16 = 50000;

/// Per-attempt response timeout, in microseconds.
pub const TIMEOUT_US: u64 = 1000;

/// Maximum number of retransmission attempts before a call gives up.
pub const MAX_RETRANSMISSION_ATTEMPTS: u32 = 100;
