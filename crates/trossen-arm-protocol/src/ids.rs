//! Small fixed-width identifiers shared by every frame kind: the command
//! indicator byte, the per-joint mode byte, the configuration address byte,
//! and the latched error state byte that doubles as the response status.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Selects which of the eight request/response frame kinds a datagram carries.
///
/// This is always the first byte of a request, and is echoed back as the
/// first byte of the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RobotCommandIndicator {
    Handshake = 0,
    SetJointInputs = 1,
    GetJointOutputs = 2,
    SetHome = 3,
    SetConfiguration = 4,
    GetConfiguration = 5,
    GetLog = 6,
}

/// Per-joint control regime.
///
/// The driver caches a vector of configured modes; the controller keeps its
/// own copy. Every [`crate::JointInput`] sent carries a mode tag, and the
/// controller latches `robot_input_mode_mismatch` if that tag ever disagrees
/// with the mode it has configured for that joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive, Default)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    #[default]
    Idle = 0,
    Position = 1,
    Velocity = 2,
    Effort = 3,
}

/// Addresses a single field of the driver/controller configuration mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigurationAddress {
    FactoryResetFlag = 0,
    IpMethod = 1,
    ManualIp = 2,
    Dns = 3,
    Gateway = 4,
    Subnet = 5,
    EffortCorrection = 6,
    ErrorState = 7,
    Modes = 8,
    EndEffector = 9,
}

/// Latched error state, reported in the status byte of every response.
///
/// `None` (value 0) is the only non-fatal value; every other variant is
/// latched by the driver and re-raised by every subsequent non-cleanup call
/// until the session is torn down (or cleared explicitly through
/// `reset_error_state`, which is itself only available because `configure`
/// was given `clear_error = true`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorState {
    None = 0,
    UdpInitFailed = 1,
    CanInitFailed = 2,
    JointCommandFailed = 3,
    JointFeedbackFailed = 4,
    JointEnableFailed = 5,
    JointDisableFailed = 6,
    JointSetHomeFailed = 7,
    JointDisabledUnexpectedly = 8,
    JointOverheated = 9,
    InvalidMode = 10,
    InvalidRobotCommand = 11,
    InvalidRobotCommandSize = 12,
    InvalidConfigurationAddress = 13,
    InvalidPendingCommand = 14,
    RobotInputModeMismatch = 15,
    RobotInputDiscontinuous = 16,
}

impl ErrorState {
    /// Short, stable kind name. The Rust analogue of the source's static
    /// `ERROR_INFORMATION` table (minus the detailed log, which is fetched
    /// separately via `get_log`).
    pub const fn short_name(self) -> &'static str {
        match self {
            ErrorState::None => "none",
            ErrorState::UdpInitFailed => "udp_init_failed",
            ErrorState::CanInitFailed => "can_init_failed",
            ErrorState::JointCommandFailed => "joint_command_failed",
            ErrorState::JointFeedbackFailed => "joint_feedback_failed",
            ErrorState::JointEnableFailed => "joint_enable_failed",
            ErrorState::JointDisableFailed => "joint_disable_failed",
            ErrorState::JointSetHomeFailed => "joint_set_home_failed",
            ErrorState::JointDisabledUnexpectedly => "joint_disabled_unexpectedly",
            ErrorState::JointOverheated => "joint_overheated",
            ErrorState::InvalidMode => "invalid_mode",
            ErrorState::InvalidRobotCommand => "invalid_robot_command",
            ErrorState::InvalidRobotCommandSize => "invalid_robot_command_size",
            ErrorState::InvalidConfigurationAddress => "invalid_configuration_address",
            ErrorState::InvalidPendingCommand => "invalid_pending_command",
            ErrorState::RobotInputModeMismatch => "robot_input_mode_mismatch",
            ErrorState::RobotInputDiscontinuous => "robot_input_discontinuous",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, ErrorState::None)
    }
}

/// Supported robot models and their fixed joint counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Model {
    WxaiV0 = 0,
}

impl Model {
    pub const fn num_joints(self) -> u8 {
        match self {
            Model::WxaiV0 => 7,
        }
    }
}

/// IP configuration method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive, Default)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IpMethod {
    #[default]
    Manual = 0,
    Dhcp = 1,
}
