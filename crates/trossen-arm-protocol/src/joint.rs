//! [`JointInput`]/[`JointOutput`] and their fixed-size wire encoding.
//!
//! `JointInput` is a tagged union in the firmware this protocol targets
//! (a mode byte plus an untagged payload union); here it is a proper Rust
//! sum type so the compiler rules out "payload variant doesn't match mode"
//! bugs that the untagged representation allowed. The wire codec still has
//! to reproduce the fixed-size slot the firmware expects: every joint's
//! input occupies [`JOINT_INPUT_WIRE_SIZE`] bytes regardless of mode, with
//! unused trailing floats zeroed.

use crate::error::ProtocolError;
use crate::ids::Mode;

/// One joint's commanded setpoint, tagged by the mode it applies to.
///
/// Sending a variant whose tag differs from the controller's configured
/// mode for that joint is a fatal protocol violation (`robot_input_mode_mismatch`).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JointInput {
    Idle,
    Position {
        position: f32,
        feedforward_velocity: f32,
        feedforward_acceleration: f32,
    },
    Velocity {
        velocity: f32,
        feedforward_acceleration: f32,
    },
    Effort {
        effort: f32,
    },
}

impl Default for JointInput {
    fn default() -> Self {
        JointInput::Idle
    }
}

impl JointInput {
    pub const fn mode(&self) -> Mode {
        match self {
            JointInput::Idle => Mode::Idle,
            JointInput::Position { .. } => Mode::Position,
            JointInput::Velocity { .. } => Mode::Velocity,
            JointInput::Effort { .. } => Mode::Effort,
        }
    }
}

/// Fixed wire size of a single joint's input slot: 1 mode byte + 3 packed
/// `f32`s (12 bytes), matching the widest variant (`Position`).
pub const JOINT_INPUT_WIRE_SIZE: usize = 1 + 3 * 4;

/// Fixed wire size of a single joint's output slot: four packed `f32`s.
pub const JOINT_OUTPUT_WIRE_SIZE: usize = 4 * 4;

impl JointInput {
    /// Encode into a fixed [`JOINT_INPUT_WIRE_SIZE`]-byte little-endian slot.
    pub fn encode(&self, out: &mut [u8; JOINT_INPUT_WIRE_SIZE]) {
        let (mode, f0, f1, f2) = match *self {
            JointInput::Idle => (Mode::Idle, 0.0, 0.0, 0.0),
            JointInput::Position {
                position,
                feedforward_velocity,
                feedforward_acceleration,
            } => (
                Mode::Position,
                position,
                feedforward_velocity,
                feedforward_acceleration,
            ),
            JointInput::Velocity {
                velocity,
                feedforward_acceleration,
            } => (Mode::Velocity, velocity, feedforward_acceleration, 0.0),
            JointInput::Effort { effort } => (Mode::Effort, effort, 0.0, 0.0),
        };
        out[0] = mode.into();
        out[1..5].copy_from_slice(&f0.to_le_bytes());
        out[5..9].copy_from_slice(&f1.to_le_bytes());
        out[9..13].copy_from_slice(&f2.to_le_bytes());
    }

    /// Decode from a fixed [`JOINT_INPUT_WIRE_SIZE`]-byte little-endian slot.
    pub fn decode(bytes: &[u8; JOINT_INPUT_WIRE_SIZE]) -> Result<Self, ProtocolError> {
        let mode = Mode::try_from(bytes[0]).map_err(|_| ProtocolError::UnknownMode(bytes[0]))?;
        let f0 = f32::from_le_bytes(bytes[1..5].try_into().unwrap());
        let f1 = f32::from_le_bytes(bytes[5..9].try_into().unwrap());
        let f2 = f32::from_le_bytes(bytes[9..13].try_into().unwrap());
        Ok(match mode {
            Mode::Idle => JointInput::Idle,
            Mode::Position => JointInput::Position {
                position: f0,
                feedforward_velocity: f1,
                feedforward_acceleration: f2,
            },
            Mode::Velocity => JointInput::Velocity {
                velocity: f0,
                feedforward_acceleration: f1,
            },
            Mode::Effort => JointInput::Effort { effort: f0 },
        })
    }
}

/// Measured state of one joint, reported every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointOutput {
    pub position: f32,
    pub velocity: f32,
    pub effort: f32,
    /// The controller's estimate of external torque/force, after
    /// subtracting the dynamic model's predicted effort.
    pub external_effort: f32,
}

impl JointOutput {
    pub fn encode(&self, out: &mut [u8; JOINT_OUTPUT_WIRE_SIZE]) {
        out[0..4].copy_from_slice(&self.position.to_le_bytes());
        out[4..8].copy_from_slice(&self.velocity.to_le_bytes());
        out[8..12].copy_from_slice(&self.effort.to_le_bytes());
        out[12..16].copy_from_slice(&self.external_effort.to_le_bytes());
    }

    pub fn decode(bytes: &[u8; JOINT_OUTPUT_WIRE_SIZE]) -> Self {
        Self {
            position: f32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            velocity: f32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            effort: f32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            external_effort: f32::from_le_bytes(bytes[12..16].try_into().unwrap()),
        }
    }
}

/// Encode a full vector of joint inputs back to back.
pub fn encode_joint_inputs(inputs: &[JointInput]) -> Vec<u8> {
    let mut out = vec![0u8; inputs.len() * JOINT_INPUT_WIRE_SIZE];
    for (i, input) in inputs.iter().enumerate() {
        let mut slot = [0u8; JOINT_INPUT_WIRE_SIZE];
        input.encode(&mut slot);
        out[i * JOINT_INPUT_WIRE_SIZE..(i + 1) * JOINT_INPUT_WIRE_SIZE].copy_from_slice(&slot);
    }
    out
}

/// Decode `num_joints` joint inputs packed back to back.
pub fn decode_joint_inputs(bytes: &[u8], num_joints: usize) -> Result<Vec<JointInput>, ProtocolError> {
    let expected = num_joints * JOINT_INPUT_WIRE_SIZE;
    if bytes.len() < expected {
        return Err(ProtocolError::FrameTooShort {
            indicator: 1,
            expected,
            actual: bytes.len(),
        });
    }
    (0..num_joints)
        .map(|i| {
            let slot: [u8; JOINT_INPUT_WIRE_SIZE] = bytes
                [i * JOINT_INPUT_WIRE_SIZE..(i + 1) * JOINT_INPUT_WIRE_SIZE]
                .try_into()
                .unwrap();
            JointInput::decode(&slot)
        })
        .collect()
}

/// Encode a full vector of joint outputs back to back.
pub fn encode_joint_outputs(outputs: &[JointOutput]) -> Vec<u8> {
    let mut out = vec![0u8; outputs.len() * JOINT_OUTPUT_WIRE_SIZE];
    for (i, output) in outputs.iter().enumerate() {
        let mut slot = [0u8; JOINT_OUTPUT_WIRE_SIZE];
        output.encode(&mut slot);
        out[i * JOINT_OUTPUT_WIRE_SIZE..(i + 1) * JOINT_OUTPUT_WIRE_SIZE].copy_from_slice(&slot);
    }
    out
}

/// Decode `num_joints` joint outputs packed back to back.
pub fn decode_joint_outputs(bytes: &[u8], num_joints: usize) -> Result<Vec<JointOutput>, ProtocolError> {
    let expected = num_joints * JOINT_OUTPUT_WIRE_SIZE;
    if bytes.len() < expected {
        return Err(ProtocolError::FrameTooShort {
            indicator: 2,
            expected,
            actual: bytes.len(),
        });
    }
    Ok((0..num_joints)
        .map(|i| {
            let slot: [u8; JOINT_OUTPUT_WIRE_SIZE] = bytes
                [i * JOINT_OUTPUT_WIRE_SIZE..(i + 1) * JOINT_OUTPUT_WIRE_SIZE]
                .try_into()
                .unwrap();
            JointOutput::decode(&slot)
        })
        .collect())
}
