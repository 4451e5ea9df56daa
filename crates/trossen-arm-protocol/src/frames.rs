//! Full request/response framing: glues the indicator byte, the status byte
//! and the per-kind payload codecs in `joint` and `config` together.
//!
//! A request is `[indicator:u8][payload...]`. A response is
//! `[indicator:u8][status:u8][payload...]`, where the indicator echoes the
//! request's and the status is an [`ErrorState`] — `None` for a healthy
//! reply, anything else a latched fault the payload should not be trusted
//! past.

use crate::config::ConfigurationValue;
use crate::error::ProtocolError;
use crate::ids::{ConfigurationAddress, ErrorState, Model, RobotCommandIndicator};
use crate::joint::{decode_joint_outputs, encode_joint_inputs, JointInput, JointOutput};

/// A driver-to-controller request frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Handshake { model: Model },
    SetJointInputs { inputs: Vec<JointInput> },
    GetJointOutputs,
    SetHome,
    SetConfiguration { value: ConfigurationValue },
    GetConfiguration { address: ConfigurationAddress },
    GetLog,
}

impl Request {
    pub fn indicator(&self) -> RobotCommandIndicator {
        match self {
            Request::Handshake { .. } => RobotCommandIndicator::Handshake,
            Request::SetJointInputs { .. } => RobotCommandIndicator::SetJointInputs,
            Request::GetJointOutputs => RobotCommandIndicator::GetJointOutputs,
            Request::SetHome => RobotCommandIndicator::SetHome,
            Request::SetConfiguration { .. } => RobotCommandIndicator::SetConfiguration,
            Request::GetConfiguration { .. } => RobotCommandIndicator::GetConfiguration,
            Request::GetLog => RobotCommandIndicator::GetLog,
        }
    }

    /// Encode the full datagram, indicator byte included.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.indicator().into()];
        match self {
            Request::Handshake { model } => out.push((*model).into()),
            Request::SetJointInputs { inputs } => out.extend(encode_joint_inputs(inputs)),
            Request::GetJointOutputs | Request::SetHome | Request::GetLog => {}
            Request::SetConfiguration { value } => {
                out.push(value.address().into());
                out.extend(value.encode());
            }
            Request::GetConfiguration { address } => out.push((*address).into()),
        }
        out
    }
}

/// A controller-to-driver response frame, with the status byte already
/// peeled off into `ErrorState`.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Handshake { num_joints: u8, firmware_version: u32 },
    JointOutputs { outputs: Vec<JointOutput> },
    Ack,
    Configuration { value: ConfigurationValue },
    Log { message: String },
}

/// Context needed to decode a response that the indicator byte alone does
/// not determine: how many joints the current configuration expects, and
/// (for `get_configuration` replies) which address was requested.
#[derive(Debug, Clone, Copy)]
pub struct ResponseContext {
    pub num_joints: usize,
    pub configuration_address: Option<ConfigurationAddress>,
}

impl ResponseContext {
    pub fn new(num_joints: usize) -> Self {
        Self {
            num_joints,
            configuration_address: None,
        }
    }

    pub fn for_configuration(num_joints: usize, address: ConfigurationAddress) -> Self {
        Self {
            num_joints,
            configuration_address: Some(address),
        }
    }
}

const HANDSHAKE_PAYLOAD_SIZE: usize = 1 + 4;

/// Decode a response datagram, checking that it echoes `expected` and
/// returning `(status, response)`. The caller is responsible for treating a
/// non-`None` status as fatal and not trusting the accompanying payload.
pub fn decode_response(
    bytes: &[u8],
    expected: RobotCommandIndicator,
    ctx: &ResponseContext,
) -> Result<(ErrorState, Response), ProtocolError> {
    if bytes.len() < 2 {
        return Err(ProtocolError::FrameTooShort {
            indicator: expected.into(),
            expected: 2,
            actual: bytes.len(),
        });
    }
    let got = RobotCommandIndicator::try_from(bytes[0])
        .map_err(|_| ProtocolError::UnknownIndicator(bytes[0]))?;
    if got != expected {
        return Err(ProtocolError::IndicatorMismatch {
            expected: expected.into(),
            got: got.into(),
        });
    }
    let status = ErrorState::try_from(bytes[1]).map_err(|_| ProtocolError::UnknownStatus(bytes[1]))?;
    let payload = &bytes[2..];

    let response = match expected {
        RobotCommandIndicator::Handshake => {
            if payload.len() < HANDSHAKE_PAYLOAD_SIZE {
                return Err(ProtocolError::FrameTooShort {
                    indicator: expected.into(),
                    expected: HANDSHAKE_PAYLOAD_SIZE,
                    actual: payload.len(),
                });
            }
            Response::Handshake {
                num_joints: payload[0],
                firmware_version: u32::from_le_bytes(payload[1..5].try_into().unwrap()),
            }
        }
        RobotCommandIndicator::SetJointInputs | RobotCommandIndicator::GetJointOutputs => {
            Response::JointOutputs {
                outputs: decode_joint_outputs(payload, ctx.num_joints)?,
            }
        }
        RobotCommandIndicator::SetHome | RobotCommandIndicator::SetConfiguration => Response::Ack,
        RobotCommandIndicator::GetConfiguration => {
            let address = ctx
                .configuration_address
                .ok_or(ProtocolError::MissingConfigurationAddress)?;
            Response::Configuration {
                value: ConfigurationValue::decode(address, payload, ctx.num_joints)?,
            }
        }
        RobotCommandIndicator::GetLog => Response::Log {
            message: String::from_utf8(payload.to_vec()).map_err(|_| ProtocolError::InvalidLog)?,
        },
    };

    Ok((status, response))
}

/// Encode a healthy response datagram. Mostly useful for tests and for a
/// fake controller harness that needs to speak the wire protocol back.
pub fn encode_response(indicator: RobotCommandIndicator, status: ErrorState, response: &Response) -> Vec<u8> {
    let mut out = vec![indicator.into(), status.into()];
    match response {
        Response::Handshake {
            num_joints,
            firmware_version,
        } => {
            out.push(*num_joints);
            out.extend_from_slice(&firmware_version.to_le_bytes());
        }
        Response::JointOutputs { outputs } => {
            out.extend(crate::joint::encode_joint_outputs(outputs))
        }
        Response::Ack => {}
        Response::Configuration { value } => out.extend(value.encode()),
        Response::Log { message } => out.extend_from_slice(message.as_bytes()),
    }
    out
}
