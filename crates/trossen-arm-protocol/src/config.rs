//! Configuration fields mirrored between the driver and the controller,
//! addressed by [`ConfigurationAddress`] and exchanged through
//! `set_configuration`/`get_configuration` frames.

use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::ProtocolError;
use crate::ids::{ConfigurationAddress, ErrorState, IpMethod, Mode};

/// Valid range for each element of `effort_correction`.
pub const EFFORT_CORRECTION_RANGE: std::ops::RangeInclusive<f32> = 0.5..=2.0;

/// Valid range for gripper force / `t_max_factor` scaling.
pub const SCALING_FACTOR_RANGE: std::ops::RangeInclusive<f32> = 0.0..=1.0;

/// Mass and inertial properties of a single rigid link.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkProperties {
    /// Mass in kg.
    pub mass: f32,
    /// Inertia tensor in kg·m^2, row-major 3x3.
    pub inertia: [f32; 9],
    /// Inertia frame translation measured in the link frame, in m.
    pub origin_xyz: [f32; 3],
    /// Inertia frame RPY angles measured in the link frame, in rad.
    pub origin_rpy: [f32; 3],
}

const LINK_WIRE_SIZE: usize = 4 * (1 + 9 + 3 + 3);

impl LinkProperties {
    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.mass.to_le_bytes());
        for v in self.inertia {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for v in self.origin_xyz {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for v in self.origin_rpy {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    fn decode_from(bytes: &[u8]) -> Self {
        let f = |i: usize| f32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap());
        Self {
            mass: f(0),
            inertia: std::array::from_fn(|i| f(1 + i)),
            origin_xyz: std::array::from_fn(|i| f(10 + i)),
            origin_rpy: std::array::from_fn(|i| f(13 + i)),
        }
    }
}

/// End-effector mass/inertia properties, pushed to the controller as opaque
/// configuration data at `configure` time.
///
/// This crate does not ship per-model constant tables of real inertias (that
/// is application-specific data); [`EndEffectorProperties::default`] is the
/// only built-in value, and is all zeros besides `t_max_factor`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EndEffectorProperties {
    pub palm: LinkProperties,
    pub finger_left: LinkProperties,
    pub finger_right: LinkProperties,
    /// Offset from the palm center to the left carriage center in m, home configuration.
    pub offset_finger_left: f32,
    /// Offset from the palm center to the right carriage center in m, home configuration.
    pub offset_finger_right: f32,
    /// Scaling factor for the max gripper force, in `[0.0, 1.0]`.
    pub t_max_factor: f32,
}

impl Default for EndEffectorProperties {
    fn default() -> Self {
        Self {
            palm: LinkProperties::default(),
            finger_left: LinkProperties::default(),
            finger_right: LinkProperties::default(),
            offset_finger_left: 0.0,
            offset_finger_right: 0.0,
            t_max_factor: 0.5,
        }
    }
}

const END_EFFECTOR_WIRE_SIZE: usize = LINK_WIRE_SIZE * 3 + 4 * 3;

impl EndEffectorProperties {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(END_EFFECTOR_WIRE_SIZE);
        self.palm.encode_into(&mut out);
        self.finger_left.encode_into(&mut out);
        self.finger_right.encode_into(&mut out);
        out.extend_from_slice(&self.offset_finger_left.to_le_bytes());
        out.extend_from_slice(&self.offset_finger_right.to_le_bytes());
        out.extend_from_slice(&self.t_max_factor.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < END_EFFECTOR_WIRE_SIZE {
            return Err(ProtocolError::FrameTooShort {
                indicator: ConfigurationAddress::EndEffector.into(),
                expected: END_EFFECTOR_WIRE_SIZE,
                actual: bytes.len(),
            });
        }
        let palm = LinkProperties::decode_from(&bytes[0..LINK_WIRE_SIZE]);
        let finger_left = LinkProperties::decode_from(&bytes[LINK_WIRE_SIZE..2 * LINK_WIRE_SIZE]);
        let finger_right =
            LinkProperties::decode_from(&bytes[2 * LINK_WIRE_SIZE..3 * LINK_WIRE_SIZE]);
        let tail = &bytes[3 * LINK_WIRE_SIZE..];
        Ok(Self {
            palm,
            finger_left,
            finger_right,
            offset_finger_left: f32::from_le_bytes(tail[0..4].try_into().unwrap()),
            offset_finger_right: f32::from_le_bytes(tail[4..8].try_into().unwrap()),
            t_max_factor: f32::from_le_bytes(tail[8..12].try_into().unwrap()),
        })
    }
}

/// An IPv4 dotted-quad, validated at construction rather than carried as a
/// bare `String` all the way to the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IpV4(pub Ipv4Addr);

impl FromStr for IpV4 {
    type Err = std::net::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(IpV4(s.parse()?))
    }
}

impl std::fmt::Display for IpV4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl IpV4 {
    fn encode(&self) -> [u8; 4] {
        self.0.octets()
    }

    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < 4 {
            return Err(ProtocolError::FrameTooShort {
                indicator: 0,
                expected: 4,
                actual: bytes.len(),
            });
        }
        Ok(IpV4(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3])))
    }
}

/// A decoded `set_configuration`/`get_configuration` payload, tagged by the
/// address it belongs to so the codec and the configuration store can match
/// on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigurationValue {
    FactoryResetFlag(bool),
    IpMethod(IpMethod),
    ManualIp(IpV4),
    Dns(IpV4),
    Gateway(IpV4),
    Subnet(IpV4),
    EffortCorrection(Vec<f32>),
    ErrorState(ErrorState),
    Modes(Vec<Mode>),
    EndEffector(EndEffectorProperties),
}

impl ConfigurationValue {
    pub fn address(&self) -> ConfigurationAddress {
        match self {
            ConfigurationValue::FactoryResetFlag(_) => ConfigurationAddress::FactoryResetFlag,
            ConfigurationValue::IpMethod(_) => ConfigurationAddress::IpMethod,
            ConfigurationValue::ManualIp(_) => ConfigurationAddress::ManualIp,
            ConfigurationValue::Dns(_) => ConfigurationAddress::Dns,
            ConfigurationValue::Gateway(_) => ConfigurationAddress::Gateway,
            ConfigurationValue::Subnet(_) => ConfigurationAddress::Subnet,
            ConfigurationValue::EffortCorrection(_) => ConfigurationAddress::EffortCorrection,
            ConfigurationValue::ErrorState(_) => ConfigurationAddress::ErrorState,
            ConfigurationValue::Modes(_) => ConfigurationAddress::Modes,
            ConfigurationValue::EndEffector(_) => ConfigurationAddress::EndEffector,
        }
    }

    /// Encode just the payload (the address byte is written by the frame
    /// layer, not here).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ConfigurationValue::FactoryResetFlag(b) => vec![*b as u8],
            ConfigurationValue::IpMethod(m) => vec![(*m).into()],
            ConfigurationValue::ManualIp(ip)
            | ConfigurationValue::Dns(ip)
            | ConfigurationValue::Gateway(ip)
            | ConfigurationValue::Subnet(ip) => ip.encode().to_vec(),
            ConfigurationValue::EffortCorrection(v) => {
                v.iter().flat_map(|f| f.to_le_bytes()).collect()
            }
            ConfigurationValue::ErrorState(e) => vec![(*e).into()],
            ConfigurationValue::Modes(modes) => modes.iter().map(|m| (*m).into()).collect(),
            ConfigurationValue::EndEffector(ee) => ee.encode(),
        }
    }

    /// Decode a payload known to belong to `address`; `num_joints` is needed
    /// to size the per-joint vector addresses (`EffortCorrection`, `Modes`).
    pub fn decode(
        address: ConfigurationAddress,
        bytes: &[u8],
        num_joints: usize,
    ) -> Result<Self, ProtocolError> {
        let need = |expected: usize| -> Result<(), ProtocolError> {
            if bytes.len() < expected {
                Err(ProtocolError::FrameTooShort {
                    indicator: address.into(),
                    expected,
                    actual: bytes.len(),
                })
            } else {
                Ok(())
            }
        };
        Ok(match address {
            ConfigurationAddress::FactoryResetFlag => {
                need(1)?;
                ConfigurationValue::FactoryResetFlag(bytes[0] != 0)
            }
            ConfigurationAddress::IpMethod => {
                need(1)?;
                let method = IpMethod::try_from(bytes[0])
                    .map_err(|_| ProtocolError::UnknownMode(bytes[0]))?;
                ConfigurationValue::IpMethod(method)
            }
            ConfigurationAddress::ManualIp => ConfigurationValue::ManualIp(IpV4::decode(bytes)?),
            ConfigurationAddress::Dns => ConfigurationValue::Dns(IpV4::decode(bytes)?),
            ConfigurationAddress::Gateway => ConfigurationValue::Gateway(IpV4::decode(bytes)?),
            ConfigurationAddress::Subnet => ConfigurationValue::Subnet(IpV4::decode(bytes)?),
            ConfigurationAddress::EffortCorrection => {
                need(num_joints * 4)?;
                let values = (0..num_joints)
                    .map(|i| f32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap()))
                    .collect();
                ConfigurationValue::EffortCorrection(values)
            }
            ConfigurationAddress::ErrorState => {
                need(1)?;
                let state = ErrorState::try_from(bytes[0])
                    .map_err(|_| ProtocolError::UnknownStatus(bytes[0]))?;
                ConfigurationValue::ErrorState(state)
            }
            ConfigurationAddress::Modes => {
                need(num_joints)?;
                let modes = bytes[..num_joints]
                    .iter()
                    .map(|&b| Mode::try_from(b).map_err(|_| ProtocolError::UnknownMode(b)))
                    .collect::<Result<Vec<_>, _>>()?;
                ConfigurationValue::Modes(modes)
            }
            ConfigurationAddress::EndEffector => {
                ConfigurationValue::EndEffector(EndEffectorProperties::decode(bytes)?)
            }
        })
    }
}
