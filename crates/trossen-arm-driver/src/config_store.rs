//! Local mirror of the controller's configuration fields.
//!
//! Setters are write-through: the wire call happens first, and only on
//! success does the mirror update (see [`ConfigurationMirror::apply`],
//! called by the driver after a successful `set_configuration` round trip).
//! Getters always re-read the controller before returning.

use std::net::Ipv4Addr;

use trossen_arm_protocol::{
    ConfigurationValue, EndEffectorProperties, ErrorState, IpMethod, IpV4, Mode,
    EFFORT_CORRECTION_RANGE, SCALING_FACTOR_RANGE,
};

use crate::error::UsageError;

#[derive(Debug, Clone)]
pub struct ConfigurationMirror {
    pub factory_reset_flag: bool,
    pub ip_method: IpMethod,
    pub manual_ip: IpV4,
    pub dns: IpV4,
    pub gateway: IpV4,
    pub subnet: IpV4,
    pub effort_correction: Vec<f32>,
    pub error_state: ErrorState,
    pub modes: Vec<Mode>,
    pub end_effector: EndEffectorProperties,
}

impl ConfigurationMirror {
    pub fn new(num_joints: usize) -> Self {
        Self {
            factory_reset_flag: false,
            ip_method: IpMethod::default(),
            manual_ip: IpV4(Ipv4Addr::new(192, 168, 1, 2)),
            dns: IpV4(Ipv4Addr::new(8, 8, 8, 8)),
            gateway: IpV4(Ipv4Addr::new(192, 168, 1, 1)),
            subnet: IpV4(Ipv4Addr::new(255, 255, 255, 0)),
            effort_correction: vec![1.0; num_joints],
            error_state: ErrorState::None,
            modes: vec![Mode::Idle; num_joints],
            end_effector: EndEffectorProperties::default(),
        }
    }

    /// Fold a decoded `get_configuration`/`set_configuration`-ack payload
    /// into the mirror. Called only after the wire transaction succeeds.
    pub fn apply(&mut self, value: ConfigurationValue) {
        match value {
            ConfigurationValue::FactoryResetFlag(b) => self.factory_reset_flag = b,
            ConfigurationValue::IpMethod(m) => self.ip_method = m,
            ConfigurationValue::ManualIp(ip) => self.manual_ip = ip,
            ConfigurationValue::Dns(ip) => self.dns = ip,
            ConfigurationValue::Gateway(ip) => self.gateway = ip,
            ConfigurationValue::Subnet(ip) => self.subnet = ip,
            ConfigurationValue::EffortCorrection(v) => self.effort_correction = v,
            ConfigurationValue::ErrorState(e) => self.error_state = e,
            ConfigurationValue::Modes(m) => self.modes = m,
            ConfigurationValue::EndEffector(ee) => self.end_effector = ee,
        }
    }
}

/// Validate a per-joint effort correction vector against
/// [`EFFORT_CORRECTION_RANGE`] before any wire traffic.
pub fn validate_effort_correction(values: &[f32]) -> Result<(), UsageError> {
    for &value in values {
        if !EFFORT_CORRECTION_RANGE.contains(&value) {
            return Err(UsageError::OutOfRange {
                field: "effort_correction",
                value,
                min: *EFFORT_CORRECTION_RANGE.start(),
                max: *EFFORT_CORRECTION_RANGE.end(),
            });
        }
    }
    Ok(())
}

/// Validate a gripper force limit / `t_max_factor` scaling factor against
/// [`SCALING_FACTOR_RANGE`] before any wire traffic.
pub fn validate_scaling_factor(value: f32) -> Result<(), UsageError> {
    if !SCALING_FACTOR_RANGE.contains(&value) {
        return Err(UsageError::OutOfRange {
            field: "gripper_force_limit_scaling_factor",
            value,
            min: *SCALING_FACTOR_RANGE.start(),
            max: *SCALING_FACTOR_RANGE.end(),
        });
    }
    Ok(())
}

pub fn parse_ipv4(s: &str) -> Result<IpV4, UsageError> {
    s.parse().map_err(|_| UsageError::InvalidIpAddress(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effort_correction_rejects_values_outside_range() {
        assert!(validate_effort_correction(&[0.5, 1.0, 2.0]).is_ok());
        assert!(validate_effort_correction(&[0.4]).is_err());
        assert!(validate_effort_correction(&[2.1]).is_err());
    }

    #[test]
    fn scaling_factor_rejects_values_outside_unit_range() {
        assert!(validate_scaling_factor(0.0).is_ok());
        assert!(validate_scaling_factor(1.0).is_ok());
        assert!(validate_scaling_factor(1.1).is_err());
        assert!(validate_scaling_factor(-0.1).is_err());
    }

    #[test]
    fn parse_ipv4_rejects_garbage() {
        assert!(parse_ipv4("192.168.1.2").is_ok());
        assert!(parse_ipv4("not-an-ip").is_err());
    }

    #[test]
    fn mirror_apply_updates_matching_field_only() {
        let mut mirror = ConfigurationMirror::new(7);
        mirror.apply(ConfigurationValue::FactoryResetFlag(true));
        assert!(mirror.factory_reset_flag);
        assert_eq!(mirror.error_state, ErrorState::None);
    }
}
