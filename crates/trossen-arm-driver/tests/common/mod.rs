//! A minimal fake controller, standing in for the physical arm in
//! integration tests. Speaks just enough of the wire protocol to drive
//! [`trossen_arm_driver::Driver`] through `configure`/`cleanup` and the
//! motion/configuration API.
//!
//! `Driver::configure` always dials the fixed controller port
//! ([`trossen_arm_protocol::PORT`]), so every test that needs a live UDP
//! peer binds this fake controller there. Tests that do so must hold
//! [`port_lock`] for their whole body — the bind is process-wide, and
//! `cargo test` runs tests in the same binary concurrently by default.

#![allow(dead_code)]

use std::net::{Ipv4Addr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread::JoinHandle;
use std::time::Duration;

use trossen_arm_protocol::{
    decode_joint_inputs, encode_response, ConfigurationAddress, ConfigurationValue,
    EndEffectorProperties, ErrorState, IpMethod, IpV4, JointInput, JointOutput, Mode, Model,
    Response, RobotCommandIndicator, PORT,
};

/// Serializes every test that binds the fixed controller port.
pub fn port_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|e| e.into_inner())
}

/// Everything the fake controller remembers, mirroring
/// `trossen_arm_driver::ConfigurationMirror` from the other side of the wire.
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub num_joints: usize,
    pub error_state: ErrorState,
    pub modes: Vec<Mode>,
    pub effort_correction: Vec<f32>,
    pub end_effector: EndEffectorProperties,
    pub factory_reset_flag: bool,
    pub ip_method: IpMethod,
    pub manual_ip: IpV4,
    pub dns: IpV4,
    pub gateway: IpV4,
    pub subnet: IpV4,
    /// Set once a `SetJointInputs` tag disagrees with `modes[i]`.
    pub enforce_mode_match: bool,
}

impl ControllerState {
    pub fn new(num_joints: usize) -> Self {
        Self {
            num_joints,
            error_state: ErrorState::None,
            modes: vec![Mode::Idle; num_joints],
            effort_correction: vec![1.0; num_joints],
            end_effector: EndEffectorProperties::default(),
            factory_reset_flag: false,
            ip_method: IpMethod::default(),
            manual_ip: "192.168.1.2".parse().unwrap(),
            dns: "8.8.8.8".parse().unwrap(),
            gateway: "192.168.1.1".parse().unwrap(),
            subnet: "255.255.255.0".parse().unwrap(),
            enforce_mode_match: false,
        }
    }
}

fn apply(state: &mut ControllerState, value: ConfigurationValue) {
    match value {
        ConfigurationValue::FactoryResetFlag(b) => state.factory_reset_flag = b,
        ConfigurationValue::IpMethod(m) => state.ip_method = m,
        ConfigurationValue::ManualIp(ip) => state.manual_ip = ip,
        ConfigurationValue::Dns(ip) => state.dns = ip,
        ConfigurationValue::Gateway(ip) => state.gateway = ip,
        ConfigurationValue::Subnet(ip) => state.subnet = ip,
        ConfigurationValue::EffortCorrection(v) => state.effort_correction = v,
        ConfigurationValue::ErrorState(e) => state.error_state = e,
        ConfigurationValue::Modes(m) => state.modes = m,
        ConfigurationValue::EndEffector(ee) => state.end_effector = ee,
    }
}

fn snapshot(state: &ControllerState, address: ConfigurationAddress) -> ConfigurationValue {
    match address {
        ConfigurationAddress::FactoryResetFlag => ConfigurationValue::FactoryResetFlag(state.factory_reset_flag),
        ConfigurationAddress::IpMethod => ConfigurationValue::IpMethod(state.ip_method),
        ConfigurationAddress::ManualIp => ConfigurationValue::ManualIp(state.manual_ip),
        ConfigurationAddress::Dns => ConfigurationValue::Dns(state.dns),
        ConfigurationAddress::Gateway => ConfigurationValue::Gateway(state.gateway),
        ConfigurationAddress::Subnet => ConfigurationValue::Subnet(state.subnet),
        ConfigurationAddress::EffortCorrection => ConfigurationValue::EffortCorrection(state.effort_correction.clone()),
        ConfigurationAddress::ErrorState => ConfigurationValue::ErrorState(state.error_state),
        ConfigurationAddress::Modes => ConfigurationValue::Modes(state.modes.clone()),
        ConfigurationAddress::EndEffector => ConfigurationValue::EndEffector(state.end_effector),
    }
}

/// Turn a commanded joint input into a plausible measured output: the fake
/// controller has no real plant, so it just reports back whatever the
/// driver asked for.
fn joint_output_for(input: JointInput) -> JointOutput {
    match input {
        JointInput::Idle => JointOutput::default(),
        JointInput::Position {
            position,
            feedforward_velocity,
            ..
        } => JointOutput {
            position,
            velocity: feedforward_velocity,
            ..JointOutput::default()
        },
        JointInput::Velocity {
            velocity,
            feedforward_acceleration,
        } => JointOutput {
            velocity,
            effort: feedforward_acceleration,
            ..JointOutput::default()
        },
        JointInput::Effort { effort } => JointOutput {
            effort,
            ..JointOutput::default()
        },
    }
}

fn respond(request: &[u8], state: &Mutex<ControllerState>) -> Option<Vec<u8>> {
    if request.is_empty() {
        return None;
    }
    let indicator = RobotCommandIndicator::try_from(request[0]).ok()?;
    let payload = &request[1..];
    let mut guard = state.lock().unwrap();

    let response = match indicator {
        RobotCommandIndicator::Handshake => {
            let _model = Model::try_from(*payload.first()?).ok()?;
            Response::Handshake {
                num_joints: guard.num_joints as u8,
                firmware_version: 0x0001_0000,
            }
        }
        RobotCommandIndicator::SetJointInputs => {
            let inputs = decode_joint_inputs(payload, guard.num_joints).ok()?;
            if guard.enforce_mode_match
                && inputs.iter().zip(guard.modes.iter()).any(|(i, m)| i.mode() != *m)
            {
                guard.error_state = ErrorState::RobotInputModeMismatch;
            }
            let outputs = inputs.into_iter().map(joint_output_for).collect();
            Response::JointOutputs { outputs }
        }
        RobotCommandIndicator::GetJointOutputs => Response::JointOutputs {
            outputs: vec![JointOutput::default(); guard.num_joints],
        },
        RobotCommandIndicator::SetHome => Response::Ack,
        RobotCommandIndicator::SetConfiguration => {
            let address = ConfigurationAddress::try_from(*payload.first()?).ok()?;
            let value = ConfigurationValue::decode(address, &payload[1..], guard.num_joints).ok()?;
            apply(&mut *guard, value);
            Response::Ack
        }
        RobotCommandIndicator::GetConfiguration => {
            let address = ConfigurationAddress::try_from(*payload.first()?).ok()?;
            Response::Configuration {
                value: snapshot(&guard, address),
            }
        }
        RobotCommandIndicator::GetLog => Response::Log {
            message: format!("fake controller: error_state={:?}", guard.error_state),
        },
    };

    let status = guard.error_state;
    drop(guard);
    Some(encode_response(indicator, status, &response))
}

/// A background thread that binds the controller's fixed UDP port and
/// answers requests out of a shared [`ControllerState`].
pub struct FakeController {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    pub state: Arc<Mutex<ControllerState>>,
    /// While nonzero, `SetJointInputs` datagrams are silently dropped (no
    /// reply) and this counter is decremented — simulates lost packets for
    /// the retransmission-budget tests.
    pub drop_set_joint_inputs: Arc<AtomicU32>,
}

impl FakeController {
    pub fn spawn(num_joints: usize) -> Self {
        Self::spawn_with_state(Arc::new(Mutex::new(ControllerState::new(num_joints))))
    }

    pub fn spawn_with_state(state: Arc<Mutex<ControllerState>>) -> Self {
        let socket =
            UdpSocket::bind((Ipv4Addr::LOCALHOST, PORT)).expect("bind fake controller port");
        socket
            .set_read_timeout(Some(Duration::from_millis(50)))
            .expect("set fake controller read timeout");

        let stop = Arc::new(AtomicBool::new(false));
        let drop_set_joint_inputs = Arc::new(AtomicU32::new(0));

        let handle = {
            let stop = stop.clone();
            let state = state.clone();
            let drop_set_joint_inputs = drop_set_joint_inputs.clone();
            std::thread::spawn(move || {
                let mut buf = [0u8; 1024];
                while !stop.load(Ordering::Acquire) {
                    let (n, peer) = match socket.recv_from(&mut buf) {
                        Ok(ok) => ok,
                        Err(_) => continue,
                    };
                    let request = &buf[..n];
                    let is_set_joint_inputs = request.first().copied()
                        == Some(RobotCommandIndicator::SetJointInputs.into());
                    if is_set_joint_inputs && drop_set_joint_inputs.load(Ordering::Acquire) > 0 {
                        drop_set_joint_inputs.fetch_sub(1, Ordering::AcqRel);
                        continue;
                    }
                    if let Some(reply) = respond(request, &state) {
                        let _ = socket.send_to(&reply, peer);
                    }
                }
            })
        };

        Self {
            stop,
            handle: Some(handle),
            state,
            drop_set_joint_inputs,
        }
    }
}

impl Drop for FakeController {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
