//! The public driver API: lifecycle, motion setpoints, modes, and the
//! configuration mirror's getters/setters.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use trossen_arm_transport::Session;

use trossen_arm_protocol::{
    ConfigurationAddress, ConfigurationValue, EndEffectorProperties, ErrorState, IpMethod, IpV4,
    JointOutput, Mode, Model, Request, Response, ResponseContext, PORT,
};

use crate::config_store::{parse_ipv4, validate_effort_correction, validate_scaling_factor, ConfigurationMirror};
use crate::daemon::{self, DriverData, Shared};
use crate::error::{DriverError, LatchedError, UsageError};
use crate::options::{DriverOptions, MotionOptions};
use crate::rpc;
use crate::state::DriverState;
use crate::trajectory::TrajectoryEngine;

/// A handle to one configured (or not-yet-configured) arm session.
///
/// `configure`/`cleanup` take `&mut self` because they own the transition
/// between having a daemon thread and not having one. Every other method
/// takes `&self`: the real exclusion is the two-mutex discipline in
/// [`daemon::Shared`], not Rust's borrow checker, so a `Driver` can freely
/// be shared behind an `Arc` if an application wants to call it from one
/// thread while reading diagnostics from another (though SPEC_FULL.md §5
/// still forbids two *concurrent* main-thread API calls).
pub struct Driver {
    state: DriverState,
    model: Model,
    options: DriverOptions,
    shared: Option<Arc<Shared>>,
    daemon_handle: Option<JoinHandle<()>>,
}

impl Driver {
    pub fn new(options: DriverOptions) -> Self {
        Self {
            state: DriverState::Unconfigured,
            model: Model::WxaiV0,
            options,
            shared: None,
            daemon_handle: None,
        }
    }

    /// Bind the UDP session, handshake, reconcile the error state, push the
    /// end-effector configuration, sample the rest of the mirror, and spawn
    /// the daemon. See `SPEC_FULL.md` §4.6.
    pub fn configure(
        &mut self,
        model: Model,
        end_effector: EndEffectorProperties,
        server_ip: Ipv4Addr,
        clear_error: bool,
    ) -> Result<(), DriverError> {
        if self.state != DriverState::Unconfigured {
            return Err(UsageError::AlreadyConfigured.into());
        }
        self.state = DriverState::Configuring;

        let session = Session::connect(server_ip, PORT)?;
        let num_joints = model.num_joints() as usize;

        let handshake_ctx = ResponseContext::new(num_joints);
        let (_status, response) = rpc::call(
            &session,
            &Request::Handshake { model },
            &handshake_ctx,
            &self.options,
        )?;
        if let Response::Handshake { num_joints: reported, .. } = response {
            if reported as usize != num_joints {
                self.state = DriverState::Unconfigured;
                return Err(LatchedError::protocol(format!(
                    "handshake reported {reported} joints, expected {num_joints}"
                ))
                .into());
            }
        }

        let mut mirror = ConfigurationMirror::new(num_joints);
        let error_ctx =
            ResponseContext::for_configuration(num_joints, ConfigurationAddress::ErrorState);
        let (_status, response) = rpc::call(
            &session,
            &Request::GetConfiguration {
                address: ConfigurationAddress::ErrorState,
            },
            &error_ctx,
            &self.options,
        )?;
        if let Response::Configuration { value } = response {
            mirror.apply(value);
        }

        if mirror.error_state.is_fatal() {
            if clear_error {
                let (_status, _response) = rpc::call(
                    &session,
                    &Request::SetConfiguration {
                        value: ConfigurationValue::ErrorState(ErrorState::None),
                    },
                    &ResponseContext::new(num_joints),
                    &self.options,
                )?;
                mirror.error_state = ErrorState::None;
            } else {
                let (_status, log_response) = rpc::call(
                    &session,
                    &Request::GetLog,
                    &ResponseContext::new(num_joints),
                    &self.options,
                )?;
                let message = match log_response {
                    Response::Log { message } => message,
                    _ => String::new(),
                };
                self.state = DriverState::Unconfigured;
                return Err(LatchedError::controller(mirror.error_state, message).into());
            }
        }

        rpc::call(
            &session,
            &Request::SetConfiguration {
                value: ConfigurationValue::EndEffector(end_effector),
            },
            &ResponseContext::new(num_joints),
            &self.options,
        )?;
        mirror.end_effector = end_effector;

        for address in [ConfigurationAddress::Modes, ConfigurationAddress::EffortCorrection] {
            let ctx = ResponseContext::for_configuration(num_joints, address);
            let (_status, response) = rpc::call(
                &session,
                &Request::GetConfiguration { address },
                &ctx,
                &self.options,
            )?;
            if let Response::Configuration { value } = response {
                mirror.apply(value);
            }
        }

        let now = Instant::now();
        let data = DriverData {
            session,
            num_joints,
            config: mirror,
            trajectory: TrajectoryEngine::new(now, num_joints),
            joint_outputs: vec![JointOutput::default(); num_joints],
            options: self.options,
        };
        let shared = Arc::new(Shared::new(data));
        let handle = daemon::spawn(shared.clone());

        self.model = model;
        self.shared = Some(shared);
        self.daemon_handle = Some(handle);
        self.state = DriverState::Running;
        tracing::debug!(?model, num_joints, "driver configured");
        Ok(())
    }

    /// Signal the daemon to stop, join it, and close the socket. Idempotent:
    /// calling `cleanup` on an already-cleaned driver is a no-op.
    pub fn cleanup(&mut self) -> Result<(), DriverError> {
        if self.state == DriverState::Cleaned || self.state == DriverState::Unconfigured {
            self.state = DriverState::Cleaned;
            return Ok(());
        }
        self.state = DriverState::Cleaning;
        if let Some(shared) = &self.shared {
            shared.deactivate();
        }
        if let Some(handle) = self.daemon_handle.take() {
            let _ = handle.join();
        }
        if let Some(shared) = self.shared.take() {
            match Arc::try_unwrap(shared) {
                Ok(shared) => shared.into_data().session.close(),
                Err(shared) => {
                    tracing::warn!("daemon still held a reference to shared state at cleanup");
                    shared.deactivate();
                }
            }
        }
        self.state = DriverState::Cleaned;
        tracing::debug!("driver cleaned up");
        Ok(())
    }

    pub fn get_num_joints(&self) -> usize {
        self.model.num_joints() as usize
    }

    pub fn get_error_information(&self) -> Option<LatchedError> {
        self.shared.as_ref().and_then(|shared| shared.latched())
    }

    fn shared(&self) -> Result<&Arc<Shared>, DriverError> {
        match self.state {
            DriverState::Running => {}
            DriverState::Unconfigured | DriverState::Configuring => {
                return Err(UsageError::NotConfigured.into())
            }
            DriverState::Cleaning | DriverState::Cleaned => {
                return Err(UsageError::AlreadyCleaned.into())
            }
        }
        let shared = self
            .shared
            .as_ref()
            .expect("DriverState::Running implies shared state exists");
        if let Some(latched) = shared.latched() {
            return Err(latched.into());
        }
        Ok(shared)
    }

    fn with_data<R>(&self, f: impl FnOnce(&mut DriverData) -> Result<R, DriverError>) -> Result<R, DriverError> {
        let shared = self.shared()?;
        match shared.with_transaction(f) {
            Ok(value) => Ok(value),
            Err(DriverError::Usage(u)) => Err(DriverError::Usage(u)),
            Err(other) => {
                let latched = daemon::to_latched(other);
                shared.latch(latched.clone());
                Err(latched.into())
            }
        }
    }

    fn arm_indices(&self) -> Vec<usize> {
        (0..self.get_num_joints() - 1).collect()
    }

    fn gripper_index(&self) -> usize {
        self.get_num_joints() - 1
    }

    fn set_positions(
        &self,
        indices: &[usize],
        goals: &[f32],
        options: MotionOptions,
        feedforward_velocities: Option<&[f32]>,
        feedforward_accelerations: Option<&[f32]>,
    ) -> Result<(), DriverError> {
        if goals.len() != indices.len() {
            return Err(UsageError::WrongLength {
                expected: indices.len(),
                actual: goals.len(),
            }
            .into());
        }
        let zero = vec![0.0f32; indices.len()];
        let ff_vel = feedforward_velocities.unwrap_or(&zero);
        let ff_acc = feedforward_accelerations.unwrap_or(&zero);
        if ff_vel.len() != indices.len() || ff_acc.len() != indices.len() {
            return Err(UsageError::WrongLength {
                expected: indices.len(),
                actual: ff_vel.len().max(ff_acc.len()),
            }
            .into());
        }

        self.with_data(|data| {
            let now = Instant::now();
            for (k, &index) in indices.iter().enumerate() {
                let measured = data.joint_outputs[index];
                data.trajectory.set_position_goal(
                    now,
                    index,
                    measured,
                    goals[k],
                    options.goal_time,
                    ff_vel[k],
                    ff_acc[k],
                );
            }
            Ok(())
        })?;

        if options.blocking {
            self.blocking_wait(indices)?;
        }
        Ok(())
    }

    fn set_velocities(
        &self,
        indices: &[usize],
        goals: &[f32],
        options: MotionOptions,
        feedforward_accelerations: Option<&[f32]>,
    ) -> Result<(), DriverError> {
        if goals.len() != indices.len() {
            return Err(UsageError::WrongLength {
                expected: indices.len(),
                actual: goals.len(),
            }
            .into());
        }
        let zero = vec![0.0f32; indices.len()];
        let ff_acc = feedforward_accelerations.unwrap_or(&zero);
        if ff_acc.len() != indices.len() {
            return Err(UsageError::WrongLength {
                expected: indices.len(),
                actual: ff_acc.len(),
            }
            .into());
        }

        self.with_data(|data| {
            let now = Instant::now();
            for (k, &index) in indices.iter().enumerate() {
                let measured = data.joint_outputs[index];
                data.trajectory
                    .set_velocity_goal(now, index, measured, goals[k], options.goal_time, ff_acc[k]);
            }
            Ok(())
        })?;

        if options.blocking {
            self.blocking_wait(indices)?;
        }
        Ok(())
    }

    fn set_efforts(
        &self,
        indices: &[usize],
        goals: &[f32],
        options: MotionOptions,
    ) -> Result<(), DriverError> {
        if goals.len() != indices.len() {
            return Err(UsageError::WrongLength {
                expected: indices.len(),
                actual: goals.len(),
            }
            .into());
        }

        self.with_data(|data| {
            let now = Instant::now();
            for (k, &index) in indices.iter().enumerate() {
                let measured = data.joint_outputs[index];
                data.trajectory
                    .set_effort_goal(now, index, measured, goals[k], options.goal_time);
            }
            Ok(())
        })?;

        if options.blocking {
            self.blocking_wait(indices)?;
        }
        Ok(())
    }

    fn blocking_wait(&self, indices: &[usize]) -> Result<(), DriverError> {
        loop {
            let shared = self.shared()?;
            let (finished, until) =
                shared.with_transaction(|data| {
                    let now = Instant::now();
                    (data.trajectory.is_finished(indices, now), data.trajectory.finish_time(indices))
                });
            if finished {
                return Ok(());
            }
            if let Some(latched) = shared.latched() {
                return Err(latched.into());
            }
            let now = Instant::now();
            let remaining = until.saturating_duration_since(now);
            std::thread::sleep(remaining.min(std::time::Duration::from_millis(5)));
        }
    }

    // -- motion: positions -------------------------------------------------

    pub fn set_all_positions(
        &self,
        goals: &[f32],
        options: MotionOptions,
        feedforward_velocities: Option<&[f32]>,
        feedforward_accelerations: Option<&[f32]>,
    ) -> Result<(), DriverError> {
        let indices: Vec<usize> = (0..self.get_num_joints()).collect();
        self.set_positions(&indices, goals, options, feedforward_velocities, feedforward_accelerations)
    }

    pub fn set_arm_positions(
        &self,
        goals: &[f32],
        options: MotionOptions,
        feedforward_velocities: Option<&[f32]>,
        feedforward_accelerations: Option<&[f32]>,
    ) -> Result<(), DriverError> {
        let indices = self.arm_indices();
        self.set_positions(&indices, goals, options, feedforward_velocities, feedforward_accelerations)
    }

    pub fn set_gripper_position(
        &self,
        goal: f32,
        options: MotionOptions,
        feedforward_velocity: Option<f32>,
        feedforward_acceleration: Option<f32>,
    ) -> Result<(), DriverError> {
        let index = self.gripper_index();
        let ff_vel = feedforward_velocity.map(|v| [v]);
        let ff_acc = feedforward_acceleration.map(|v| [v]);
        self.set_positions(
            &[index],
            &[goal],
            options,
            ff_vel.as_ref().map(|a| a.as_slice()),
            ff_acc.as_ref().map(|a| a.as_slice()),
        )
    }

    pub fn set_joint_position(
        &self,
        index: usize,
        goal: f32,
        options: MotionOptions,
        feedforward_velocity: Option<f32>,
        feedforward_acceleration: Option<f32>,
    ) -> Result<(), DriverError> {
        if index >= self.get_num_joints() {
            return Err(UsageError::IndexOutOfRange {
                index,
                num_joints: self.get_num_joints(),
            }
            .into());
        }
        let ff_vel = feedforward_velocity.map(|v| [v]);
        let ff_acc = feedforward_acceleration.map(|v| [v]);
        self.set_positions(
            &[index],
            &[goal],
            options,
            ff_vel.as_ref().map(|a| a.as_slice()),
            ff_acc.as_ref().map(|a| a.as_slice()),
        )
    }

    // -- motion: velocities --------------------------------------------------

    pub fn set_all_velocities(
        &self,
        goals: &[f32],
        options: MotionOptions,
        feedforward_accelerations: Option<&[f32]>,
    ) -> Result<(), DriverError> {
        let indices: Vec<usize> = (0..self.get_num_joints()).collect();
        self.set_velocities(&indices, goals, options, feedforward_accelerations)
    }

    pub fn set_arm_velocities(
        &self,
        goals: &[f32],
        options: MotionOptions,
        feedforward_accelerations: Option<&[f32]>,
    ) -> Result<(), DriverError> {
        let indices = self.arm_indices();
        self.set_velocities(&indices, goals, options, feedforward_accelerations)
    }

    pub fn set_gripper_velocity(
        &self,
        goal: f32,
        options: MotionOptions,
        feedforward_acceleration: Option<f32>,
    ) -> Result<(), DriverError> {
        let index = self.gripper_index();
        let ff_acc = feedforward_acceleration.map(|v| [v]);
        self.set_velocities(&[index], &[goal], options, ff_acc.as_ref().map(|a| a.as_slice()))
    }

    pub fn set_joint_velocity(
        &self,
        index: usize,
        goal: f32,
        options: MotionOptions,
        feedforward_acceleration: Option<f32>,
    ) -> Result<(), DriverError> {
        if index >= self.get_num_joints() {
            return Err(UsageError::IndexOutOfRange {
                index,
                num_joints: self.get_num_joints(),
            }
            .into());
        }
        let ff_acc = feedforward_acceleration.map(|v| [v]);
        self.set_velocities(&[index], &[goal], options, ff_acc.as_ref().map(|a| a.as_slice()))
    }

    // -- motion: efforts ------------------------------------------------------

    pub fn set_all_efforts(&self, goals: &[f32], options: MotionOptions) -> Result<(), DriverError> {
        let indices: Vec<usize> = (0..self.get_num_joints()).collect();
        self.set_efforts(&indices, goals, options)
    }

    pub fn set_arm_efforts(&self, goals: &[f32], options: MotionOptions) -> Result<(), DriverError> {
        let indices = self.arm_indices();
        self.set_efforts(&indices, goals, options)
    }

    pub fn set_gripper_effort(&self, goal: f32, options: MotionOptions) -> Result<(), DriverError> {
        let index = self.gripper_index();
        self.set_efforts(&[index], &[goal], options)
    }

    pub fn set_joint_effort(&self, index: usize, goal: f32, options: MotionOptions) -> Result<(), DriverError> {
        if index >= self.get_num_joints() {
            return Err(UsageError::IndexOutOfRange {
                index,
                num_joints: self.get_num_joints(),
            }
            .into());
        }
        self.set_efforts(&[index], &[goal], options)
    }

    // -- modes ------------------------------------------------------------

    pub fn set_joint_mode(&self, index: usize, mode: Mode) -> Result<(), DriverError> {
        let num_joints = self.get_num_joints();
        if index >= num_joints {
            return Err(UsageError::IndexOutOfRange { index, num_joints }.into());
        }
        let modes = self.with_data(|data| Ok(data.config.modes.clone()))?;
        let mut modes = modes;
        modes[index] = mode;
        self.set_configuration(ConfigurationValue::Modes(modes))?;
        self.with_data(|data| {
            data.trajectory.set_idle(Instant::now(), index);
            Ok(())
        })
    }

    pub fn set_all_modes(&self, modes: &[Mode]) -> Result<(), DriverError> {
        let num_joints = self.get_num_joints();
        if modes.len() != num_joints {
            return Err(UsageError::WrongLength {
                expected: num_joints,
                actual: modes.len(),
            }
            .into());
        }
        self.set_configuration(ConfigurationValue::Modes(modes.to_vec()))?;
        self.with_data(|data| {
            let now = Instant::now();
            for i in 0..data.num_joints {
                data.trajectory.set_idle(now, i);
            }
            Ok(())
        })
    }

    pub fn set_arm_modes(&self, modes: &[Mode]) -> Result<(), DriverError> {
        let arm_len = self.get_num_joints() - 1;
        if modes.len() != arm_len {
            return Err(UsageError::WrongLength {
                expected: arm_len,
                actual: modes.len(),
            }
            .into());
        }
        let mut full = self.with_data(|data| Ok(data.config.modes.clone()))?;
        full[..arm_len].copy_from_slice(modes);
        self.set_configuration(ConfigurationValue::Modes(full))?;
        self.with_data(|data| {
            let now = Instant::now();
            for i in 0..arm_len {
                data.trajectory.set_idle(now, i);
            }
            Ok(())
        })
    }

    pub fn set_gripper_mode(&self, mode: Mode) -> Result<(), DriverError> {
        self.set_joint_mode(self.gripper_index(), mode)
    }

    pub fn get_modes(&self) -> Result<Vec<Mode>, DriverError> {
        match self.get_configuration(ConfigurationAddress::Modes)? {
            ConfigurationValue::Modes(modes) => Ok(modes),
            _ => unreachable!("get_configuration(Modes) always decodes to Modes"),
        }
    }

    pub fn get_arm_modes(&self) -> Result<Vec<Mode>, DriverError> {
        let mut all = self.get_modes()?;
        all.pop();
        Ok(all)
    }

    pub fn get_joint_mode(&self, index: usize) -> Result<Mode, DriverError> {
        let num_joints = self.get_num_joints();
        if index >= num_joints {
            return Err(UsageError::IndexOutOfRange { index, num_joints }.into());
        }
        Ok(self.get_modes()?[index])
    }

    pub fn get_gripper_mode(&self) -> Result<Mode, DriverError> {
        Ok(*self.get_modes()?.last().expect("at least one joint"))
    }

    // -- configuration: end effector / effort correction / scaling -----------

    pub fn set_end_effector(&self, end_effector: EndEffectorProperties) -> Result<(), DriverError> {
        self.set_configuration(ConfigurationValue::EndEffector(end_effector))
    }

    pub fn get_end_effector(&self) -> Result<EndEffectorProperties, DriverError> {
        match self.get_configuration(ConfigurationAddress::EndEffector)? {
            ConfigurationValue::EndEffector(ee) => Ok(ee),
            _ => unreachable!("get_configuration(EndEffector) always decodes to EndEffector"),
        }
    }

    pub fn set_effort_correction(&self, values: &[f32]) -> Result<(), DriverError> {
        let num_joints = self.get_num_joints();
        if values.len() != num_joints {
            return Err(UsageError::WrongLength {
                expected: num_joints,
                actual: values.len(),
            }
            .into());
        }
        validate_effort_correction(values)?;
        self.set_configuration(ConfigurationValue::EffortCorrection(values.to_vec()))
    }

    pub fn get_effort_correction(&self) -> Result<Vec<f32>, DriverError> {
        match self.get_configuration(ConfigurationAddress::EffortCorrection)? {
            ConfigurationValue::EffortCorrection(values) => Ok(values),
            _ => unreachable!("get_configuration(EffortCorrection) always decodes to EffortCorrection"),
        }
    }

    pub fn set_gripper_force_limit_scaling_factor(&self, value: f32) -> Result<(), DriverError> {
        validate_scaling_factor(value)?;
        let mut end_effector = self.get_end_effector()?;
        end_effector.t_max_factor = value;
        self.set_end_effector(end_effector)
    }

    pub fn get_gripper_force_limit_scaling_factor(&self) -> Result<f32, DriverError> {
        Ok(self.get_end_effector()?.t_max_factor)
    }

    // -- configuration: networking & reset flag -------------------------------

    pub fn set_factory_reset_flag(&self, flag: bool) -> Result<(), DriverError> {
        self.set_configuration(ConfigurationValue::FactoryResetFlag(flag))
    }

    pub fn get_factory_reset_flag(&self) -> Result<bool, DriverError> {
        match self.get_configuration(ConfigurationAddress::FactoryResetFlag)? {
            ConfigurationValue::FactoryResetFlag(flag) => Ok(flag),
            _ => unreachable!("get_configuration(FactoryResetFlag) always decodes to FactoryResetFlag"),
        }
    }

    pub fn set_ip_method(&self, method: IpMethod) -> Result<(), DriverError> {
        self.set_configuration(ConfigurationValue::IpMethod(method))
    }

    pub fn get_ip_method(&self) -> Result<IpMethod, DriverError> {
        match self.get_configuration(ConfigurationAddress::IpMethod)? {
            ConfigurationValue::IpMethod(method) => Ok(method),
            _ => unreachable!("get_configuration(IpMethod) always decodes to IpMethod"),
        }
    }

    pub fn set_manual_ip(&self, ip: &str) -> Result<(), DriverError> {
        self.set_configuration(ConfigurationValue::ManualIp(parse_ipv4(ip)?))
    }

    pub fn get_manual_ip(&self) -> Result<IpV4, DriverError> {
        match self.get_configuration(ConfigurationAddress::ManualIp)? {
            ConfigurationValue::ManualIp(ip) => Ok(ip),
            _ => unreachable!("get_configuration(ManualIp) always decodes to ManualIp"),
        }
    }

    pub fn set_dns(&self, ip: &str) -> Result<(), DriverError> {
        self.set_configuration(ConfigurationValue::Dns(parse_ipv4(ip)?))
    }

    pub fn get_dns(&self) -> Result<IpV4, DriverError> {
        match self.get_configuration(ConfigurationAddress::Dns)? {
            ConfigurationValue::Dns(ip) => Ok(ip),
            _ => unreachable!("get_configuration(Dns) always decodes to Dns"),
        }
    }

    pub fn set_gateway(&self, ip: &str) -> Result<(), DriverError> {
        self.set_configuration(ConfigurationValue::Gateway(parse_ipv4(ip)?))
    }

    pub fn get_gateway(&self) -> Result<IpV4, DriverError> {
        match self.get_configuration(ConfigurationAddress::Gateway)? {
            ConfigurationValue::Gateway(ip) => Ok(ip),
            _ => unreachable!("get_configuration(Gateway) always decodes to Gateway"),
        }
    }

    pub fn set_subnet(&self, ip: &str) -> Result<(), DriverError> {
        self.set_configuration(ConfigurationValue::Subnet(parse_ipv4(ip)?))
    }

    pub fn get_subnet(&self) -> Result<IpV4, DriverError> {
        match self.get_configuration(ConfigurationAddress::Subnet)? {
            ConfigurationValue::Subnet(ip) => Ok(ip),
            _ => unreachable!("get_configuration(Subnet) always decodes to Subnet"),
        }
    }

    pub fn reset_error_state(&self) -> Result<(), DriverError> {
        self.set_configuration(ConfigurationValue::ErrorState(ErrorState::None))?;
        match self.get_configuration(ConfigurationAddress::ErrorState)? {
            ConfigurationValue::ErrorState(ErrorState::None) => Ok(()),
            ConfigurationValue::ErrorState(state) => {
                Err(LatchedError::controller(state, "error state did not clear").into())
            }
            _ => unreachable!("get_configuration(ErrorState) always decodes to ErrorState"),
        }
    }

    pub fn set_home(&self) -> Result<(), DriverError> {
        self.with_data(|data| {
            let ctx = ResponseContext::new(data.num_joints);
            let (status, _response) = rpc::call(&data.session, &Request::SetHome, &ctx, &data.options)?;
            if status.is_fatal() {
                return Err(LatchedError::controller(status, "set_home rejected by controller").into());
            }
            Ok(())
        })
    }

    fn set_configuration(&self, value: ConfigurationValue) -> Result<(), DriverError> {
        let address = value.address();
        self.with_data(|data| {
            let ctx = ResponseContext::for_configuration(data.num_joints, address);
            let (status, _response) =
                rpc::call(&data.session, &Request::SetConfiguration { value: value.clone() }, &ctx, &data.options)?;
            if status.is_fatal() {
                return Err(LatchedError::controller(status, format!("set_configuration({address:?}) rejected")).into());
            }
            data.config.apply(value);
            Ok(())
        })
    }

    fn get_configuration(&self, address: ConfigurationAddress) -> Result<ConfigurationValue, DriverError> {
        self.with_data(|data| {
            let ctx = ResponseContext::for_configuration(data.num_joints, address);
            let (status, response) =
                rpc::call(&data.session, &Request::GetConfiguration { address }, &ctx, &data.options)?;
            if status.is_fatal() {
                return Err(LatchedError::controller(status, format!("get_configuration({address:?}) rejected")).into());
            }
            match response {
                Response::Configuration { value } => {
                    data.config.apply(value.clone());
                    Ok(value)
                }
                _ => unreachable!("decode_response(GetConfiguration) always yields Response::Configuration"),
            }
        })
    }

    // -- joint state getters (read the daemon-maintained mirror, no RPC) ------

    fn joint_field(&self, f: impl Fn(&JointOutput) -> f32) -> Result<Vec<f32>, DriverError> {
        self.with_data(|data| Ok(data.joint_outputs.iter().map(|o| f(o)).collect()))
    }

    fn joint_field_at(&self, index: usize, f: impl Fn(&JointOutput) -> f32) -> Result<f32, DriverError> {
        let num_joints = self.get_num_joints();
        if index >= num_joints {
            return Err(UsageError::IndexOutOfRange { index, num_joints }.into());
        }
        self.with_data(|data| Ok(f(&data.joint_outputs[index])))
    }

    pub fn get_positions(&self) -> Result<Vec<f32>, DriverError> {
        self.joint_field(|o| o.position)
    }

    pub fn get_arm_positions(&self) -> Result<Vec<f32>, DriverError> {
        let mut all = self.get_positions()?;
        all.pop();
        Ok(all)
    }

    pub fn get_gripper_position(&self) -> Result<f32, DriverError> {
        Ok(*self.get_positions()?.last().expect("at least one joint"))
    }

    pub fn get_joint_position(&self, index: usize) -> Result<f32, DriverError> {
        self.joint_field_at(index, |o| o.position)
    }

    pub fn get_velocities(&self) -> Result<Vec<f32>, DriverError> {
        self.joint_field(|o| o.velocity)
    }

    pub fn get_arm_velocities(&self) -> Result<Vec<f32>, DriverError> {
        let mut all = self.get_velocities()?;
        all.pop();
        Ok(all)
    }

    pub fn get_gripper_velocity(&self) -> Result<f32, DriverError> {
        Ok(*self.get_velocities()?.last().expect("at least one joint"))
    }

    pub fn get_joint_velocity(&self, index: usize) -> Result<f32, DriverError> {
        self.joint_field_at(index, |o| o.velocity)
    }

    pub fn get_efforts(&self) -> Result<Vec<f32>, DriverError> {
        self.joint_field(|o| o.effort)
    }

    pub fn get_arm_efforts(&self) -> Result<Vec<f32>, DriverError> {
        let mut all = self.get_efforts()?;
        all.pop();
        Ok(all)
    }

    pub fn get_gripper_effort(&self) -> Result<f32, DriverError> {
        Ok(*self.get_efforts()?.last().expect("at least one joint"))
    }

    pub fn get_joint_effort(&self, index: usize) -> Result<f32, DriverError> {
        self.joint_field_at(index, |o| o.effort)
    }

    pub fn get_external_efforts(&self) -> Result<Vec<f32>, DriverError> {
        self.joint_field(|o| o.external_effort)
    }

    pub fn get_arm_external_efforts(&self) -> Result<Vec<f32>, DriverError> {
        let mut all = self.get_external_efforts()?;
        all.pop();
        Ok(all)
    }

    pub fn get_gripper_external_effort(&self) -> Result<f32, DriverError> {
        Ok(*self.get_external_efforts()?.last().expect("at least one joint"))
    }

    pub fn get_joint_external_effort(&self, index: usize) -> Result<f32, DriverError> {
        self.joint_field_at(index, |o| o.external_effort)
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
