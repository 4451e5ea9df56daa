//! Per-joint trajectory state: one [`QuinticHermiteInterpolator`] plus a
//! start time, re-seeded from measured state on every new user call rather
//! than from the previous goal (see `SPEC_FULL.md` §4.5 — re-seeding from
//! the last commanded goal risks a discontinuity the controller would
//! reject).

use std::time::{Duration, Instant};

use trossen_arm_protocol::{JointInput, JointOutput, Mode, QuinticHermiteInterpolator};

/// One joint's in-flight (or completed/idle) motion.
#[derive(Debug, Clone)]
pub struct Trajectory {
    interpolator: QuinticHermiteInterpolator,
    start_time: Instant,
    goal_time: f32,
    mode: Mode,
}

impl Trajectory {
    /// A trajectory that holds constant at `value` forever — the resting
    /// state for a joint that has never received a setpoint.
    pub fn holding(now: Instant, mode: Mode, value: f32) -> Self {
        Self {
            interpolator: QuinticHermiteInterpolator::new(
                0.0, 0.0, value, value, 0.0, 0.0, 0.0, 0.0,
            ),
            start_time: now,
            goal_time: 0.0,
            mode,
        }
    }

    /// Position mode: `y` = position, `y'` = velocity, `y''` = acceleration.
    pub fn position(
        now: Instant,
        measured_position: f32,
        measured_velocity: f32,
        goal_position: f32,
        goal_time: f32,
        feedforward_velocity: f32,
        feedforward_acceleration: f32,
    ) -> Self {
        Self {
            interpolator: QuinticHermiteInterpolator::new(
                0.0,
                goal_time,
                measured_position,
                goal_position,
                measured_velocity,
                feedforward_velocity,
                0.0,
                feedforward_acceleration,
            ),
            start_time: now,
            goal_time,
            mode: Mode::Position,
        }
    }

    /// Velocity mode: `y` = velocity, `y'` = acceleration, `y''` = 0.
    pub fn velocity(
        now: Instant,
        measured_velocity: f32,
        goal_velocity: f32,
        goal_time: f32,
        feedforward_acceleration: f32,
    ) -> Self {
        Self {
            interpolator: QuinticHermiteInterpolator::new(
                0.0,
                goal_time,
                measured_velocity,
                goal_velocity,
                0.0,
                feedforward_acceleration,
                0.0,
                0.0,
            ),
            start_time: now,
            goal_time,
            mode: Mode::Velocity,
        }
    }

    /// Effort mode: a linear ramp only, `y'` = `y''` = 0 at both ends.
    pub fn effort(now: Instant, measured_effort: f32, goal_effort: f32, goal_time: f32) -> Self {
        Self {
            interpolator: QuinticHermiteInterpolator::new(
                0.0,
                goal_time,
                measured_effort,
                goal_effort,
                0.0,
                0.0,
                0.0,
                0.0,
            ),
            start_time: now,
            goal_time,
            mode: Mode::Effort,
        }
    }

    fn elapsed(&self, now: Instant) -> f32 {
        now.saturating_duration_since(self.start_time).as_secs_f32()
    }

    /// The instant this trajectory holds steady at the goal.
    pub fn finish_time(&self) -> Instant {
        self.start_time + Duration::from_secs_f32(self.goal_time.max(0.0))
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        now >= self.finish_time()
    }

    /// Sample `(y, y', y'')` at `now`, clamped by the interpolator past the
    /// trajectory's span.
    pub fn sample(&self, now: Instant) -> (f32, f32, f32) {
        let x = self.elapsed(now);
        (
            self.interpolator.y(x),
            self.interpolator.dy(x),
            self.interpolator.ddy(x),
        )
    }

    pub fn to_joint_input(&self, now: Instant) -> JointInput {
        let (y, dy, ddy) = self.sample(now);
        match self.mode {
            Mode::Idle => JointInput::Idle,
            Mode::Position => JointInput::Position {
                position: y,
                feedforward_velocity: dy,
                feedforward_acceleration: ddy,
            },
            Mode::Velocity => JointInput::Velocity {
                velocity: y,
                feedforward_acceleration: dy,
            },
            Mode::Effort => JointInput::Effort { effort: y },
        }
    }
}

/// Owns one [`Trajectory`] per joint and samples all of them into the
/// outgoing `set_joint_inputs` payload each daemon cycle.
#[derive(Debug, Clone)]
pub struct TrajectoryEngine {
    trajectories: Vec<Trajectory>,
}

impl TrajectoryEngine {
    pub fn new(now: Instant, num_joints: usize) -> Self {
        Self {
            trajectories: (0..num_joints)
                .map(|_| Trajectory::holding(now, Mode::Idle, 0.0))
                .collect(),
        }
    }

    pub fn set_position_goal(
        &mut self,
        now: Instant,
        index: usize,
        measured: JointOutput,
        goal_position: f32,
        goal_time: f32,
        feedforward_velocity: f32,
        feedforward_acceleration: f32,
    ) {
        self.trajectories[index] = Trajectory::position(
            now,
            measured.position,
            measured.velocity,
            goal_position,
            goal_time,
            feedforward_velocity,
            feedforward_acceleration,
        );
    }

    pub fn set_velocity_goal(
        &mut self,
        now: Instant,
        index: usize,
        measured: JointOutput,
        goal_velocity: f32,
        goal_time: f32,
        feedforward_acceleration: f32,
    ) {
        self.trajectories[index] = Trajectory::velocity(
            now,
            measured.velocity,
            goal_velocity,
            goal_time,
            feedforward_acceleration,
        );
    }

    pub fn set_effort_goal(
        &mut self,
        now: Instant,
        index: usize,
        measured: JointOutput,
        goal_effort: f32,
        goal_time: f32,
    ) {
        self.trajectories[index] = Trajectory::effort(now, measured.effort, goal_effort, goal_time);
    }

    pub fn set_idle(&mut self, now: Instant, index: usize) {
        self.trajectories[index] = Trajectory::holding(now, Mode::Idle, 0.0);
    }

    pub fn sample_all(&self, now: Instant) -> Vec<JointInput> {
        self.trajectories.iter().map(|t| t.to_joint_input(now)).collect()
    }

    pub fn is_finished(&self, indices: &[usize], now: Instant) -> bool {
        indices.iter().all(|&i| self.trajectories[i].is_finished(now))
    }

    pub fn finish_time(&self, indices: &[usize]) -> Instant {
        indices
            .iter()
            .map(|&i| self.trajectories[i].finish_time())
            .max()
            .unwrap_or_else(Instant::now)
    }
}
