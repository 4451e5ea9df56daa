//! The two-mutex preemption discipline and the background daemon loop.
//!
//! Two mutexes guard the shared state: `preempt` and `data`. Both the
//! daemon and any foreground caller acquire `preempt` then `data`, release
//! `preempt` early (keeping only `data` for the transaction), then release
//! `data`. A caller blocked on `preempt` is guaranteed to run in the very
//! next slot — see `SPEC_FULL.md` §5 for the full timeline diagram this
//! reproduces. Nested acquisition of `preempt` while holding `data` (or vice
//! versa) is forbidden; every code path here goes through
//! [`Shared::with_transaction`], which is the only place that acquires
//! either mutex.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use parking_lot::Mutex;

use trossen_arm_protocol::{JointOutput, Request, Response, ResponseContext};
use trossen_arm_transport::Session;

use crate::config_store::ConfigurationMirror;
use crate::error::{DriverError, LatchedError};
use crate::options::DriverOptions;
use crate::rpc;
use crate::trajectory::TrajectoryEngine;

/// Everything a daemon cycle or a foreground RPC touches, behind `data`.
pub struct DriverData {
    pub session: Session,
    pub num_joints: usize,
    pub config: ConfigurationMirror,
    pub trajectory: TrajectoryEngine,
    pub joint_outputs: Vec<JointOutput>,
    pub options: DriverOptions,
}

/// State shared between the daemon thread and the foreground `Driver`
/// handle.
pub struct Shared {
    preempt: Mutex<()>,
    data: Mutex<DriverData>,
    activated: AtomicBool,
    last_fatal: Mutex<Option<LatchedError>>,
}

impl Shared {
    pub fn new(data: DriverData) -> Self {
        Self {
            preempt: Mutex::new(()),
            data: Mutex::new(data),
            activated: AtomicBool::new(true),
            last_fatal: Mutex::new(None),
        }
    }

    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::Acquire)
    }

    pub fn deactivate(&self) {
        self.activated.store(false, Ordering::Release);
    }

    /// Run one transaction under the preempt-then-data acquire order,
    /// releasing `preempt` as soon as `data` is held.
    pub fn with_transaction<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut DriverData) -> R,
    {
        let preempt_guard = self.preempt.lock();
        let mut data = self.data.lock();
        drop(preempt_guard);
        let result = f(&mut data);
        drop(data);
        result
    }

    pub fn latch(&self, error: LatchedError) {
        tracing::error!(kind = %error.kind, message = %error.message, "latching fatal error");
        *self.last_fatal.lock() = Some(error);
    }

    pub fn latched(&self) -> Option<LatchedError> {
        self.last_fatal.lock().clone()
    }

    pub fn clear_latched(&self) {
        *self.last_fatal.lock() = None;
    }

    /// Unwrap the shared state once the daemon thread has been joined and
    /// this is the only remaining owner.
    pub fn into_data(self) -> DriverData {
        self.data.into_inner()
    }
}

pub(crate) fn to_latched(err: DriverError) -> LatchedError {
    match err {
        DriverError::Transport(e) => LatchedError::transport(e.to_string()),
        DriverError::Protocol(e) => LatchedError::protocol(e.to_string()),
        DriverError::Latched(e) => e,
        DriverError::Usage(e) => LatchedError::protocol(e.to_string()),
    }
}

fn fetch_log_best_effort(data: &DriverData) -> String {
    let ctx = ResponseContext::new(data.num_joints);
    match rpc::call(&data.session, &Request::GetLog, &ctx, &data.options) {
        Ok((_, Response::Log { message })) => message,
        Ok(_) => String::new(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to fetch detailed log for latched error");
            String::new()
        }
    }
}

/// One daemon slot: sample the trajectory engine, send `set_joint_inputs`,
/// and store the decoded outputs. Per the open question in
/// `SPEC_FULL.md` §9, every slot performs exactly this one exchange —
/// `get_joint_outputs` is never interleaved, since `set_joint_inputs`'s own
/// reply already carries the measured outputs.
fn run_one_cycle(data: &mut DriverData) -> Result<(), LatchedError> {
    let now = Instant::now();
    let inputs = data.trajectory.sample_all(now);
    let request = Request::SetJointInputs { inputs };
    let ctx = ResponseContext::new(data.num_joints);

    let (status, response) =
        rpc::call(&data.session, &request, &ctx, &data.options).map_err(to_latched)?;

    if status.is_fatal() {
        data.config.error_state = status;
        let message = fetch_log_best_effort(data);
        return Err(LatchedError::controller(status, message));
    }

    if let Response::JointOutputs { outputs } = response {
        data.joint_outputs = outputs;
    }
    Ok(())
}

/// Spawn the background daemon thread. It runs until `shared.deactivate()`
/// is called (by `cleanup`) or a cycle fails fatally, at which point it
/// latches the error and stops itself.
pub fn spawn(shared: Arc<Shared>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while shared.is_activated() {
            let outcome = shared.with_transaction(run_one_cycle);
            if let Err(error) = outcome {
                shared.latch(error);
                shared.deactivate();
                break;
            }
            let pacing = shared.with_transaction(|data| data.options.cycle_pacing);
            if !pacing.is_zero() {
                std::thread::sleep(pacing);
            }
        }
        tracing::debug!("daemon thread exiting");
    })
}
