//! End-to-end tests against the fake controller in `tests/common`.
//!
//! Every test here binds the controller's fixed UDP port, so each one
//! takes `common::port_lock()` for its whole body to keep `cargo test`'s
//! default in-process concurrency from racing two fake controllers onto
//! the same port.

mod common;

use std::net::Ipv4Addr;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use rand::Rng;

use trossen_arm_driver::{Driver, DriverError, DriverOptions, ErrorKindSummary, Mode, MotionOptions, Model, UsageError};

fn configure_default(driver: &mut Driver) {
    driver
        .configure(
            Model::WxaiV0,
            Default::default(),
            Ipv4Addr::LOCALHOST,
            false,
        )
        .expect("configure against the fake controller should succeed");
}

#[test]
fn happy_path_position_move_reaches_goal_and_reports_it() {
    let _guard = common::port_lock();
    let _fake = common::FakeController::spawn(7);

    let mut driver = Driver::new(DriverOptions::default());
    configure_default(&mut driver);

    driver.set_joint_mode(0, Mode::Position).unwrap();
    driver
        .set_joint_position(0, 0.5, MotionOptions { goal_time: 0.05, blocking: true }, None, None)
        .unwrap();

    // `blocking_wait` only knows the trajectory's own clock has elapsed;
    // give the daemon a little more room to actually report a post-settle
    // sample before asserting on it.
    let deadline = Instant::now() + Duration::from_millis(500);
    let mut positions = driver.get_positions().unwrap();
    while (positions[0] - 0.5).abs() >= 1e-3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
        positions = driver.get_positions().unwrap();
    }
    assert!((positions[0] - 0.5).abs() < 1e-3, "got {positions:?}");
    assert!(driver.get_error_information().is_none());

    driver.cleanup().unwrap();
}

#[test]
fn configure_rejects_a_second_call_without_cleanup() {
    let _guard = common::port_lock();
    let _fake = common::FakeController::spawn(7);

    let mut driver = Driver::new(DriverOptions::default());
    configure_default(&mut driver);

    let err = driver
        .configure(Model::WxaiV0, Default::default(), Ipv4Addr::LOCALHOST, false)
        .unwrap_err();
    assert!(matches!(err, DriverError::Usage(UsageError::AlreadyConfigured)));

    driver.cleanup().unwrap();
}

#[test]
fn calls_after_cleanup_are_rejected() {
    let _guard = common::port_lock();
    let _fake = common::FakeController::spawn(7);

    let mut driver = Driver::new(DriverOptions::default());
    configure_default(&mut driver);
    driver.cleanup().unwrap();

    let err = driver.get_positions().unwrap_err();
    assert!(matches!(err, DriverError::Usage(UsageError::AlreadyCleaned)));
}

#[test]
fn factory_reset_flag_round_trips_through_the_wire() {
    let _guard = common::port_lock();
    let _fake = common::FakeController::spawn(7);

    let mut driver = Driver::new(DriverOptions::default());
    configure_default(&mut driver);

    assert!(!driver.get_factory_reset_flag().unwrap());
    driver.set_factory_reset_flag(true).unwrap();
    assert!(driver.get_factory_reset_flag().unwrap());

    driver.cleanup().unwrap();
}

#[test]
fn mode_getters_mirror_set_all_modes() {
    let _guard = common::port_lock();
    let _fake = common::FakeController::spawn(7);

    let mut driver = Driver::new(DriverOptions::default());
    configure_default(&mut driver);

    let modes = [
        Mode::Position,
        Mode::Velocity,
        Mode::Effort,
        Mode::Idle,
        Mode::Position,
        Mode::Velocity,
        Mode::Effort,
    ];
    driver.set_all_modes(&modes).unwrap();

    assert_eq!(driver.get_modes().unwrap(), modes);
    assert_eq!(driver.get_arm_modes().unwrap(), modes[..6]);
    assert_eq!(driver.get_gripper_mode().unwrap(), modes[6]);
    assert_eq!(driver.get_joint_mode(2).unwrap(), modes[2]);

    driver.cleanup().unwrap();
}

#[test]
fn set_arm_modes_does_not_latch_a_mode_mismatch() {
    let _guard = common::port_lock();
    let fake = common::FakeController::spawn(7);
    fake.state.lock().unwrap().enforce_mode_match = true;

    let mut driver = Driver::new(DriverOptions::default());
    configure_default(&mut driver);

    // `set_arm_modes` writes the new mode array to the controller; the
    // trajectory engine must re-idle the six arm joints in the same call so
    // the very next `set_joint_inputs` cycle tags them `Idle` rather than
    // whatever mode (or stale goal) they held before, which would otherwise
    // disagree with the controller's just-written modes.
    driver
        .set_arm_modes(&[Mode::Position; 6])
        .expect("set_arm_modes should not latch a mode mismatch");

    std::thread::sleep(Duration::from_millis(50));
    assert!(driver.get_error_information().is_none());

    driver.cleanup().unwrap();
}

#[test]
fn per_joint_getters_match_the_whole_vector_getters() {
    let _guard = common::port_lock();
    let _fake = common::FakeController::spawn(7);

    let mut driver = Driver::new(DriverOptions::default());
    configure_default(&mut driver);

    driver.set_joint_mode(3, Mode::Position).unwrap();
    driver
        .set_joint_position(3, 0.2, MotionOptions { goal_time: 0.05, blocking: true }, None, None)
        .unwrap();

    let positions = driver.get_positions().unwrap();
    assert_eq!(driver.get_joint_position(3).unwrap(), positions[3]);
    assert!(driver.get_joint_position(99).is_err());

    driver.cleanup().unwrap();
}

#[test]
fn gripper_force_limit_scaling_factor_round_trips_through_end_effector() {
    let _guard = common::port_lock();
    let _fake = common::FakeController::spawn(7);

    let mut driver = Driver::new(DriverOptions::default());
    configure_default(&mut driver);

    driver.set_gripper_force_limit_scaling_factor(0.25).unwrap();
    assert!((driver.get_gripper_force_limit_scaling_factor().unwrap() - 0.25).abs() < 1e-6);

    driver.cleanup().unwrap();
}

#[test]
fn mode_mismatch_latches_a_controller_error_and_sticks_until_cleanup() {
    let _guard = common::port_lock();
    let fake = common::FakeController::spawn(7);
    fake.state.lock().unwrap().enforce_mode_match = true;

    let mut driver = Driver::new(DriverOptions::default());
    configure_default(&mut driver);

    // Commanding a position goal without first switching the joint's mode
    // to `Position` leaves the controller's mirrored mode at `Idle`, so the
    // very next daemon cycle's `set_joint_inputs` tag disagrees with it.
    driver
        .set_joint_position(0, 0.3, MotionOptions { goal_time: 0.02, blocking: false }, None, None)
        .unwrap();

    let deadline = Instant::now() + Duration::from_millis(500);
    let mut last = None;
    while Instant::now() < deadline {
        last = driver.get_error_information();
        if last.is_some() {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    let latched = last.expect("a mode mismatch should latch within half a second");
    assert_eq!(latched.kind, ErrorKindSummary::Controller(trossen_arm_driver::ErrorState::RobotInputModeMismatch));

    // Every subsequent call re-raises the same latched error.
    let err = driver.get_positions().unwrap_err();
    assert!(matches!(err, DriverError::Latched(_)));

    driver.cleanup().unwrap();
}

#[test]
fn retransmission_recovers_from_bounded_packet_loss() {
    let _guard = common::port_lock();
    let fake = common::FakeController::spawn(7);

    let mut driver = Driver::new(DriverOptions::default());
    configure_default(&mut driver);

    // Drop the next 99 `set_joint_inputs` datagrams; the 100th (still
    // within `MAX_RETRANSMISSION_ATTEMPTS`) should go through.
    fake.drop_set_joint_inputs.store(99, Ordering::Release);

    let deadline = Instant::now() + Duration::from_millis(2_000);
    loop {
        if fake.drop_set_joint_inputs.load(Ordering::Acquire) == 0 {
            break;
        }
        assert!(Instant::now() < deadline, "drops were never consumed");
        std::thread::sleep(Duration::from_millis(5));
    }

    // The daemon must have kept running rather than latching a timeout.
    std::thread::sleep(Duration::from_millis(20));
    assert!(driver.get_error_information().is_none());
    assert!(driver.get_positions().is_ok());

    driver.cleanup().unwrap();
}

#[test]
fn exhausting_the_retransmission_budget_latches_a_transport_error() {
    let _guard = common::port_lock();
    let fake = common::FakeController::spawn(7);

    let mut driver = Driver::new(DriverOptions::default());
    configure_default(&mut driver);

    // Far more than `MAX_RETRANSMISSION_ATTEMPTS`: every `set_joint_inputs`
    // from here on is silently dropped, so the daemon must eventually give
    // up and latch a transport error rather than spin forever.
    fake.drop_set_joint_inputs.store(u32::MAX / 2, Ordering::Release);

    let deadline = Instant::now() + Duration::from_millis(2_000);
    let mut latched = None;
    while Instant::now() < deadline {
        latched = driver.get_error_information();
        if latched.is_some() {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    let latched = latched.expect("the daemon should latch after exhausting retransmissions");
    assert_eq!(latched.kind, ErrorKindSummary::Transport);

    driver.cleanup().unwrap();
}

#[test]
fn foreground_calls_are_not_starved_by_the_daemon() {
    let _guard = common::port_lock();
    let _fake = common::FakeController::spawn(7);

    let mut driver = Driver::new(DriverOptions::default());
    configure_default(&mut driver);

    // The daemon paces itself off nothing but the wire round trip
    // (`cycle_pacing` defaults to zero), so it is spinning as fast as the
    // loopback socket allows. A foreground call must still return within a
    // couple of slots, never blocked out indefinitely by the preempt/data
    // acquire order in `Shared::with_transaction`.
    for _ in 0..20 {
        let start = Instant::now();
        driver.get_positions().unwrap();
        assert!(
            start.elapsed() < Duration::from_millis(100),
            "foreground call took {:?}, daemon may be starving it",
            start.elapsed()
        );
    }

    driver.cleanup().unwrap();
}

#[test]
fn concurrent_main_thread_calls_never_deadlock() {
    let _guard = common::port_lock();
    let _fake = common::FakeController::spawn(7);

    let mut driver = Driver::new(DriverOptions::default());
    configure_default(&mut driver);
    let driver = std::sync::Arc::new(driver);

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let driver = driver.clone();
            std::thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for _ in 0..25 {
                    match worker % 2 {
                        0 => {
                            let _ = driver.get_positions();
                        }
                        _ => {
                            let _ = driver.get_modes();
                        }
                    }
                    std::thread::sleep(Duration::from_micros(rng.gen_range(0..500)));
                }
            })
        })
        .collect();

    let deadline = Instant::now() + Duration::from_secs(5);
    for handle in handles {
        assert!(Instant::now() < deadline, "worker threads took too long, possible deadlock");
        handle.join().expect("worker thread should not panic");
    }
}
