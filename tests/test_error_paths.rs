//! Failure semantics
//!
//! Scheduling into the past, negative delays, and action failures are fatal:
//! the run aborts, remaining events are discarded, and the error carries the
//! simulation time. Configuration problems are refused before anything runs.

use des_simulator_core_rs::{
    ActionError, Model, RunConfig, RunController, RunState, Scheduler, SchedulingError,
    SimulationError,
};

fn config() -> RunConfig {
    RunConfig {
        warm_up_duration: 1,
        snap_duration: 20,
        snap_count: 1,
        master_seed: 42,
        run_model: true,
    }
}

#[test]
fn test_back_in_time_schedule_aborts_with_current_time() {
    struct BackInTime;
    impl Model for BackInTime {
        fn init(&mut self, scheduler: &mut Scheduler<Self>) -> Result<(), ActionError> {
            scheduler.schedule_at(5, 0, |_, s: &mut Scheduler<BackInTime>| {
                // now == 5, so t=0 lies in the past
                s.schedule_at(0, 0, |_, _| Ok(()))?;
                Ok(())
            })?;
            Ok(())
        }
    }

    let mut controller = RunController::new(config(), BackInTime).unwrap();
    let err = controller.run().unwrap_err();

    assert_eq!(
        err,
        SimulationError::Scheduling {
            at: 5,
            source: SchedulingError::BackInTime {
                requested: 0,
                now: 5
            }
        }
    );
    assert_eq!(controller.run_state(), RunState::Terminated);
    assert_eq!(controller.pending_events(), 0);
}

#[test]
fn test_negative_delay_aborts() {
    struct NegDelay;
    impl Model for NegDelay {
        fn init(&mut self, scheduler: &mut Scheduler<Self>) -> Result<(), ActionError> {
            scheduler.schedule_at(3, 0, |_, s: &mut Scheduler<NegDelay>| {
                s.schedule_after(-7, 0, |_, _| Ok(()))?;
                Ok(())
            })?;
            Ok(())
        }
    }

    let mut controller = RunController::new(config(), NegDelay).unwrap();
    let err = controller.run().unwrap_err();

    assert_eq!(
        err,
        SimulationError::Scheduling {
            at: 3,
            source: SchedulingError::NegativeDelay { delay: -7 }
        }
    );
}

#[test]
fn test_action_failure_aborts_and_surfaces_partial_state() {
    #[derive(Default)]
    struct Failing {
        progressed: u32,
    }
    impl Model for Failing {
        fn init(&mut self, scheduler: &mut Scheduler<Self>) -> Result<(), ActionError> {
            for t in [2, 4] {
                scheduler.schedule_at(t, 0, |m: &mut Failing, _: &mut Scheduler<Failing>| {
                    m.progressed += 1;
                    Ok(())
                })?;
            }
            scheduler.schedule_at(7, 0, |_, _: &mut Scheduler<Failing>| {
                Err(ActionError::model("inventory went negative"))
            })?;
            // never reached
            scheduler.schedule_at(9, 0, |m: &mut Failing, _: &mut Scheduler<Failing>| {
                m.progressed += 100;
                Ok(())
            })?;
            Ok(())
        }
    }

    let mut controller = RunController::new(config(), Failing::default()).unwrap();
    let err = controller.run().unwrap_err();

    assert_eq!(
        err,
        SimulationError::ActionFailed {
            at: 7,
            message: "inventory went negative".to_string()
        }
    );
    // state up to the failure is preserved and inspectable
    assert_eq!(controller.state().progressed, 2);
    assert_eq!(controller.pending_events(), 0);
    assert_eq!(controller.now(), 7);
}

#[test]
fn test_failing_init_aborts_at_time_zero() {
    struct BadInit;
    impl Model for BadInit {
        fn init(&mut self, _scheduler: &mut Scheduler<Self>) -> Result<(), ActionError> {
            Err(ActionError::model("no agents configured"))
        }
    }

    let mut controller = RunController::new(config(), BadInit).unwrap();
    let err = controller.run().unwrap_err();
    assert_eq!(
        err,
        SimulationError::ActionFailed {
            at: 0,
            message: "no agents configured".to_string()
        }
    );
}

#[test]
fn test_invalid_configs_are_refused() {
    struct Empty;
    impl Model for Empty {
        fn init(&mut self, _scheduler: &mut Scheduler<Self>) -> Result<(), ActionError> {
            Ok(())
        }
    }

    let zero_warm_up = RunConfig {
        warm_up_duration: 0,
        ..config()
    };
    assert!(matches!(
        RunController::new(zero_warm_up, Empty),
        Err(SimulationError::ConfigInvalid(_))
    ));

    let zero_snap = RunConfig {
        snap_duration: 0,
        ..config()
    };
    assert!(RunController::new(zero_snap, Empty).is_err());

    let zero_count = RunConfig {
        snap_count: 0,
        ..config()
    };
    assert!(RunController::new(zero_count, Empty).is_err());

    let overflowing = RunConfig {
        snap_duration: u64::MAX / 2,
        snap_count: 4,
        ..config()
    };
    assert!(matches!(
        RunController::new(overflowing, Empty),
        Err(SimulationError::ConfigInvalid(_))
    ));
}

#[test]
fn test_running_twice_is_a_programmer_error() {
    struct Quiet;
    impl Model for Quiet {
        fn init(&mut self, scheduler: &mut Scheduler<Self>) -> Result<(), ActionError> {
            scheduler.schedule_at(2, 0, |_, _| Ok(()))?;
            Ok(())
        }
    }

    let mut controller = RunController::new(config(), Quiet).unwrap();
    controller.run().unwrap();

    let err = controller.run().unwrap_err();
    assert!(matches!(
        err,
        SimulationError::InvalidTransition {
            from: RunState::Terminated,
            ..
        }
    ));
}
