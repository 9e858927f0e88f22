//! Cancellation semantics
//!
//! Cancelled events never execute; cancellation is idempotent; the host's
//! cancellation flag ends the run cleanly between events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use des_simulator_core_rs::{
    ActionError, EventHandle, Model, RunConfig, RunController, RunOutcome, Scheduler,
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
fn test_cancelled_event_never_fires() {
    // B at t=5 cancels A at t=10 before it can fire
    #[derive(Default)]
    struct CancelModel {
        target: Option<EventHandle>,
        log: Vec<String>,
    }
    impl Model for CancelModel {
        fn init(&mut self, scheduler: &mut Scheduler<Self>) -> Result<(), ActionError> {
            let handle =
                scheduler.schedule_at(10, 0, |m: &mut CancelModel, _: &mut Scheduler<CancelModel>| {
                    m.log.push("A".to_string());
                    Ok(())
                })?;
            self.target = Some(handle);

            scheduler.schedule_at(5, 0, |m: &mut CancelModel, s: &mut Scheduler<CancelModel>| {
                if let Some(handle) = m.target.take() {
                    s.cancel(handle);
                }
                m.log.push("B".to_string());
                Ok(())
            })?;
            Ok(())
        }
    }

    let mut controller = RunController::new(config(), CancelModel::default()).unwrap();
    let report = controller.run().unwrap();

    assert_eq!(controller.state().log, vec!["B"]);
    assert_eq!(report.events_dispatched, 1);
    assert_eq!(report.events_cancelled, 1);
    assert_eq!(report.outcome, RunOutcome::Quiescent);
}

#[test]
fn test_cancel_is_idempotent_and_expired_handles_are_harmless() {
    #[derive(Default)]
    struct Idem {
        early: Option<EventHandle>,
        late: Option<EventHandle>,
        fired: Vec<&'static str>,
    }
    impl Model for Idem {
        fn init(&mut self, scheduler: &mut Scheduler<Self>) -> Result<(), ActionError> {
            let early = scheduler.schedule_at(2, 0, |m: &mut Idem, _: &mut Scheduler<Idem>| {
                m.fired.push("early");
                Ok(())
            })?;
            let late = scheduler.schedule_at(10, 0, |m: &mut Idem, _: &mut Scheduler<Idem>| {
                m.fired.push("late");
                Ok(())
            })?;
            self.early = Some(early);
            self.late = Some(late);

            scheduler.schedule_at(5, 0, |m: &mut Idem, s: &mut Scheduler<Idem>| {
                // "early" already fired; cancelling its handle is a no-op
                if let Some(h) = m.early {
                    s.cancel(h);
                }
                // cancel "late" twice; the second is a no-op
                if let Some(h) = m.late {
                    s.cancel(h);
                    s.cancel(h);
                }
                Ok(())
            })?;
            Ok(())
        }
    }

    let mut controller = RunController::new(config(), Idem::default()).unwrap();
    let report = controller.run().unwrap();

    assert_eq!(controller.state().fired, vec!["early"]);
    assert_eq!(report.events_cancelled, 1);
    assert_eq!(report.events_dispatched, 2);
}

#[test]
fn test_external_cancel_flag_before_run() {
    struct OneShot;
    impl Model for OneShot {
        fn init(&mut self, scheduler: &mut Scheduler<Self>) -> Result<(), ActionError> {
            scheduler.schedule_at(3, 0, |_, _| Ok(()))?;
            Ok(())
        }
    }

    let mut controller = RunController::new(config(), OneShot).unwrap();
    controller.cancel_flag().store(true, Ordering::Relaxed);

    let report = controller.run().unwrap();
    assert_eq!(report.outcome, RunOutcome::Cancelled);
    assert_eq!(report.events_dispatched, 0);
    assert_eq!(report.final_time, 0);
}

#[test]
fn test_external_cancel_flag_mid_run() {
    // The first action trips the flag; the second pending event is never
    // dispatched.
    #[derive(Default)]
    struct Trip {
        flag: Option<Arc<AtomicBool>>,
        log: Vec<&'static str>,
    }
    impl Model for Trip {
        fn init(&mut self, scheduler: &mut Scheduler<Self>) -> Result<(), ActionError> {
            scheduler.schedule_at(2, 0, |m: &mut Trip, _: &mut Scheduler<Trip>| {
                m.log.push("first");
                if let Some(flag) = &m.flag {
                    flag.store(true, Ordering::Relaxed);
                }
                Ok(())
            })?;
            scheduler.schedule_at(4, 0, |m: &mut Trip, _: &mut Scheduler<Trip>| {
                m.log.push("second");
                Ok(())
            })?;
            Ok(())
        }
    }

    let mut controller = RunController::new(config(), Trip::default()).unwrap();
    let flag = controller.cancel_flag();
    controller.state_mut().flag = Some(flag);

    let report = controller.run().unwrap();
    assert_eq!(controller.state().log, vec!["first"]);
    assert_eq!(report.outcome, RunOutcome::Cancelled);
    assert_eq!(report.final_time, 2);
    assert_eq!(controller.pending_events(), 0);
}
