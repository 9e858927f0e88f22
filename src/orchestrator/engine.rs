//! Run controller and dispatch loop
//!
//! The run controller owns everything a run needs: the model state, the
//! scheduler (clock, event queue, id counter, RNG streams), the observation
//! hooks, and the run bookkeeping. It drains the event queue in key order,
//! advances the clock to each event's due time, and hands control to the
//! event's action.
//!
//! # Dispatch loop
//!
//! ```text
//! between events:
//!   honor external cancellation, then model stop requests
//! pop the next live event (cancelled entries are skipped)
//!   queue empty -> quiescent end (legal outcome)
//! process warm-up / snap boundaries due at or before the event
//!   final boundary reached -> run complete, event never fires
//! advance the clock to the event's due time
//! invoke the action with (state, scheduler)
//!   action error -> abort, surface error with current time
//! ```
//!
//! # Determinism
//!
//! Same config, same master seed, same model: identical dispatch sequence
//! and identical snap reports. The controller folds every dispatched
//! `(due_at, priority, id)` key into a SHA-256 digest; equal `trace_hash`
//! values in two run reports mean the runs were replays of each other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::time::SimTime;
use crate::events::{ActionError, EventKey};
use crate::observe::log::{LogSink, Severity};
use crate::observe::{HookRunner, ObservationHook, Reporter, SnapMetrics};
use crate::scheduler::{Scheduler, SchedulingError};

// ============================================================================
// Configuration
// ============================================================================

/// Complete run configuration.
///
/// Validated eagerly at [`RunController::new`]; a controller that constructs
/// successfully will never fail on configuration later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Simulated interval discarded for statistics. Must be > 0.
    pub warm_up_duration: SimTime,

    /// Length of one measurement window. Must be > 0.
    pub snap_duration: SimTime,

    /// Number of measurement windows after warm-up. Must be > 0.
    pub snap_count: u32,

    /// Master seed all named RNG streams derive from.
    pub master_seed: u64,

    /// When false, the controller validates the configuration and stops
    /// without running the model.
    pub run_model: bool,
}

impl RunConfig {
    /// Validate the configuration and return the run horizon,
    /// `warm_up_duration + snap_duration * snap_count`.
    pub fn validate(&self) -> Result<SimTime, SimulationError> {
        if self.warm_up_duration == 0 {
            return Err(SimulationError::ConfigInvalid(
                "warm_up_duration must be > 0".to_string(),
            ));
        }
        if self.snap_duration == 0 {
            return Err(SimulationError::ConfigInvalid(
                "snap_duration must be > 0".to_string(),
            ));
        }
        if self.snap_count == 0 {
            return Err(SimulationError::ConfigInvalid(
                "snap_count must be > 0".to_string(),
            ));
        }
        let measured = self
            .snap_duration
            .checked_mul(self.snap_count as u64)
            .ok_or_else(|| {
                SimulationError::ConfigInvalid(
                    "snap_duration * snap_count overflows the time domain".to_string(),
                )
            })?;
        self.warm_up_duration.checked_add(measured).ok_or_else(|| {
            SimulationError::ConfigInvalid(
                "warm_up_duration + measurement interval overflows the time domain".to_string(),
            )
        })
    }
}

/// SHA-256 of the canonical JSON form of the config, carried in the run
/// report so results can be matched back to the exact configuration.
fn compute_config_hash(config: &RunConfig) -> Result<String, SimulationError> {
    let canonical = serde_json::to_string(config)
        .map_err(|e| SimulationError::ConfigInvalid(format!("config not serializable: {}", e)))?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Model interface
// ============================================================================

/// What the user supplies: the model state plus its seeding logic.
///
/// The implementor is the model state; the controller owns it exclusively
/// for the duration of a run and lends it, mutably, to one action at a time.
pub trait Model: Sized {
    /// Seed the event queue. Runs once at t = 0; scheduling events due at
    /// exactly 0 is legal.
    fn init(&mut self, scheduler: &mut Scheduler<Self>) -> Result<(), ActionError>;

    /// Statistics callback invoked at each snap boundary, before any event
    /// due at the boundary fires. Default: no-op.
    #[allow(unused_variables)]
    fn on_snap(&mut self, snap_index: u32) {}
}

// ============================================================================
// Errors, outcomes, run state
// ============================================================================

/// Fatal simulation errors.
///
/// The controller surfaces the first fatal error and does not attempt
/// recovery. Quiescence and cancellation are outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Configuration refused at construction.
    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    /// A scheduler call failed during dispatch.
    #[error("scheduling failed at t={at}: {source}")]
    Scheduling {
        at: SimTime,
        #[source]
        source: SchedulingError,
    },

    /// An action signaled a model error.
    #[error("action failed at t={at}: {message}")]
    ActionFailed { at: SimTime, message: String },

    /// Illegal lifecycle use of the controller, for example running it
    /// twice. A programmer error.
    #[error("invalid run-state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: RunState, to: RunState },
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// The measurement horizon was reached; all snaps recorded.
    Completed,

    /// The event queue drained before the horizon. Legal: the model went
    /// quiet early.
    Quiescent,

    /// An action requested termination.
    StoppedByModel,

    /// The host's cancellation flag was honored between events.
    Cancelled,

    /// Validate-only run (`run_model = false`); the model never started.
    Validated,
}

/// Lifecycle state of the controller.
///
/// ```text
/// Idle -> Running <-> Paused
///            |          |
///            +--> Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Terminated,
}

impl RunState {
    /// Legal lifecycle transitions. Everything else is a programmer error.
    fn can_transition(self, to: RunState) -> bool {
        matches!(
            (self, to),
            (RunState::Idle, RunState::Running)
                | (RunState::Idle, RunState::Terminated)
                | (RunState::Running, RunState::Paused)
                | (RunState::Paused, RunState::Running)
                | (RunState::Running, RunState::Terminated)
        )
    }
}

/// Result of dispatching one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// One event was dispatched; more may be pending.
    Dispatched,

    /// The run terminated with the given outcome.
    Finished(RunOutcome),
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,

    /// Clock position when the run ended.
    pub final_time: SimTime,

    /// Events whose actions were invoked.
    pub events_dispatched: u64,

    /// Cancellations observed over the run.
    pub events_cancelled: u64,

    /// Snap windows actually recorded. Less than `snap_count` when the run
    /// ended early.
    pub snaps_recorded: u32,

    /// SHA-256 over the dispatched `(due_at, priority, id)` sequence. Equal
    /// hashes mean replayed runs.
    pub trace_hash: String,

    /// SHA-256 of the canonical config, for provenance.
    pub config_hash: String,
}

// ============================================================================
// Run controller
// ============================================================================

/// Owns and drives one simulation run.
///
/// Exactly one controller value per run; it is not restartable. Double-run
/// is reported as [`SimulationError::InvalidTransition`].
///
/// # Example
/// ```
/// use des_simulator_core_rs::events::ActionError;
/// use des_simulator_core_rs::orchestrator::{Model, RunConfig, RunController};
/// use des_simulator_core_rs::scheduler::Scheduler;
///
/// #[derive(Default)]
/// struct Counter {
///     fired: u32,
/// }
///
/// impl Model for Counter {
///     fn init(&mut self, scheduler: &mut Scheduler<Self>) -> Result<(), ActionError> {
///         scheduler.schedule_at(3, 0, |state: &mut Counter, _| {
///             state.fired += 1;
///             Ok(())
///         })?;
///         Ok(())
///     }
/// }
///
/// let config = RunConfig {
///     warm_up_duration: 1,
///     snap_duration: 10,
///     snap_count: 1,
///     master_seed: 42,
///     run_model: true,
/// };
///
/// let mut controller = RunController::new(config, Counter::default()).unwrap();
/// let report = controller.run().unwrap();
/// assert_eq!(report.events_dispatched, 1);
/// assert_eq!(controller.state().fired, 1);
/// ```
pub struct RunController<M: Model> {
    config: RunConfig,
    config_hash: String,

    /// Model state, lent to one action at a time.
    state: M,

    /// Clock, event queue, id counter, RNG streams.
    scheduler: Scheduler<M>,

    run_state: RunState,
    hooks: HookRunner<M>,
    reporters: Vec<Box<dyn Reporter>>,
    log: Option<Box<dyn LogSink>>,

    /// Host-settable flag, checked between events.
    cancel: Arc<AtomicBool>,

    /// `warm_up_duration + snap_duration * snap_count`.
    horizon: SimTime,
    warmed_up: bool,
    next_snap: u32,

    events_dispatched: u64,
    window_dispatched: u64,
    snaps_recorded: u32,
    trace: Sha256,
    outcome: Option<RunOutcome>,
}

impl<M: Model> RunController<M> {
    /// Build a controller over `state`, validating `config` eagerly.
    pub fn new(config: RunConfig, state: M) -> Result<Self, SimulationError> {
        let horizon = config.validate()?;
        let config_hash = compute_config_hash(&config)?;
        let scheduler = Scheduler::new(config.master_seed);

        Ok(Self {
            config,
            config_hash,
            state,
            scheduler,
            run_state: RunState::Idle,
            hooks: HookRunner::new(),
            reporters: Vec::new(),
            log: None,
            cancel: Arc::new(AtomicBool::new(false)),
            horizon,
            warmed_up: false,
            next_snap: 0,
            events_dispatched: 0,
            window_dispatched: 0,
            snaps_recorded: 0,
            trace: Sha256::new(),
            outcome: None,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current simulation time.
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Lifecycle state.
    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Outcome, once the run has terminated.
    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    /// The run report, once the run has terminated.
    pub fn report(&self) -> Option<RunReport> {
        self.outcome.map(|outcome| self.build_report(outcome))
    }

    /// Read access to the model state. Available after an abort too, so the
    /// partial state of a failed run can be inspected.
    pub fn state(&self) -> &M {
        &self.state
    }

    /// Mutable access to the model state, for host-side setup between
    /// construction and run. Mutating mid-run bypasses no invariants of the
    /// engine itself but will not be replayed.
    pub fn state_mut(&mut self) -> &mut M {
        &mut self.state
    }

    /// Consume the controller and take the model state back.
    pub fn into_state(self) -> M {
        self.state
    }

    /// The configuration this controller was built with.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Live pending events.
    pub fn pending_events(&self) -> usize {
        self.scheduler.pending_events()
    }

    /// Events dispatched so far.
    pub fn events_dispatched(&self) -> u64 {
        self.events_dispatched
    }

    /// Clone of the cancellation flag. A host that wants to bound run time
    /// sets it; the dispatcher honors it between events.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Register an observation hook. Hooks run in registration order.
    pub fn add_hook(&mut self, hook: Box<dyn ObservationHook<M>>) {
        self.hooks.add(hook);
    }

    /// Register a per-snap metrics reporter.
    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    /// Attach the diagnostics sink. Without one the engine is silent.
    pub fn set_log_sink(&mut self, sink: Box<dyn LogSink>) {
        self.log = Some(sink);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Run to termination and return the report.
    ///
    /// With `run_model = false` this validates only: the model never starts
    /// and the report carries [`RunOutcome::Validated`].
    pub fn run(&mut self) -> Result<RunReport, SimulationError> {
        if !self.config.run_model {
            self.transition(RunState::Terminated)?;
            self.outcome = Some(RunOutcome::Validated);
            self.emit(Severity::Info, "validate-only run: config ok, model not run");
            return Ok(self.build_report(RunOutcome::Validated));
        }

        if self.run_state == RunState::Idle {
            self.start()?;
        }

        loop {
            match self.step_once()? {
                StepStatus::Dispatched => {}
                StepStatus::Finished(outcome) => return Ok(self.build_report(outcome)),
            }
        }
    }

    /// Dispatch exactly one event.
    ///
    /// Starts the run on first use. Between steps the controller parks in
    /// [`RunState::Paused`]; stepping a terminated controller is an error.
    pub fn step(&mut self) -> Result<StepStatus, SimulationError> {
        if self.run_state == RunState::Idle {
            self.start()?;
        }
        self.step_once()
    }

    /// Initialize the run: seed the event queue via [`Model::init`] and
    /// notify hooks. Legal from `Idle` only; double-init is a programmer
    /// error.
    fn start(&mut self) -> Result<(), SimulationError> {
        if self.run_state != RunState::Idle {
            return Err(SimulationError::InvalidTransition {
                from: self.run_state,
                to: RunState::Running,
            });
        }
        self.transition(RunState::Running)?;

        if self.log.is_some() {
            self.emit(
                Severity::Info,
                &format!(
                    "run starting: warm_up={}, snap_duration={}, snap_count={}, master_seed={}",
                    self.config.warm_up_duration,
                    self.config.snap_duration,
                    self.config.snap_count,
                    self.config.master_seed
                ),
            );
        }

        if let Err(err) = self.state.init(&mut self.scheduler) {
            return Err(self.abort(err));
        }

        let now = self.scheduler.now();
        self.hooks.on_run_start(now, &self.state);
        self.transition(RunState::Paused)?;
        Ok(())
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn step_once(&mut self) -> Result<StepStatus, SimulationError> {
        self.transition(RunState::Running)?;

        // external cancellation and stop requests are honored between
        // events, before the next pop
        if self.cancel.load(Ordering::Relaxed) {
            return Ok(self.finish(RunOutcome::Cancelled));
        }
        if self.scheduler.stop_requested() {
            return Ok(self.finish(RunOutcome::StoppedByModel));
        }

        let Some(event) = self.scheduler.fes.pop_min() else {
            // the queue drained early; pending snap boundaries are not
            // fast-forwarded
            return Ok(self.finish(RunOutcome::Quiescent));
        };

        // boundaries due at or before this event fire first, so an event
        // due exactly at a boundary sees the post-snap world
        if self.process_boundaries(event.due_at()) {
            // horizon reached; the popped event never fires
            return Ok(self.finish(RunOutcome::Completed));
        }

        self.scheduler.clock.advance_to(event.due_at());
        let (key, action) = event.take();
        self.record_dispatch(key);

        if let Err(err) = action(&mut self.state, &mut self.scheduler) {
            return Err(self.abort(err));
        }

        self.transition(RunState::Paused)?;
        Ok(StepStatus::Dispatched)
    }

    /// Next unprocessed boundary: the warm-up instant, then each snap end.
    fn next_boundary(&self) -> Option<SimTime> {
        if !self.warmed_up {
            Some(self.config.warm_up_duration)
        } else if self.next_snap < self.config.snap_count {
            Some(self.config.warm_up_duration + (self.next_snap as u64 + 1) * self.config.snap_duration)
        } else {
            None
        }
    }

    /// Process every boundary due at or before `due`. Returns true when the
    /// final snap boundary (the horizon) was crossed.
    fn process_boundaries(&mut self, due: SimTime) -> bool {
        while let Some(boundary) = self.next_boundary() {
            if boundary > due {
                return false;
            }
            self.scheduler.clock.advance_to(boundary);

            if !self.warmed_up {
                self.warmed_up = true;
                self.window_dispatched = 0;
                self.hooks.on_warmup_end(boundary, &self.state);
                self.emit(
                    Severity::Info,
                    &format!("warm-up complete at t={}, statistics reset", boundary),
                );
            } else {
                let index = self.next_snap;
                let metrics = SnapMetrics {
                    snap_index: index,
                    window_start: boundary - self.config.snap_duration,
                    window_end: boundary,
                    events_dispatched: self.window_dispatched,
                    pending_events: self.scheduler.pending_events(),
                };

                self.state.on_snap(index);
                self.hooks.on_snap(index, boundary, &self.state);
                for reporter in &mut self.reporters {
                    reporter.record(index, &metrics);
                }

                self.snaps_recorded += 1;
                self.window_dispatched = 0;
                self.next_snap += 1;

                if boundary == self.horizon {
                    return true;
                }
            }
        }
        false
    }

    fn record_dispatch(&mut self, key: EventKey) {
        self.trace.update(key.due_at.to_le_bytes());
        self.trace.update(key.priority.to_le_bytes());
        self.trace.update(key.id.to_le_bytes());
        self.events_dispatched += 1;
        self.window_dispatched += 1;

        if self.log.is_some() {
            self.emit(
                Severity::Debug,
                &format!(
                    "dispatch: id={} t={} priority={}",
                    key.id, key.due_at, key.priority
                ),
            );
        }
    }

    /// Clean termination. The queue is emptied and hooks see the final state.
    fn finish(&mut self, outcome: RunOutcome) -> StepStatus {
        self.run_state = RunState::Terminated;
        self.outcome = Some(outcome);
        self.scheduler.fes.clear();

        let now = self.scheduler.now();
        self.hooks.on_run_end(now, &self.state);
        if self.log.is_some() {
            self.emit(
                Severity::Info,
                &format!("run ended: outcome={:?}, t={}", outcome, now),
            );
        }
        StepStatus::Finished(outcome)
    }

    /// Fatal abort. Remaining events are discarded; the partial model state
    /// stays reachable through [`RunController::state`].
    fn abort(&mut self, err: ActionError) -> SimulationError {
        let at = self.scheduler.now();
        self.run_state = RunState::Terminated;
        self.scheduler.fes.clear();

        let sim_err = match err {
            ActionError::Scheduling(source) => SimulationError::Scheduling { at, source },
            ActionError::Model(message) => SimulationError::ActionFailed { at, message },
        };
        self.emit(Severity::Error, &format!("run aborted: {}", sim_err));
        sim_err
    }

    fn transition(&mut self, to: RunState) -> Result<(), SimulationError> {
        if !self.run_state.can_transition(to) {
            return Err(SimulationError::InvalidTransition {
                from: self.run_state,
                to,
            });
        }
        self.run_state = to;
        Ok(())
    }

    fn build_report(&self, outcome: RunOutcome) -> RunReport {
        RunReport {
            outcome,
            final_time: self.scheduler.now(),
            events_dispatched: self.events_dispatched,
            events_cancelled: self.scheduler.fes.cancelled_count(),
            snaps_recorded: self.snaps_recorded,
            trace_hash: format!("{:x}", self.trace.clone().finalize()),
            config_hash: self.config_hash.clone(),
        }
    }

    fn emit(&self, severity: Severity, message: &str) {
        if let Some(sink) = &self.log {
            sink.emit(severity, message);
        }
    }
}
