//! Observation hooks and snap reporting
//!
//! Hooks are observers of the run lifecycle: run start, warm-up end, each
//! snap boundary, run end. They get the current clock and a read-only view
//! of the model; they cannot touch the event queue or the model state. The
//! warm-up notification is where statistics accumulators discard everything
//! gathered during the transient.
//!
//! Reporters are the narrower cousin: they receive only the per-snap metrics
//! record, once per snap window.

pub mod log;

use serde::Serialize;

use crate::core::time::SimTime;

/// Observer of run lifecycle points.
///
/// All methods default to no-ops; implement the ones you need. Hooks run in
/// registration order on the engine thread, so they should be quick.
pub trait ObservationHook<S> {
    /// Called once, after the model has seeded the event queue, at t = 0.
    #[allow(unused_variables)]
    fn on_run_start(&mut self, now: SimTime, state: &S) {}

    /// Called at the warm-up instant. Statistics gathered before this point
    /// must be discarded.
    #[allow(unused_variables)]
    fn on_warmup_end(&mut self, now: SimTime, state: &S) {}

    /// Called at each snap boundary, before any event due at the boundary
    /// fires. `snap_index` is 0-based.
    #[allow(unused_variables)]
    fn on_snap(&mut self, snap_index: u32, now: SimTime, state: &S) {}

    /// Called once when the run ends cleanly (including quiescent, stopped,
    /// and cancelled runs). Not called on a fatal abort.
    #[allow(unused_variables)]
    fn on_run_end(&mut self, now: SimTime, state: &S) {}
}

/// Registered hooks, invoked in registration order.
pub struct HookRunner<S> {
    hooks: Vec<Box<dyn ObservationHook<S>>>,
}

impl<S> HookRunner<S> {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn add(&mut self, hook: Box<dyn ObservationHook<S>>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn on_run_start(&mut self, now: SimTime, state: &S) {
        for hook in &mut self.hooks {
            hook.on_run_start(now, state);
        }
    }

    pub fn on_warmup_end(&mut self, now: SimTime, state: &S) {
        for hook in &mut self.hooks {
            hook.on_warmup_end(now, state);
        }
    }

    pub fn on_snap(&mut self, snap_index: u32, now: SimTime, state: &S) {
        for hook in &mut self.hooks {
            hook.on_snap(snap_index, now, state);
        }
    }

    pub fn on_run_end(&mut self, now: SimTime, state: &S) {
        for hook in &mut self.hooks {
            hook.on_run_end(now, state);
        }
    }
}

impl<S> Default for HookRunner<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine-side metrics for one snap window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapMetrics {
    /// 0-based snap index.
    pub snap_index: u32,

    /// Inclusive start of the window.
    pub window_start: SimTime,

    /// Boundary instant the snap was taken at.
    pub window_end: SimTime,

    /// Events dispatched inside this window.
    pub events_dispatched: u64,

    /// Events still pending in the queue at the boundary.
    pub pending_events: usize,
}

/// Receiver of per-snap metrics.
pub trait Reporter {
    fn record(&mut self, snap_index: u32, metrics: &SnapMetrics);
}
