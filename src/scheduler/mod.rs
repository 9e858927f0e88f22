//! Scheduling API exposed to model actions
//!
//! The scheduler owns the clock, the future-event set, the id counter, and
//! the named RNG streams. Actions receive a mutable borrow of it at dispatch
//! and use it to read the clock, schedule and cancel events, draw random
//! numbers, and request termination.
//!
//! Ids are assigned from a monotonically increasing counter, which makes
//! creation order part of the dispatch ordering contract.

use thiserror::Error;

use crate::core::time::{Clock, SimTime};
use crate::events::{ActionError, Event, EventHandle};
use crate::fes::FutureEventSet;
use crate::rng::{RngStream, RngStreams};

/// Scheduling failures.
///
/// These are programmer errors in the model, not recoverable conditions; the
/// dispatcher aborts the run on the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    /// Absolute-time schedule into the past.
    #[error("cannot schedule into the past: requested t={requested}, now={now}")]
    BackInTime { requested: SimTime, now: SimTime },

    /// Relative schedule with a negative delay.
    #[error("cannot schedule with negative delay: {delay}")]
    NegativeDelay { delay: i64 },

    /// `now + delay` does not fit in the time domain.
    #[error("due time overflows the time domain: now={now}, delay={delay}")]
    TimeOverflow { now: SimTime, delay: u64 },
}

/// Scheduling and clock access for model actions.
///
/// One scheduler exists per run, owned by the run controller. There is no
/// concurrency: exactly one action borrows it at any moment.
pub struct Scheduler<S> {
    pub(crate) clock: Clock,
    pub(crate) fes: FutureEventSet<S>,
    streams: RngStreams,
    next_id: u64,
    stop_requested: bool,
}

impl<S> Scheduler<S> {
    pub(crate) fn new(master_seed: u64) -> Self {
        Self {
            clock: Clock::new(),
            fes: FutureEventSet::new(),
            streams: RngStreams::new(master_seed),
            next_id: 0,
            stop_requested: false,
        }
    }

    /// Current simulation time.
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Number of live pending events.
    pub fn pending_events(&self) -> usize {
        self.fes.len()
    }

    /// Schedule `action` at absolute time `due_at`.
    ///
    /// Requires `due_at >= now`; scheduling at exactly `now` is legal and the
    /// event fires after the current action returns, ordered by priority and
    /// then creation id. Lower `priority` values fire first.
    pub fn schedule_at<F>(
        &mut self,
        due_at: SimTime,
        priority: i32,
        action: F,
    ) -> Result<EventHandle, SchedulingError>
    where
        F: FnOnce(&mut S, &mut Scheduler<S>) -> Result<(), ActionError> + 'static,
    {
        let id = self.next_id;
        let event = Event::new(id, due_at, priority, Box::new(action));
        self.fes.insert(event, self.clock.now())?;
        self.next_id += 1;
        Ok(EventHandle::new(id))
    }

    /// Schedule `action` after a relative delay of `delay` ticks.
    ///
    /// Requires `delay >= 0`. Equivalent to `schedule_at(now + delay, ..)`.
    pub fn schedule_after<F>(
        &mut self,
        delay: i64,
        priority: i32,
        action: F,
    ) -> Result<EventHandle, SchedulingError>
    where
        F: FnOnce(&mut S, &mut Scheduler<S>) -> Result<(), ActionError> + 'static,
    {
        if delay < 0 {
            return Err(SchedulingError::NegativeDelay { delay });
        }
        let delay = delay as u64;
        let now = self.clock.now();
        let due_at = now
            .checked_add(delay)
            .ok_or(SchedulingError::TimeOverflow { now, delay })?;
        self.schedule_at(due_at, priority, action)
    }

    /// Cancel the event behind `handle`.
    ///
    /// Idempotent: cancelling an already-fired or already-cancelled event is
    /// a silent no-op.
    pub fn cancel(&mut self, handle: EventHandle) {
        self.fes.cancel(handle.id());
    }

    /// Ask the dispatcher to end the run cleanly before the next event.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Whether a stop has been requested.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// The named RNG stream `name`, created on first use.
    pub fn rng(&mut self, name: &str) -> &mut RngStream {
        self.streams.stream(name)
    }
}
