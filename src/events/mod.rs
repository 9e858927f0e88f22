//! Events and the total ordering contract
//!
//! An event pairs a due time, a priority, a creation id, and the action to
//! run at dispatch. Events are created by the scheduler only; model code
//! holds at most an [`EventHandle`], which is good for cancellation and
//! nothing else.
//!
//! # Ordering
//!
//! The queue orders events by `(due_at, priority, id)` ascending, with lower
//! priority values firing first. Because the id is part of the key, two
//! distinct live events never compare equal, and dispatch order is fully
//! determined by what was scheduled, never by queue internals. This is the
//! tie-break contract the whole determinism story rests on.

use std::fmt;

use thiserror::Error;

use crate::core::time::SimTime;
use crate::scheduler::{Scheduler, SchedulingError};

/// Action bound to an event.
///
/// Runs exactly once, at dispatch, with exclusive access to the model state
/// and the scheduler. Actions are fallible; an error aborts the run.
pub type Action<S> = Box<dyn FnOnce(&mut S, &mut Scheduler<S>) -> Result<(), ActionError>>;

/// Error signaled by an action.
///
/// `Scheduling` exists so `?` works on scheduler calls inside actions; the
/// dispatcher unwraps it back into the precise failure kind when it aborts.
#[derive(Debug, Error)]
pub enum ActionError {
    /// A scheduler call inside the action failed.
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    /// The model's own logic failed.
    #[error("model error: {0}")]
    Model(String),
}

impl ActionError {
    /// Convenience constructor for model-logic failures.
    pub fn model(message: impl Into<String>) -> Self {
        ActionError::Model(message.into())
    }
}

/// Ordering key of an event: `(due_at, priority, id)` ascending.
///
/// Field order matters: the derived `Ord` is exactly the queue's comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    /// Absolute simulation time the event fires at.
    pub due_at: SimTime,
    /// Lower value fires first.
    pub priority: i32,
    /// Creation id, strictly increasing within a run.
    pub id: u64,
}

/// A scheduled event.
///
/// Immutable once constructed; cancellation is tracked by the event queue,
/// not by the event itself.
pub struct Event<S> {
    id: u64,
    due_at: SimTime,
    priority: i32,
    action: Action<S>,
}

impl<S> Event<S> {
    pub(crate) fn new(id: u64, due_at: SimTime, priority: i32, action: Action<S>) -> Self {
        Self {
            id,
            due_at,
            priority,
            action,
        }
    }

    /// Creation id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Absolute due time.
    pub fn due_at(&self) -> SimTime {
        self.due_at
    }

    /// Dispatch priority; lower fires first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Ordering key.
    pub fn key(&self) -> EventKey {
        EventKey {
            due_at: self.due_at,
            priority: self.priority,
            id: self.id,
        }
    }

    /// Split the event into its key and action for dispatch.
    pub(crate) fn take(self) -> (EventKey, Action<S>) {
        (
            EventKey {
                due_at: self.due_at,
                priority: self.priority,
                id: self.id,
            },
            self.action,
        )
    }
}

impl<S> fmt::Debug for Event<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("due_at", &self.due_at)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Lightweight reference to a scheduled event.
///
/// Carries only the id. Does not own the event; a handle to an event that
/// has already fired or been cancelled is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle {
    id: u64,
}

impl EventHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self { id }
    }

    /// Id of the referenced event.
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_orders_by_time_then_priority_then_id() {
        let a = EventKey {
            due_at: 5,
            priority: 0,
            id: 7,
        };
        let b = EventKey {
            due_at: 5,
            priority: 1,
            id: 1,
        };
        let c = EventKey {
            due_at: 6,
            priority: -3,
            id: 0,
        };

        assert!(a < b, "priority breaks same-time ties");
        assert!(b < c, "time dominates priority");

        let earlier = EventKey {
            due_at: 5,
            priority: 0,
            id: 3,
        };
        assert!(earlier < a, "id breaks full ties in creation order");
    }
}
