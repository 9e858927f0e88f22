//! Future-event set
//!
//! The pending-event queue: a binary min-heap keyed by `(due_at, priority,
//! id)` plus a live-id set for O(1) cancellation. Cancelled entries stay in
//! the heap and are discarded when they surface (lazy deletion); the heap is
//! never re-sifted on cancel.

use std::collections::{BinaryHeap, HashSet};
use std::cmp::Ordering;

use crate::core::time::SimTime;
use crate::events::Event;
use crate::scheduler::SchedulingError;

/// Heap adapter reversing the key comparison.
///
/// `BinaryHeap` is a max-heap; the earliest key must surface first.
struct HeapEntry<S>(Event<S>);

impl<S> Ord for HeapEntry<S> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.key().cmp(&other.0.key()).reverse()
    }
}

impl<S> PartialOrd for HeapEntry<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S> PartialEq for HeapEntry<S> {
    fn eq(&self, other: &Self) -> bool {
        self.0.key() == other.0.key()
    }
}

impl<S> Eq for HeapEntry<S> {}

/// Priority-ordered set of pending events.
///
/// Empty at run start, empty again at run termination. Ids are unique within
/// a run, so the pop order is fully determined by the event keys.
pub struct FutureEventSet<S> {
    heap: BinaryHeap<HeapEntry<S>>,
    live: HashSet<u64>,
    cancelled: u64,
}

impl<S> FutureEventSet<S> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashSet::new(),
            cancelled: 0,
        }
    }

    /// Number of live (not cancelled) pending events.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// True if no live event is pending.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Total cancellations observed over the lifetime of the set.
    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }

    /// Insert an event due at or after `now`.
    ///
    /// O(log n). Scheduling into the past is refused; the caller treats that
    /// as fatal.
    pub fn insert(&mut self, event: Event<S>, now: SimTime) -> Result<(), SchedulingError> {
        if event.due_at() < now {
            return Err(SchedulingError::BackInTime {
                requested: event.due_at(),
                now,
            });
        }
        self.live.insert(event.id());
        self.heap.push(HeapEntry(event));
        Ok(())
    }

    /// Remove and return the smallest live event.
    ///
    /// Cancelled entries encountered on the way are dropped silently. O(log n)
    /// amortized over the cancelled backlog.
    pub fn pop_min(&mut self) -> Option<Event<S>> {
        while let Some(HeapEntry(event)) = self.heap.pop() {
            if self.live.remove(&event.id()) {
                return Some(event);
            }
            // stale entry for a cancelled event, skip
        }
        None
    }

    /// Mark the event with `id` as cancelled.
    ///
    /// O(1). Returns whether a live event was actually cancelled; cancelling
    /// an unknown, fired, or already-cancelled id is a no-op.
    pub fn cancel(&mut self, id: u64) -> bool {
        let was_live = self.live.remove(&id);
        if was_live {
            self.cancelled += 1;
        }
        was_live
    }

    /// Drop all pending events. The cancellation counter is preserved.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }
}

impl<S> Default for FutureEventSet<S> {
    fn default() -> Self {
        Self::new()
    }
}
