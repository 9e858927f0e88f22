//! Simulation time and the virtual clock
//!
//! The simulation operates on a virtual timeline measured in integer ticks.
//! The clock only ever moves forward; the dispatcher advances it to the due
//! time of the event it is about to fire.
//!
//! CRITICAL: all time values are u64 ticks. Integer time keeps comparisons
//! exact, which the event ordering contract depends on.

/// Simulation time in canonical ticks since run start.
pub type SimTime = u64;

/// Monotonic virtual clock.
///
/// Starts at 0. Only the dispatcher may advance it; everything else reads it
/// through [`Clock::now`].
///
/// # Example
/// ```
/// use des_simulator_core_rs::core::time::Clock;
///
/// let mut clock = Clock::new();
/// assert_eq!(clock.now(), 0);
///
/// clock.advance_to(10);
/// assert_eq!(clock.now(), 10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Clock {
    now: SimTime,
}

impl Clock {
    /// Create a clock positioned at t = 0.
    pub fn new() -> Self {
        Self { now: 0 }
    }

    /// Current simulation time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Advance the clock to `t`.
    ///
    /// Advancing to the current time is a no-op. Moving backwards is an
    /// engine bug, not a model error, and panics.
    ///
    /// # Panics
    /// Panics if `t < now`.
    pub fn advance_to(&mut self, t: SimTime) {
        assert!(
            t >= self.now,
            "clock cannot move backwards: now={}, requested={}",
            self.now,
            t
        );
        self.now = t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_zero() {
        let clock = Clock::new();
        assert_eq!(clock.now(), 0);
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut clock = Clock::new();
        clock.advance_to(5);
        clock.advance_to(5); // same instant is allowed
        clock.advance_to(17);
        assert_eq!(clock.now(), 17);
    }

    #[test]
    #[should_panic(expected = "clock cannot move backwards")]
    fn test_advance_backwards_panics() {
        let mut clock = Clock::new();
        clock.advance_to(10);
        clock.advance_to(9);
    }
}
