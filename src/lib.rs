//! Discrete-Event Simulation Core - Rust Engine
//!
//! Deterministic event-scheduling engine: virtual clock, priority-ordered
//! future-event set, scheduling API, dispatch loop, and seeded RNG streams.
//!
//! # Architecture
//!
//! - **core**: simulation time and the virtual clock
//! - **events**: event records, handles, the total ordering contract
//! - **fes**: the future-event set (min-heap with lazy cancellation)
//! - **scheduler**: the scheduling API actions program against
//! - **orchestrator**: run controller, dispatch loop, warm-up and snaps
//! - **rng**: named, seeded, independent random substreams
//! - **observe**: observation hooks, snap reporters, log sinks
//!
//! # Critical Invariants
//!
//! 1. Time is u64 ticks; the clock never decreases
//! 2. Dispatch order is the total order on `(due_at, priority, id)`
//! 3. All randomness flows through named seeded streams
//! 4. Same config + same master seed = identical dispatch sequence

// Module declarations
pub mod core;
pub mod events;
pub mod fes;
pub mod observe;
pub mod orchestrator;
pub mod rng;
pub mod scheduler;

// Re-exports for convenience
pub use crate::core::time::{Clock, SimTime};
pub use events::{Action, ActionError, Event, EventHandle, EventKey};
pub use fes::FutureEventSet;
pub use observe::log::{ChannelLogSink, LogLine, LogSink, Severity, TracingLogSink};
pub use observe::{HookRunner, ObservationHook, Reporter, SnapMetrics};
pub use orchestrator::{
    Model, RunConfig, RunController, RunOutcome, RunReport, RunState, SimulationError, StepStatus,
};
pub use rng::{RngStream, RngStreams};
pub use scheduler::{Scheduler, SchedulingError};
