//! Run controller: the dispatch loop and run lifecycle.
//!
//! See `engine.rs` for the implementation.

pub mod engine;

pub use engine::{
    Model, RunConfig, RunController, RunOutcome, RunReport, RunState, SimulationError, StepStatus,
};
