//! tlaviz Core - shared types for driving the TLC model checker.
//!
//! This crate defines the data that flows between the job orchestrator, the
//! output parser and the presentation layers:
//!
//! - [`model`]: states, transitions, invariants, counterexamples and the
//!   [`RunResults`] aggregate
//! - [`error`]: the [`JobError`] taxonomy resolved into a job's terminal status
//!
//! # Example
//!
//! ```
//! use tlaviz_core::model::{CounterExample, RunResults, State, StateId, Transition};
//!
//! let mut results = RunResults::default();
//! results.insert_state(State::new(1, "Initial predicate").with_variable("x", "0"));
//! results.insert_state(State::new(2, "Next").with_variable("x", "1"));
//! results.transitions.push(Transition::new(1, 2, "Next"));
//! results.counterexamples.push(CounterExample::new([1u64, 2], "x exceeded bound"));
//!
//! assert_eq!(results.first_transition_into(StateId(2)).unwrap().action, "Next");
//! ```

pub mod error;
pub mod model;

pub use error::JobError;
pub use model::{
    CounterExample, Invariant, JobId, JobStatus, RunResults, State, StateId, Transition,
};
