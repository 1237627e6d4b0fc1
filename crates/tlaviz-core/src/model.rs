//! Data model for a single TLC run.
//!
//! A run is described by one [`RunResults`] aggregate. States, transitions,
//! invariants and counterexamples are recovered from the checker's textual
//! output; the generated/distinct counts are reported by the checker itself
//! and are kept as independent facts (they are never reconciled against the
//! number of [`State`]s that happened to be printed).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Identifier of a state, unique within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(pub u64);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StateId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Unique identifier of an accepted model-check job.
///
/// Minted once per accepted start so that log lines from the caller and the
/// background worker can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Creates a new random job id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a model-check job.
///
/// Transitions are `NotStarted -> Running -> {Completed, Failed, Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JobStatus {
    /// No job has been started yet.
    #[default]
    NotStarted,

    /// A job is executing in the background.
    Running,

    /// The checker exited and reported no errors.
    Completed,

    /// The job could not run, or the checker reported errors.
    Failed,

    /// Cancellation was requested while the job was running.
    Cancelled,
}

impl JobStatus {
    /// Returns true for `Completed`, `Failed` and `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Stable integer code used by the persisted result snapshot.
    pub fn code(&self) -> u8 {
        match self {
            JobStatus::NotStarted => 0,
            JobStatus::Running => 1,
            JobStatus::Completed => 2,
            JobStatus::Failed => 3,
            JobStatus::Cancelled => 4,
        }
    }

    /// Inverse of [`JobStatus::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(JobStatus::NotStarted),
            1 => Some(JobStatus::Running),
            2 => Some(JobStatus::Completed),
            3 => Some(JobStatus::Failed),
            4 => Some(JobStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::NotStarted => write!(f, "NotStarted"),
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Completed => write!(f, "Completed"),
            JobStatus::Failed => write!(f, "Failed"),
            JobStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// A reachable configuration discovered by the checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Identifier, unique within the run.
    pub id: StateId,

    /// Free-text description (the trace header text for TLC).
    pub description: String,

    /// Variable snapshot as `(name, value)` pairs, in order of appearance.
    pub variables: Vec<(String, String)>,
}

impl State {
    /// Creates a state with no variables.
    pub fn new(id: impl Into<StateId>, description: impl Into<String>) -> Self {
        State {
            id: id.into(),
            description: description.into(),
            variables: Vec::new(),
        }
    }

    /// Appends a variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }

    /// Returns the value of the first variable called `name`.
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Directed, labelled edge between two states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Source state.
    pub from_state: StateId,

    /// Target state.
    pub to_state: StateId,

    /// Name of the action that was taken.
    pub action: String,
}

impl Transition {
    /// Creates a new transition.
    pub fn new(
        from_state: impl Into<StateId>,
        to_state: impl Into<StateId>,
        action: impl Into<String>,
    ) -> Self {
        Transition {
            from_state: from_state.into(),
            to_state: to_state.into(),
            action: action.into(),
        }
    }
}

/// Outcome of checking one invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invariant {
    /// Invariant name as written in the specification.
    pub name: String,

    /// Whether the invariant held.
    pub passed: bool,

    /// Checker message for a violation, empty otherwise.
    pub error_message: String,

    /// State at which the violation was observed. Only meaningful when
    /// `passed` is false.
    pub error_state_id: Option<StateId>,
}

impl Invariant {
    /// Creates a passing invariant.
    pub fn passed(name: impl Into<String>) -> Self {
        Invariant {
            name: name.into(),
            passed: true,
            error_message: String::new(),
            error_state_id: None,
        }
    }

    /// Creates a violated invariant.
    pub fn violated(name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Invariant {
            name: name.into(),
            passed: false,
            error_message: error_message.into(),
            error_state_id: None,
        }
    }

    /// Sets the state at which the violation was observed.
    pub fn at_state(mut self, id: impl Into<StateId>) -> Self {
        self.error_state_id = Some(id.into());
        self
    }
}

/// A violation witness: an ordered path of state ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterExample {
    /// Visited states, the first being an initial state.
    pub state_sequence: Vec<StateId>,

    /// Human-readable description.
    pub description: String,
}

impl CounterExample {
    /// Creates a counterexample from a sequence of ids.
    pub fn new(
        state_sequence: impl IntoIterator<Item = impl Into<StateId>>,
        description: impl Into<String>,
    ) -> Self {
        CounterExample {
            state_sequence: state_sequence.into_iter().map(Into::into).collect(),
            description: description.into(),
        }
    }

    /// Number of states in the witness.
    pub fn len(&self) -> usize {
        self.state_sequence.len()
    }

    /// Returns true if the witness has no states.
    pub fn is_empty(&self) -> bool {
        self.state_sequence.is_empty()
    }
}

/// Aggregate result of one model-check run.
///
/// Readers always receive a whole snapshot; a job publishes a new value
/// rather than mutating a shared one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    /// Status of the job that produced these results.
    pub status: JobStatus,

    /// Job that produced these results.
    pub job_id: Option<JobId>,

    /// Wall-clock start of the job.
    pub started_at: Option<DateTime<Utc>>,

    /// States recovered from the output, keyed by id.
    pub states: BTreeMap<StateId, State>,

    /// Transitions in the order they were recovered.
    pub transitions: Vec<Transition>,

    /// Invariant outcomes.
    pub invariants: Vec<Invariant>,

    /// Violation witnesses.
    pub counterexamples: Vec<CounterExample>,

    /// Total states generated, as reported by the checker.
    pub states_generated: u64,

    /// Distinct states, as reported by the checker.
    pub distinct_states: u64,

    /// Seconds from just before spawn to just after exit.
    pub execution_time_seconds: f64,

    /// Accumulated error text, one line per error.
    pub error_message: String,

    /// Process exit code, when the process ran to completion.
    pub exit_code: Option<i32>,

    /// Captured stdout followed by stderr.
    pub raw_output: Option<String>,
}

impl RunResults {
    /// Empty results for a job that has just entered `Running`.
    pub fn running(job_id: JobId, started_at: DateTime<Utc>) -> Self {
        RunResults {
            status: JobStatus::Running,
            job_id: Some(job_id),
            started_at: Some(started_at),
            ..Default::default()
        }
    }

    /// Looks up a state by id.
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(&id)
    }

    /// Inserts a state, replacing any previous state with the same id.
    pub fn insert_state(&mut self, state: State) {
        self.states.insert(state.id, state);
    }

    /// First transition, in stored order, whose target is `id`.
    pub fn first_transition_into(&self, id: StateId) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.to_state == id)
    }

    /// Returns true if any error text was recorded.
    pub fn has_errors(&self) -> bool {
        !self.error_message.is_empty()
    }

    /// Invariants that did not hold.
    pub fn violated_invariants(&self) -> impl Iterator<Item = &Invariant> {
        self.invariants.iter().filter(|inv| !inv.passed)
    }
}

impl fmt::Display for RunResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RunResults {{ status: {}, generated: {}, distinct: {}, time: {:.3}s",
            self.status, self.states_generated, self.distinct_states, self.execution_time_seconds
        )?;

        if !self.counterexamples.is_empty() {
            write!(f, ", counterexamples: {}", self.counterexamples.len())?;
        }

        write!(f, " }}")
    }
}
