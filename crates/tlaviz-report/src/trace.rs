//! Counterexample trace reconstruction.
//!
//! A [`CounterExample`] only carries state ids. [`reconstruct_trace`] links
//! those ids back to the states and transitions of the run, producing
//! numbered [`TraceStep`]s with the action that led into each state.

use tlaviz_core::model::{CounterExample, RunResults, StateId};

/// Action label of the first step of every trace.
pub const INITIAL_ACTION: &str = "Initial";

/// One resolved step of a counterexample trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    /// 0-based position among the resolved steps.
    pub step_number: usize,

    /// Id of the state shown at this step.
    pub state_id: StateId,

    /// The state's one-line description.
    pub state_description: String,

    /// Action that led into this state. [`INITIAL_ACTION`] for step 0, empty
    /// when no transition targets the state.
    pub action: String,

    /// Variables copied from the state, in stored order.
    pub variables: Vec<(String, String)>,
}

/// Rebuilds the steps of `counterexample` against `results`.
///
/// Ids with no matching state are skipped and do not consume a step number.
pub fn reconstruct_trace(counterexample: &CounterExample, results: &RunResults) -> Vec<TraceStep> {
    let mut steps = Vec::with_capacity(counterexample.len());

    for &state_id in &counterexample.state_sequence {
        let Some(state) = results.state(state_id) else {
            continue;
        };

        let step_number = steps.len();
        let action = if step_number == 0 {
            INITIAL_ACTION.to_string()
        } else {
            results
                .first_transition_into(state_id)
                .map(|t| t.action.clone())
                .unwrap_or_default()
        };

        steps.push(TraceStep {
            step_number,
            state_id,
            state_description: state.description.clone(),
            action,
            variables: state.variables.clone(),
        });
    }

    steps
}

/// A reconstructed trace with a cursor, for stepping through it.
#[derive(Debug, Clone, Default)]
pub struct TraceView {
    steps: Vec<TraceStep>,
    current_step: usize,
}

impl TraceView {
    /// Creates an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a view over the trace of `counterexample`.
    pub fn load(counterexample: &CounterExample, results: &RunResults) -> Self {
        Self::from_steps(reconstruct_trace(counterexample, results))
    }

    /// Wraps already reconstructed steps.
    pub fn from_steps(steps: Vec<TraceStep>) -> Self {
        TraceView {
            steps,
            current_step: 0,
        }
    }

    /// Drops all steps and rewinds the cursor.
    pub fn clear(&mut self) {
        self.steps.clear();
        self.current_step = 0;
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Moves the cursor. Out-of-range values are ignored.
    ///
    /// Returns true if the cursor moved.
    pub fn set_current_step(&mut self, step: usize) -> bool {
        if step == self.current_step || step >= self.steps.len() {
            return false;
        }
        self.current_step = step;
        true
    }

    /// The step under the cursor.
    pub fn current(&self) -> Option<&TraceStep> {
        self.steps.get(self.current_step)
    }

    pub fn step_details(&self, step: usize) -> Option<&TraceStep> {
        self.steps.get(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlaviz_core::model::{State, Transition};

    fn sample_results() -> RunResults {
        let mut results = RunResults::default();
        results.insert_state(State::new(1, "Initial predicate").with_variable("x", "0"));
        results.insert_state(
            State::new(2, "<Inc line 8>")
                .with_variable("x", "1")
                .with_variable("y", "TRUE"),
        );
        results.insert_state(State::new(3, "<Dec line 12>").with_variable("x", "0"));
        results.transitions.push(Transition::new(1, 2, "Inc"));
        results.transitions.push(Transition::new(3, 2, "Reset"));
        results.transitions.push(Transition::new(2, 3, "Dec"));
        results
    }

    #[test]
    fn test_empty_sequence_yields_no_steps() {
        let steps = reconstruct_trace(&CounterExample::default(), &sample_results());
        assert!(steps.is_empty());
    }

    #[test]
    fn test_missing_state_is_skipped() {
        let ce = CounterExample::new([1u64, 2, 4], "violation");
        let steps = reconstruct_trace(&ce, &sample_results());

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].state_id, StateId(1));
        assert_eq!(steps[0].action, INITIAL_ACTION);
        assert_eq!(steps[1].state_id, StateId(2));
        assert_eq!(steps[1].step_number, 1);
        assert_eq!(steps[1].action, "Inc");
    }

    #[test]
    fn test_missing_state_does_not_consume_step_number() {
        let ce = CounterExample::new([9u64, 1, 9, 3], "violation");
        let steps = reconstruct_trace(&ce, &sample_results());

        let numbers: Vec<_> = steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![0, 1]);
        assert_eq!(steps[0].action, INITIAL_ACTION);
        assert_eq!(steps[1].action, "Dec");
    }

    #[test]
    fn test_first_step_is_initial_even_with_inbound_transition() {
        let ce = CounterExample::new([2u64, 3], "violation");
        let steps = reconstruct_trace(&ce, &sample_results());
        assert_eq!(steps[0].action, INITIAL_ACTION);
    }

    #[test]
    fn test_no_inbound_transition_leaves_action_empty() {
        let ce = CounterExample::new([3u64, 1], "violation");
        let steps = reconstruct_trace(&ce, &sample_results());
        assert_eq!(steps[1].action, "");
    }

    #[test]
    fn test_variables_are_copied() {
        let results = sample_results();
        let ce = CounterExample::new([1u64, 2], "violation");
        let mut steps = reconstruct_trace(&ce, &results);

        steps[1].variables[0].1 = "changed".to_string();
        assert_eq!(results.state(StateId(2)).unwrap().variable("x"), Some("1"));
        assert_eq!(
            steps[1].variables,
            vec![
                ("x".to_string(), "changed".to_string()),
                ("y".to_string(), "TRUE".to_string())
            ]
        );
    }

    #[test]
    fn test_trace_view_cursor() {
        let ce = CounterExample::new([1u64, 2, 3], "violation");
        let mut view = TraceView::load(&ce, &sample_results());

        assert_eq!(view.step_count(), 3);
        assert_eq!(view.current_step(), 0);
        assert!(!view.set_current_step(0));
        assert!(view.set_current_step(2));
        assert_eq!(view.current().unwrap().state_id, StateId(3));
        assert!(!view.set_current_step(3));
        assert_eq!(view.current_step(), 2);

        assert_eq!(view.step_details(1).unwrap().action, "Inc");
        assert!(view.step_details(5).is_none());

        view.clear();
        assert!(view.is_empty());
        assert_eq!(view.current_step(), 0);
        assert!(view.current().is_none());
    }
}
