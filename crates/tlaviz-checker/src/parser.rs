//! TLC output parsing.
//!
//! The checker's output has no formal grammar, so parsing is done in two
//! layers. Each line is first run through a fixed set of independent
//! classifiers, each of which either recognises one kind of fact or returns
//! `None`. The resulting [`LineMatch`]es are then folded into a
//! [`RunResults`]: counts and error lines go straight into the aggregate, and
//! trace-related matches drive a small builder that recovers states,
//! transitions, violated invariants and counterexamples.
//!
//! Parsing is total: unrecognised lines are ignored and an input without any
//! known marker yields zero counts and empty error text.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tlaviz_core::model::{CounterExample, Invariant, RunResults, State, StateId, Transition};
use tracing::debug;

static STATES_GENERATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+states\s+generated").expect("states generated regex is valid")
});

static DISTINCT_STATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+distinct\s+states").expect("distinct states regex is valid")
});

static INVARIANT_VIOLATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Invariant\s+"?([A-Za-z_][\w!]*)"?\s+is\s+violated"#)
        .expect("invariant regex is valid")
});

static STATE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^State\s+(\d+):\s*(.*)$").expect("state header regex is valid")
});

// `-tool` mode drops the "State" prefix.
static TOOL_STATE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+):\s*(<.*>|Stuttering.*|Back to state.*)$")
        .expect("tool state header regex is valid")
});

static BACK_TO_STATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Back to state:?\s*(\d+)").expect("back to state regex is valid")
});

static CONJUNCT_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/\\\s*([A-Za-z_][\w]*)\s*=\s*(.*)$").expect("conjunct regex is valid")
});

static BARE_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][\w]*)\s*=\s*(.*)$").expect("assignment regex is valid")
});

const ERROR_MARKER: &str = "Error:";
const TOOL_MESSAGE_MARKER: &str = "@!@!@";
const INITIAL_PREDICATE: &str = "Initial predicate";
const STUTTERING: &str = "Stuttering";
const BACK_TO_STATE_ACTION: &str = "Back to state";

/// One recognised fact on a line of checker output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMatch<'a> {
    /// `<n> states generated`.
    StatesGenerated(u64),

    /// `<n> distinct states`.
    DistinctStates(u64),

    /// A line containing `Error:`; carries the full line.
    Error(&'a str),

    /// `Invariant <name> is violated`.
    InvariantViolated(&'a str),

    /// Start of a trace state block.
    StateHeader {
        /// Position of the state in its trace, as printed (1-based).
        number: u64,
        /// Text after the colon.
        header: &'a str,
    },

    /// A variable assignment inside a state block.
    Assignment {
        name: &'a str,
        value: &'a str,
        /// Whether the line used the `/\ name = value` conjunct form.
        conjunct: bool,
    },

    /// `-tool` mode message delimiter.
    ToolMessage,

    /// An empty line.
    Blank,
}

type Classifier = for<'a> fn(&'a str) -> Option<LineMatch<'a>>;

const CLASSIFIERS: &[Classifier] = &[
    classify_states_generated,
    classify_distinct_states,
    classify_error,
    classify_invariant_violation,
    classify_state_header,
    classify_assignment,
    classify_tool_message,
    classify_blank,
];

fn first_count(re: &Regex, line: &str) -> Option<u64> {
    re.captures(line)?.get(1)?.as_str().parse().ok()
}

fn classify_states_generated(line: &str) -> Option<LineMatch<'_>> {
    first_count(&STATES_GENERATED, line).map(LineMatch::StatesGenerated)
}

fn classify_distinct_states(line: &str) -> Option<LineMatch<'_>> {
    first_count(&DISTINCT_STATES, line).map(LineMatch::DistinctStates)
}

fn classify_error(line: &str) -> Option<LineMatch<'_>> {
    line.contains(ERROR_MARKER).then_some(LineMatch::Error(line))
}

fn classify_invariant_violation(line: &str) -> Option<LineMatch<'_>> {
    let caps = INVARIANT_VIOLATED.captures(line)?;
    Some(LineMatch::InvariantViolated(caps.get(1)?.as_str()))
}

fn classify_state_header(line: &str) -> Option<LineMatch<'_>> {
    let trimmed = line.trim();
    let caps = STATE_HEADER
        .captures(trimmed)
        .or_else(|| TOOL_STATE_HEADER.captures(trimmed))?;
    let number = caps.get(1)?.as_str().parse().ok()?;
    let header = caps.get(2).map_or("", |m| m.as_str().trim());
    Some(LineMatch::StateHeader { number, header })
}

fn classify_assignment(line: &str) -> Option<LineMatch<'_>> {
    let trimmed = line.trim();
    if let Some(caps) = CONJUNCT_ASSIGNMENT.captures(trimmed) {
        return Some(LineMatch::Assignment {
            name: caps.get(1)?.as_str(),
            value: caps.get(2)?.as_str().trim(),
            conjunct: true,
        });
    }
    // Indented `x = 1` is a continuation of a record, not a new variable.
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let caps = BARE_ASSIGNMENT.captures(trimmed)?;
    Some(LineMatch::Assignment {
        name: caps.get(1)?.as_str(),
        value: caps.get(2)?.as_str().trim(),
        conjunct: false,
    })
}

fn classify_tool_message(line: &str) -> Option<LineMatch<'_>> {
    line.trim_start()
        .starts_with(TOOL_MESSAGE_MARKER)
        .then_some(LineMatch::ToolMessage)
}

fn classify_blank(line: &str) -> Option<LineMatch<'_>> {
    line.trim().is_empty().then_some(LineMatch::Blank)
}

/// Runs every classifier over `line` and returns all matches, in classifier
/// order.
pub fn classify_line(line: &str) -> Vec<LineMatch<'_>> {
    CLASSIFIERS.iter().filter_map(|classify| classify(line)).collect()
}

/// Parses the full captured output of one checker run.
///
/// The returned results carry counts, error text, states, transitions,
/// invariants and counterexamples. Status, timing and job metadata are left
/// at their defaults for the caller to fill in.
pub fn parse_output(raw: &str) -> RunResults {
    let mut results = RunResults::default();
    let mut traces = TraceBuilder::default();

    for line in raw.lines() {
        let matches = classify_line(line);
        if matches.is_empty() {
            traces.unmatched(line);
            continue;
        }

        for m in matches {
            match m {
                LineMatch::StatesGenerated(n) => {
                    results.states_generated = n;
                    traces.end_trace(&mut results);
                }
                LineMatch::DistinctStates(n) => {
                    results.distinct_states = n;
                    traces.end_trace(&mut results);
                }
                LineMatch::Error(text) => {
                    results.error_message.push_str(text);
                    results.error_message.push('\n');
                    traces.error(text, &mut results);
                }
                LineMatch::InvariantViolated(name) => {
                    traces.invariant_violated(name, line, &mut results);
                }
                LineMatch::StateHeader { number, header } => {
                    traces.state_header(number, header, &mut results);
                }
                LineMatch::Assignment { name, value, .. } => traces.assignment(name, value),
                LineMatch::ToolMessage | LineMatch::Blank => traces.end_state(&mut results),
            }
        }
    }

    traces.end_trace(&mut results);

    debug!(
        states_generated = results.states_generated,
        distinct_states = results.distinct_states,
        states = results.states.len(),
        transitions = results.transitions.len(),
        counterexamples = results.counterexamples.len(),
        "Parsed TLC output"
    );

    results
}

/// A trace that is still being read.
#[derive(Debug, Default)]
struct OpenTrace {
    description: String,
    sequence: Vec<StateId>,
    /// Printed position -> assigned id, for lasso back-references.
    by_number: HashMap<u64, StateId>,
}

/// Accumulates trace states across lines.
#[derive(Debug)]
struct TraceBuilder {
    next_id: u64,
    trace: Option<OpenTrace>,
    state: Option<State>,
    /// Description of the most recent error, used for the next trace.
    pending_description: Option<String>,
    /// Violated invariant waiting for the state its trace ends in.
    pending_invariant: Option<usize>,
}

impl Default for TraceBuilder {
    fn default() -> Self {
        TraceBuilder {
            next_id: 1,
            trace: None,
            state: None,
            pending_description: None,
            pending_invariant: None,
        }
    }
}

impl TraceBuilder {
    fn error(&mut self, line: &str, results: &mut RunResults) {
        // A new error closes whatever trace preceded it.
        self.end_trace(results);
        let text = line
            .split_once(ERROR_MARKER)
            .map_or(line, |(_, rest)| rest)
            .trim();
        self.pending_description = Some(text.to_string());
    }

    fn invariant_violated(&mut self, name: &str, line: &str, results: &mut RunResults) {
        results
            .invariants
            .push(Invariant::violated(name, line.trim()));
        self.pending_invariant = Some(results.invariants.len() - 1);
    }

    fn state_header(&mut self, number: u64, header: &str, results: &mut RunResults) {
        self.end_state(results);

        let restart = number == 1
            && self
                .trace
                .as_ref()
                .is_some_and(|trace| !trace.sequence.is_empty());
        if restart {
            self.end_trace(results);
        }

        let description = self
            .pending_description
            .take()
            .unwrap_or_else(|| "Counterexample".to_string());
        let trace = self.trace.get_or_insert_with(|| OpenTrace {
            description,
            ..Default::default()
        });
        let previous = trace.sequence.last().copied();

        if let Some(caps) = BACK_TO_STATE.captures(header) {
            let target = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .and_then(|n| trace.by_number.get(&n).copied());
            if let (Some(from), Some(to)) = (previous, target) {
                results
                    .transitions
                    .push(Transition::new(from, to, BACK_TO_STATE_ACTION));
                trace.sequence.push(to);
            }
            return;
        }

        let id = StateId(self.next_id);
        self.next_id += 1;
        trace.by_number.insert(number, id);
        trace.sequence.push(id);

        let (description, action) = if header.starts_with(STUTTERING) {
            (STUTTERING.to_string(), STUTTERING.to_string())
        } else {
            let inner = header
                .strip_prefix('<')
                .and_then(|h| h.strip_suffix('>'))
                .unwrap_or(header)
                .trim();
            let action = inner.split_whitespace().next().unwrap_or_default();
            (inner.to_string(), action.to_string())
        };

        if let Some(from) = previous {
            if description != INITIAL_PREDICATE {
                results.transitions.push(Transition::new(from, id, action));
            }
        }

        let mut state = State::new(id, description);
        // A stuttering step repeats the previous assignment.
        if state.description == STUTTERING {
            if let Some(prev) = previous.and_then(|p| results.state(p)) {
                state.variables = prev.variables.clone();
            }
        }
        self.state = Some(state);
    }

    fn assignment(&mut self, name: &str, value: &str) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if let Some(existing) = state.variables.iter_mut().find(|(n, _)| n == name) {
            existing.1 = value.to_string();
        } else {
            state.variables.push((name.to_string(), value.to_string()));
        }
    }

    /// Folds an indented, otherwise unrecognised line into the last value.
    fn unmatched(&mut self, line: &str) {
        if !line.starts_with(char::is_whitespace) {
            return;
        }
        if let Some((_, value)) = self.state.as_mut().and_then(|s| s.variables.last_mut()) {
            value.push(' ');
            value.push_str(line.trim());
        }
    }

    fn end_state(&mut self, results: &mut RunResults) {
        if let Some(state) = self.state.take() {
            results.insert_state(state);
        }
    }

    fn end_trace(&mut self, results: &mut RunResults) {
        self.end_state(results);
        let Some(trace) = self.trace.take() else {
            return;
        };
        let Some(last) = trace.sequence.last().copied() else {
            return;
        };

        if let Some(index) = self.pending_invariant.take() {
            if let Some(invariant) = results.invariants.get_mut(index) {
                invariant.error_state_id = Some(last);
            }
        }

        results
            .counterexamples
            .push(CounterExample::new(trace.sequence, trace.description));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIOLATION_OUTPUT: &str = r#"TLC2 Version 2.18 of Day Month 20??
Running breadth-first search Model-Checking with fp 1 and seed 42
Error: Invariant Bounded is violated.
Error: The behavior up to this point is:
State 1: <Initial predicate>
/\ x = 0
/\ y = "idle"

State 2: <Inc line 8, col 8 to line 9, col 20 of module Counter>
/\ x = 1
/\ y = "busy"

State 3: <Inc line 8, col 8 to line 9, col 20 of module Counter>
/\ x = 2
/\ y = "busy"

7 states generated, 5 distinct states found, 1 states left on queue.
The depth of the complete state graph search is 3.
"#;

    #[test]
    fn test_counts_from_single_line() {
        let results = parse_output("142 states generated, 97 distinct states\n");
        assert_eq!(results.states_generated, 142);
        assert_eq!(results.distinct_states, 97);
        assert_eq!(results.error_message, "");
    }

    #[test]
    fn test_error_line_is_accumulated() {
        let results = parse_output("Starting\nError: Invariant violated at state 5\nDone\n");
        assert!(results
            .error_message
            .contains("Error: Invariant violated at state 5"));
    }

    #[test]
    fn test_error_lines_keep_encounter_order() {
        let results = parse_output("Error: first\nnoise\nError: second\n");
        assert_eq!(results.error_message, "Error: first\nError: second\n");
    }

    #[test]
    fn test_last_count_wins() {
        let raw = "Progress(1): 10 states generated, 8 distinct states found\n\
                   Progress(2): 40 states generated, 30 distinct states found\n";
        let results = parse_output(raw);
        assert_eq!(results.states_generated, 40);
        assert_eq!(results.distinct_states, 30);
    }

    #[test]
    fn test_unrelated_numbers_do_not_misfire() {
        let raw = "Finished in 12s at (2024-01-01 10:00:00)\n\
                   Progress(3) at 2024-01-01: 55 states generated (1,200 s/min)\n";
        let results = parse_output(raw);
        assert_eq!(results.states_generated, 55);
        assert_eq!(results.distinct_states, 0);
    }

    #[test]
    fn test_malformed_input_yields_zero_result() {
        let results = parse_output("garbage\n\u{0}\n  ???\n");
        assert_eq!(results.states_generated, 0);
        assert_eq!(results.distinct_states, 0);
        assert!(results.error_message.is_empty());
        assert!(results.states.is_empty());
        assert!(results.counterexamples.is_empty());

        let empty = parse_output("");
        assert_eq!(empty, RunResults::default());
    }

    #[test]
    fn test_classify_line_reports_every_match() {
        let matches = classify_line("142 states generated, 97 distinct states");
        assert_eq!(
            matches,
            vec![LineMatch::StatesGenerated(142), LineMatch::DistinctStates(97)]
        );

        let matches = classify_line("Error: Invariant Inv is violated.");
        assert_eq!(
            matches,
            vec![
                LineMatch::Error("Error: Invariant Inv is violated."),
                LineMatch::InvariantViolated("Inv"),
            ]
        );

        assert!(classify_line("nothing to see").is_empty());
    }

    #[test]
    fn test_classify_state_headers() {
        assert_eq!(
            classify_line("State 2: <Next line 3, col 1 to line 4, col 9 of module M>"),
            vec![LineMatch::StateHeader {
                number: 2,
                header: "<Next line 3, col 1 to line 4, col 9 of module M>",
            }]
        );
        assert_eq!(
            classify_line("1: <Initial predicate>"),
            vec![LineMatch::StateHeader {
                number: 1,
                header: "<Initial predicate>",
            }]
        );
        // A bare number prefix without a trace header is not a state.
        assert!(classify_line("3: something else").is_empty());
    }

    #[test]
    fn test_counterexample_trace_is_recovered() {
        let results = parse_output(VIOLATION_OUTPUT);

        assert_eq!(results.states_generated, 7);
        assert_eq!(results.distinct_states, 5);
        assert_eq!(results.states.len(), 3);

        let first = results.state(StateId(1)).unwrap();
        assert_eq!(first.description, "Initial predicate");
        assert_eq!(
            first.variables,
            vec![
                ("x".to_string(), "0".to_string()),
                ("y".to_string(), "\"idle\"".to_string()),
            ]
        );

        assert_eq!(
            results.transitions,
            vec![Transition::new(1, 2, "Inc"), Transition::new(2, 3, "Inc")]
        );

        assert_eq!(results.counterexamples.len(), 1);
        let ce = &results.counterexamples[0];
        assert_eq!(ce.state_sequence, vec![StateId(1), StateId(2), StateId(3)]);
        assert_eq!(ce.description, "The behavior up to this point is:");

        assert_eq!(results.invariants.len(), 1);
        let inv = &results.invariants[0];
        assert_eq!(inv.name, "Bounded");
        assert!(!inv.passed);
        assert_eq!(inv.error_state_id, Some(StateId(3)));
    }

    #[test]
    fn test_tool_mode_trace() {
        let raw = "@!@!@STARTMSG 2110:1 @!@!@\n\
                   Invariant Safe is violated.\n\
                   @!@!@ENDMSG 2110 @!@!@\n\
                   @!@!@STARTMSG 2217:4 @!@!@\n\
                   1: <Initial predicate>\n\
                   x = 0\n\
                   @!@!@ENDMSG 2217 @!@!@\n\
                   @!@!@STARTMSG 2217:4 @!@!@\n\
                   2: <Step line 5, col 1 to line 5, col 12 of module M>\n\
                   x = 1\n\
                   @!@!@ENDMSG 2217 @!@!@\n";
        let results = parse_output(raw);

        assert_eq!(results.states.len(), 2);
        assert_eq!(results.state(StateId(2)).unwrap().variable("x"), Some("1"));
        assert_eq!(results.transitions, vec![Transition::new(1, 2, "Step")]);
        assert_eq!(results.invariants[0].name, "Safe");
        assert_eq!(results.invariants[0].error_state_id, Some(StateId(2)));
        // No "Error:" marker, so no error text.
        assert!(results.error_message.is_empty());
    }

    #[test]
    fn test_multiline_values_are_folded() {
        let raw = "State 1: <Initial predicate>\n\
                   /\\ msgs = [ a |-> 1,\n\
                   \x20    b |-> 2 ]\n\
                   /\\ n = 0\n";
        let results = parse_output(raw);
        let state = results.state(StateId(1)).unwrap();
        assert_eq!(state.variable("msgs"), Some("[ a |-> 1, b |-> 2 ]"));
        assert_eq!(state.variable("n"), Some("0"));
    }

    #[test]
    fn test_lasso_and_stuttering() {
        let raw = "Error: Temporal properties were violated.\n\
                   State 1: <Initial predicate>\n\
                   /\\ x = 0\n\
                   \n\
                   State 2: <Tick line 4, col 1 to line 4, col 10 of module L>\n\
                   /\\ x = 1\n\
                   \n\
                   State 3: Back to state 1: <Tick line 4, col 1 to line 4, col 10 of module L>\n\
                   \n\
                   Error: Temporal properties were violated again.\n\
                   State 1: <Initial predicate>\n\
                   /\\ x = 5\n\
                   \n\
                   State 2: Stuttering\n";
        let results = parse_output(raw);

        assert_eq!(results.counterexamples.len(), 2);
        let lasso = &results.counterexamples[0];
        assert_eq!(lasso.state_sequence, vec![StateId(1), StateId(2), StateId(1)]);
        assert!(results
            .transitions
            .contains(&Transition::new(2, 1, "Back to state")));

        let stutter = &results.counterexamples[1];
        assert_eq!(stutter.state_sequence, vec![StateId(3), StateId(4)]);
        let stuttering = results.state(StateId(4)).unwrap();
        assert_eq!(stuttering.description, "Stuttering");
        assert_eq!(stuttering.variable("x"), Some("5"));
        assert!(results
            .transitions
            .contains(&Transition::new(3, 4, "Stuttering")));
    }

    #[test]
    fn test_parse_is_deterministic() {
        assert_eq!(parse_output(VIOLATION_OUTPUT), parse_output(VIOLATION_OUTPUT));
    }
}
