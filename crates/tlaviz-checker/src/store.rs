//! Result snapshots.
//!
//! A snapshot is a small line-oriented text file:
//!
//! ```text
//! Status: 2
//! States: 142
//! Distinct: 97
//! Time: 1.25
//! Error: Error: Invariant TypeOK is violated. | Error: deadlock
//! ```
//!
//! Saving writes the status code, both counts, the elapsed time and (when
//! present) the error text flattened onto one line. Loading restores only the
//! two counts and the elapsed time, and always yields a `Completed` status.
//! States, transitions and counterexamples are never persisted.

use std::fs;
use std::path::Path;

use thiserror::Error;
use tlaviz_core::model::{JobStatus, RunResults};
use tracing::debug;

const ERROR_LINE_SEPARATOR: &str = " | ";

/// Errors raised while saving or loading a snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid snapshot at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("cannot load results while a job is running")]
    JobRunning,
}

/// Renders a snapshot.
pub fn render(results: &RunResults) -> String {
    let mut out = format!(
        "Status: {}\nStates: {}\nDistinct: {}\nTime: {}\n",
        results.status.code(),
        results.states_generated,
        results.distinct_states,
        results.execution_time_seconds
    );

    let error = results
        .error_message
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join(ERROR_LINE_SEPARATOR);
    if !error.is_empty() {
        out.push_str(&format!("Error: {}\n", error));
    }
    out
}

/// Parses a snapshot.
///
/// Unknown keys are ignored, and so are the status and error lines.
pub fn parse(input: &str) -> Result<RunResults, StoreError> {
    let mut results = RunResults {
        status: JobStatus::Completed,
        ..Default::default()
    };

    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "States" => results.states_generated = parse_field(value, line_no)?,
            "Distinct" => results.distinct_states = parse_field(value, line_no)?,
            "Time" => results.execution_time_seconds = parse_field(value, line_no)?,
            _ => {}
        }
    }

    Ok(results)
}

fn parse_field<T>(value: &str, line: usize) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| StoreError::Parse {
        line,
        reason: format!("{value:?}: {e}"),
    })
}

/// Writes a snapshot to `path`.
pub fn save(path: impl AsRef<Path>, results: &RunResults) -> Result<(), StoreError> {
    let path = path.as_ref();
    fs::write(path, render(results))?;
    debug!(path = %path.display(), status = %results.status, "Saved result snapshot");
    Ok(())
}

/// Reads a snapshot from `path`.
pub fn load(path: impl AsRef<Path>) -> Result<RunResults, StoreError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let results = parse(&content)?;
    debug!(path = %path.display(), "Loaded result snapshot");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlaviz_core::model::{State, Transition};

    fn finished_results() -> RunResults {
        let mut results = RunResults {
            status: JobStatus::Failed,
            states_generated: 142,
            distinct_states: 97,
            execution_time_seconds: 0.1 + 0.2,
            error_message: "Error: Invariant TypeOK is violated.\nError: deadlock\n".to_string(),
            ..Default::default()
        };
        results.insert_state(State::new(1, "Init").with_variable("x", "0"));
        results.transitions.push(Transition::new(1, 1, "Stay"));
        results
    }

    #[test]
    fn test_render_format() {
        let text = render(&finished_results());
        assert_eq!(
            text,
            "Status: 3\nStates: 142\nDistinct: 97\nTime: 0.30000000000000004\n\
             Error: Error: Invariant TypeOK is violated. | Error: deadlock\n"
        );
    }

    #[test]
    fn test_error_line_omitted_when_empty() {
        let text = render(&RunResults::default());
        assert!(!text.contains("Error:"));
    }

    #[test]
    fn test_save_then_load_restores_counts_and_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");
        let original = finished_results();

        save(&path, &original).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.states_generated, original.states_generated);
        assert_eq!(loaded.distinct_states, original.distinct_states);
        assert_eq!(
            loaded.execution_time_seconds.to_bits(),
            original.execution_time_seconds.to_bits()
        );
        assert_eq!(loaded.status, JobStatus::Completed);
        assert!(loaded.states.is_empty());
        assert!(loaded.transitions.is_empty());
        assert!(loaded.error_message.is_empty());
    }

    #[test]
    fn test_parse_reports_bad_numbers() {
        let err = parse("Status: 2\nStates: lots\n").unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_parse_ignores_unknown_lines() {
        let results = parse("# comment\nFoo: bar\nDistinct: 3\n\n").unwrap();
        assert_eq!(results.distinct_states, 3);
        assert_eq!(results.states_generated, 0);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
