//! Error types for model-check jobs.
//!
//! Job errors never escape the background worker. Each one is folded into the
//! job's terminal [`JobStatus`] and its `error_message`, so callers only ever
//! observe them through status and results.

use std::time::Duration;
use thiserror::Error;

use crate::model::JobStatus;

/// Reasons a job did not complete cleanly.
#[derive(Debug, Error)]
pub enum JobError {
    /// The specification file does not exist. No process is spawned.
    #[error("Spec file does not exist: {path}")]
    SpecNotFound { path: String },

    /// The external process could not be started.
    #[error("Failed to start model checker: {0}")]
    ProcessLaunch(#[from] std::io::Error),

    /// The checker's output contained error markers.
    #[error("{0}")]
    ToolReported(String),

    /// Cancellation was requested while the job was running.
    #[error("Model check cancelled")]
    Cancelled,

    /// The checker did not exit within the configured limit.
    #[error("Model checker timed out after {0:?}")]
    Timeout(Duration),
}

impl JobError {
    /// Creates a spec-not-found error.
    pub fn spec_not_found(path: impl Into<String>) -> Self {
        Self::SpecNotFound { path: path.into() }
    }

    /// Terminal status this error resolves to.
    pub fn terminal_status(&self) -> JobStatus {
        match self {
            JobError::Cancelled => JobStatus::Cancelled,
            _ => JobStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_status_mapping() {
        assert_eq!(
            JobError::spec_not_found("a.tla").terminal_status(),
            JobStatus::Failed
        );
        assert_eq!(JobError::Cancelled.terminal_status(), JobStatus::Cancelled);
        assert_eq!(
            JobError::Timeout(Duration::from_secs(1)).terminal_status(),
            JobStatus::Failed
        );
    }

    #[test]
    fn test_spec_not_found_message_contains_path() {
        let err = JobError::spec_not_found("/tmp/missing.tla");
        assert!(err.to_string().contains("/tmp/missing.tla"));
    }
}
