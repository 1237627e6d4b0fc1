//! JSON trace export.
//!
//! Produces a document of the form
//!
//! ```json
//! {"trace": [{"stepNumber": 0, "stateId": 1, "action": "Initial",
//!             "variables": [{"name": "x", "value": "0"}]}]}
//! ```

use std::path::Path;

use serde::Serialize;
use tlaviz_core::model::StateId;
use tracing::instrument;

use crate::error::ExportError;
use crate::trace::TraceStep;

/// JSON output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Single line, minimal whitespace.
    Compact,
    /// Indented.
    #[default]
    Pretty,
}

#[derive(Serialize)]
struct TraceDocument<'a> {
    trace: Vec<StepDocument<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StepDocument<'a> {
    step_number: usize,
    state_id: StateId,
    action: &'a str,
    variables: Vec<VariableDocument<'a>>,
}

#[derive(Serialize)]
struct VariableDocument<'a> {
    name: &'a str,
    value: &'a str,
}

impl<'a> TraceDocument<'a> {
    fn new(steps: &'a [TraceStep]) -> Self {
        let trace = steps
            .iter()
            .map(|step| StepDocument {
                step_number: step.step_number,
                state_id: step.state_id,
                action: &step.action,
                variables: step
                    .variables
                    .iter()
                    .map(|(name, value)| VariableDocument { name, value })
                    .collect(),
            })
            .collect();
        TraceDocument { trace }
    }
}

/// JSON trace exporter.
#[derive(Debug, Clone, Default)]
pub struct JsonTraceExporter {
    format: JsonFormat,
}

impl JsonTraceExporter {
    /// Create an exporter producing pretty-printed JSON.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an exporter with the given format.
    pub fn with_format(format: JsonFormat) -> Self {
        Self { format }
    }

    /// Export the trace as a string.
    #[instrument(skip(self, steps), fields(steps = steps.len()))]
    pub fn export(&self, steps: &[TraceStep]) -> Result<String, ExportError> {
        let document = TraceDocument::new(steps);
        let json = match self.format {
            JsonFormat::Compact => serde_json::to_string(&document)?,
            JsonFormat::Pretty => serde_json::to_string_pretty(&document)?,
        };
        Ok(json)
    }

    /// Export the trace and write it to a file.
    #[instrument(skip(self, steps), fields(steps = steps.len(), path = %path.as_ref().display()))]
    pub fn export_to_file(
        &self,
        steps: &[TraceStep],
        path: impl AsRef<Path>,
    ) -> Result<(), ExportError> {
        let json = self.export(steps)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
