//! Markdown trace export.
//!
//! One section per step, suitable for pasting into an issue or a review.

use std::path::Path;

use tracing::instrument;

use crate::error::ExportError;
use crate::trace::TraceStep;

/// Markdown trace exporter.
#[derive(Debug, Clone, Default)]
pub struct MarkdownTraceExporter {
    /// Heading level offset (0 = start with #, 1 = start with ##, etc.).
    heading_offset: usize,
}

impl MarkdownTraceExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift all headings down by `offset` levels.
    pub fn with_heading_offset(offset: usize) -> Self {
        Self {
            heading_offset: offset,
        }
    }

    /// Export the trace as a Markdown string.
    #[instrument(skip(self, steps), fields(steps = steps.len()))]
    pub fn export(&self, steps: &[TraceStep]) -> String {
        let mut md = String::new();
        md.push_str(&format!("{} Trace\n\n", self.heading(1)));

        for step in steps {
            md.push_str(&format!("{} Step {}\n\n", self.heading(2), step.step_number));
            md.push_str(&format!("**State ID:** {}\n\n", step.state_id));
            md.push_str(&format!("**Action:** {}\n\n", step.action));
            md.push_str("**Variables:**\n\n");
            for (name, value) in &step.variables {
                md.push_str(&format!("- `{}` = {}\n", name, value));
            }
            md.push('\n');
        }

        md
    }

    /// Export the trace and write it to a file.
    #[instrument(skip(self, steps), fields(steps = steps.len(), path = %path.as_ref().display()))]
    pub fn export_to_file(
        &self,
        steps: &[TraceStep],
        path: impl AsRef<Path>,
    ) -> Result<(), ExportError> {
        std::fs::write(path, self.export(steps))?;
        Ok(())
    }

    fn heading(&self, level: usize) -> String {
        "#".repeat(level + self.heading_offset)
    }
}
