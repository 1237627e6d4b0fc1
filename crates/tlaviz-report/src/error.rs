use thiserror::Error;

/// Errors that can occur while exporting traces.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
