use thiserror::Error;

/// Failures that abort a cleaning run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no header row contains all of {tokens:?} (scanned {scanned} rows)")]
    HeaderNotFound { tokens: Vec<String>, scanned: usize },
    #[error("required column `{column}` not found below header row {header_row}")]
    MissingColumn { column: String, header_row: usize },
    #[error("header signature must contain at least one token")]
    EmptySignature,
}
