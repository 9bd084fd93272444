use thiserror::Error;

use crate::types::{MissingImport, ValidationReport};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("validation failed: {}", .0.summary)]
    Validation(ValidationReport),

    #[error("schema bundle incomplete: {} unresolved import(s)", missing.len())]
    SchemaIncomplete { missing: Vec<MissingImport> },

    #[error("mapping compilation failed: {0}")]
    MappingCompilation(String),

    #[error("projection failed: {0}")]
    Projection(String),

    #[error("external tool not available: {0}")]
    ToolUnavailable(String),

    #[error("external tool exited with status {status}: {stderr}")]
    ToolExecution { status: i32, stderr: String },

    #[error("external tool timed out after {0}s")]
    ToolTimeout(u64),

    #[error("sink error: {0}")]
    Sink(String),

    #[error("batch too large: {submitted} files submitted, limit is {limit}")]
    BatchTooLarge { submitted: usize, limit: usize },

    #[error("operation cancelled")]
    Cancelled,

    #[error("no active schema bundle and none was specified")]
    NoActiveBundle,

    #[error("unknown bundle: {0}")]
    UnknownBundle(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
