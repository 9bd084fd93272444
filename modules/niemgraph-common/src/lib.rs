pub mod batch;
pub mod config;
pub mod error;
pub mod types;

pub use batch::{BatchExecutor, BatchLimits, OpKind};
pub use config::Config;
pub use error::IngestError;
pub use types::{
    BatchReport, FileInput, FileOutcome, FileReport, FileStatus, MissingImport, Severity,
    ValidationIssue, ValidationReport,
};
