//! Gateway to the external NIEM canonicalizer/validator.
//!
//! The external tool is a Java CLI invoked as a subprocess inside a scoped
//! scratch directory. This crate isolates every caller from subprocess
//! mechanics: scratch-dir lifecycle, argument construction, wall-clock caps,
//! cancellation, and parsing of the tool's stdout into structured reports.
//! The import-completeness check is pure Rust and never shells out.

pub mod gateway;
pub mod imports;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use gateway::{CheckStatus, CmfTool, SchemaCheck, SchemaTool};
pub use imports::{scan_imports, ImportReport, ResolvedImport};
