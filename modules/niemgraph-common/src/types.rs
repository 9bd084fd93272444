//! Shared report and document types passed between the pipeline stages.

use serde::{Deserialize, Serialize};

/// One submitted file: name plus raw bytes. Bytes are never interpreted
/// here; the tool gateway and the projector decide what they mean.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileInput {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single finding from schema or instance validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    pub severity: Severity,
    pub message: String,
}

/// Structured validator output, grouped errors and warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub summary: String,
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn passed(summary: impl Into<String>) -> Self {
        Self {
            valid: true,
            summary: summary.into(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn failed(summary: impl Into<String>, errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: false,
            summary: summary.into(),
            errors,
            warnings: Vec::new(),
        }
    }
}

/// An import declared by a submitted XSD that no submitted file satisfies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingImport {
    pub namespace: String,
    /// Files whose `xs:import` declared the namespace.
    pub needed_by: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Failed,
}

/// What a per-file operation hands back to the batch executor on success.
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
    pub nodes_created: u64,
    pub edges_created: u64,
    pub validation: Option<ValidationReport>,
    pub warnings: Vec<String>,
}

/// One entry in a batch result, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub filename: String,
    pub status: FileStatus,
    pub nodes_created: u64,
    pub edges_created: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl FileReport {
    pub fn success(filename: impl Into<String>, outcome: FileOutcome) -> Self {
        Self {
            filename: filename.into(),
            status: FileStatus::Success,
            nodes_created: outcome.nodes_created,
            edges_created: outcome.edges_created,
            validation: outcome.validation,
            error: None,
            warnings: outcome.warnings,
        }
    }

    pub fn failed(filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: FileStatus::Failed,
            nodes_created: 0,
            edges_created: 0,
            validation: None,
            error: Some(error.into()),
            warnings: Vec::new(),
        }
    }

    pub fn failed_validation(filename: impl Into<String>, report: ValidationReport) -> Self {
        let summary = report.summary.clone();
        Self {
            filename: filename.into(),
            status: FileStatus::Failed,
            nodes_created: 0,
            edges_created: 0,
            validation: Some(report),
            error: Some(summary),
            warnings: Vec::new(),
        }
    }
}

/// Per-batch result: one entry per input file, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    pub files_submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub per_file: Vec<FileReport>,
}

impl BatchReport {
    pub fn from_entries(bundle_id: Option<String>, per_file: Vec<FileReport>) -> Self {
        let succeeded = per_file
            .iter()
            .filter(|f| f.status == FileStatus::Success)
            .count();
        Self {
            bundle_id,
            files_submitted: per_file.len(),
            succeeded,
            failed: per_file.len() - succeeded,
            per_file,
        }
    }
}
