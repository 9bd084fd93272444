//! Scripted `SchemaTool` for tests. No subprocess, no filesystem.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use niemgraph_common::error::IngestError;
use niemgraph_common::types::{FileInput, ValidationReport};

use crate::gateway::{CheckStatus, SchemaCheck, SchemaTool};
use crate::imports::ImportReport;

/// Returns pre-baked outcomes regardless of input.
pub struct StaticTool {
    pub schema_status: CheckStatus,
    pub ndr_report: Option<ValidationReport>,
    pub model: Vec<u8>,
    pub xml_report: ValidationReport,
    pub json_report: ValidationReport,
}

impl StaticTool {
    /// Everything passes; the given bytes are the canonical model.
    pub fn passing(model: Vec<u8>) -> Self {
        Self {
            schema_status: CheckStatus::Pass,
            ndr_report: Some(ValidationReport::passed("pass")),
            model,
            xml_report: ValidationReport::passed("valid"),
            json_report: ValidationReport::passed("valid"),
        }
    }

    pub fn with_xml_report(mut self, report: ValidationReport) -> Self {
        self.xml_report = report;
        self
    }

    pub fn with_json_report(mut self, report: ValidationReport) -> Self {
        self.json_report = report;
        self
    }
}

#[async_trait]
impl SchemaTool for StaticTool {
    async fn validate_schema_bundle(
        &self,
        files: &[FileInput],
        _primary: &str,
        _skip_ndr: bool,
        _cancel: &CancellationToken,
    ) -> Result<SchemaCheck, IngestError> {
        let import_report = crate::imports::scan_imports(files);
        Ok(SchemaCheck {
            status: self.schema_status,
            ndr_report: self.ndr_report.clone(),
            import_report,
        })
    }

    async fn xsd_to_model(
        &self,
        _files: &[FileInput],
        _primary: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<u8>, IngestError> {
        Ok(self.model.clone())
    }

    async fn validate_xml(
        &self,
        _schema_files: &[FileInput],
        _primary: &str,
        _instance: &FileInput,
        _cancel: &CancellationToken,
    ) -> Result<ValidationReport, IngestError> {
        Ok(self.xml_report.clone())
    }

    async fn validate_json(
        &self,
        _schema_files: &[FileInput],
        _primary: &str,
        _instance: &FileInput,
        _cancel: &CancellationToken,
    ) -> Result<ValidationReport, IngestError> {
        Ok(self.json_report.clone())
    }
}

/// Empty import report helper for tests that build `SchemaCheck` by hand.
pub fn empty_imports() -> ImportReport {
    ImportReport::default()
}
