//! Scoped invocation of the external canonicalizer/validator.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use niemgraph_common::error::IngestError;
use niemgraph_common::types::{FileInput, ValidationReport};

use crate::imports::{scan_imports, ImportReport};
use crate::report::parse_report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
}

/// Outcome of schema-bundle validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaCheck {
    pub status: CheckStatus,
    /// NDR rule findings. Absent when NDR validation was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndr_report: Option<ValidationReport>,
    pub import_report: ImportReport,
}

impl SchemaCheck {
    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}

/// The four operations the pipeline needs from the external NIEM tool.
///
/// Instance validation takes the bundle's schema files explicitly; resolving
/// a bundle id to its files is the orchestrator's job, keeping this seam
/// narrow enough to fake in tests.
#[async_trait]
pub trait SchemaTool: Send + Sync {
    async fn validate_schema_bundle(
        &self,
        files: &[FileInput],
        primary: &str,
        skip_ndr: bool,
        cancel: &CancellationToken,
    ) -> Result<SchemaCheck, IngestError>;

    /// Produce the canonical model (CMF) bytes for a validated bundle.
    async fn xsd_to_model(
        &self,
        files: &[FileInput],
        primary: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, IngestError>;

    /// Strict: unknown elements are errors.
    async fn validate_xml(
        &self,
        schema_files: &[FileInput],
        primary: &str,
        instance: &FileInput,
        cancel: &CancellationToken,
    ) -> Result<ValidationReport, IngestError>;

    /// Permissive: missing optional fields pass; type mismatches and
    /// forbidden fields are errors. Inherited from the canonicalizer's
    /// JSON-schema output.
    async fn validate_json(
        &self,
        schema_files: &[FileInput],
        primary: &str,
        instance: &FileInput,
        cancel: &CancellationToken,
    ) -> Result<ValidationReport, IngestError>;
}

/// Subprocess-backed implementation wrapping the NIEM CMF tool CLI.
///
/// Every invocation gets its own scratch directory (removed on all exit
/// paths by `TempDir`), a fixed argument vector of file paths, a scrubbed
/// environment, and a wall-clock cap. Cancellation kills the child.
pub struct CmfTool {
    tool_path: PathBuf,
    timeout: Duration,
}

struct ToolOutput {
    stdout: Vec<u8>,
    stderr: String,
}

impl CmfTool {
    pub fn new(tool_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            tool_path: tool_path.into(),
            timeout,
        }
    }

    async fn run(
        &self,
        args: Vec<OsString>,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, IngestError> {
        let mut cmd = Command::new(&self.tool_path);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env_clear();
        // The JVM launcher needs PATH and JAVA_HOME; nothing else leaks in.
        for var in ["PATH", "JAVA_HOME", "LANG"] {
            if let Ok(val) = std::env::var(var) {
                cmd.env(var, val);
            }
        }

        debug!(tool = %self.tool_path.display(), ?args, "invoking external tool");

        let child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(IngestError::ToolUnavailable(
                    self.tool_path.display().to_string(),
                ))
            }
            Err(e) => return Err(IngestError::ToolUnavailable(e.to_string())),
        };

        // kill_on_drop reaps the child when either branch abandons the wait.
        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(IngestError::Cancelled),
            waited = tokio::time::timeout(self.timeout, child.wait_with_output()) => match waited {
                Ok(Ok(out)) => out,
                Ok(Err(e)) => return Err(IngestError::Other(e.into())),
                Err(_) => return Err(IngestError::ToolTimeout(self.timeout.as_secs())),
            },
        };

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(IngestError::ToolExecution {
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }
        Ok(ToolOutput {
            stdout: output.stdout,
            stderr,
        })
    }
}

#[async_trait]
impl SchemaTool for CmfTool {
    async fn validate_schema_bundle(
        &self,
        files: &[FileInput],
        primary: &str,
        skip_ndr: bool,
        cancel: &CancellationToken,
    ) -> Result<SchemaCheck, IngestError> {
        let import_report = scan_imports(files);

        if skip_ndr {
            let status = if import_report.is_complete() {
                CheckStatus::Pass
            } else {
                CheckStatus::Fail
            };
            return Ok(SchemaCheck {
                status,
                ndr_report: None,
                import_report,
            });
        }

        let scratch = scratch_dir()?;
        let primary_path = write_bundle(scratch.path(), files, primary)?;
        let out = self
            .run(
                vec![
                    OsString::from("check-schema"),
                    OsString::from("--primary"),
                    primary_path.into_os_string(),
                    scratch.path().join("schema").into_os_string(),
                ],
                cancel,
            )
            .await?;

        if !out.stderr.is_empty() {
            debug!(stderr = %out.stderr, "tool diagnostics during schema check");
        }
        let ndr_report = parse_report(&out.stdout, primary);
        let status = if ndr_report.valid && import_report.is_complete() {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        };
        Ok(SchemaCheck {
            status,
            ndr_report: Some(ndr_report),
            import_report,
        })
    }

    async fn xsd_to_model(
        &self,
        files: &[FileInput],
        primary: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, IngestError> {
        let scratch = scratch_dir()?;
        let primary_path = write_bundle(scratch.path(), files, primary)?;
        let out = self
            .run(
                vec![
                    OsString::from("xsd-to-cmf"),
                    OsString::from("--primary"),
                    primary_path.into_os_string(),
                    scratch.path().join("schema").into_os_string(),
                ],
                cancel,
            )
            .await?;

        if out.stdout.is_empty() {
            warn!(primary, "tool produced an empty canonical model");
            return Err(IngestError::ToolExecution {
                status: 0,
                stderr: "empty canonical model on stdout".to_string(),
            });
        }
        Ok(out.stdout)
    }

    async fn validate_xml(
        &self,
        schema_files: &[FileInput],
        primary: &str,
        instance: &FileInput,
        cancel: &CancellationToken,
    ) -> Result<ValidationReport, IngestError> {
        self.validate_instance("validate-xml", schema_files, primary, instance, cancel)
            .await
    }

    async fn validate_json(
        &self,
        schema_files: &[FileInput],
        primary: &str,
        instance: &FileInput,
        cancel: &CancellationToken,
    ) -> Result<ValidationReport, IngestError> {
        self.validate_instance("validate-json", schema_files, primary, instance, cancel)
            .await
    }
}

impl CmfTool {
    async fn validate_instance(
        &self,
        subcommand: &str,
        schema_files: &[FileInput],
        primary: &str,
        instance: &FileInput,
        cancel: &CancellationToken,
    ) -> Result<ValidationReport, IngestError> {
        let scratch = scratch_dir()?;
        let primary_path = write_bundle(scratch.path(), schema_files, primary)?;
        let instance_path = scratch.path().join(safe_name(&instance.name)?);
        std::fs::write(&instance_path, &instance.bytes)
            .map_err(|e| IngestError::Other(e.into()))?;

        let out = self
            .run(
                vec![
                    OsString::from(subcommand),
                    OsString::from("--schema"),
                    primary_path.into_os_string(),
                    instance_path.into_os_string(),
                ],
                cancel,
            )
            .await?;
        Ok(parse_report(&out.stdout, &instance.name))
    }
}

fn scratch_dir() -> Result<TempDir, IngestError> {
    TempDir::new().map_err(|e| IngestError::Other(e.into()))
}

/// Write the bundle under `<scratch>/schema/` and return the primary's path.
fn write_bundle(
    scratch: &Path,
    files: &[FileInput],
    primary: &str,
) -> Result<PathBuf, IngestError> {
    let dir = scratch.join("schema");
    std::fs::create_dir_all(&dir).map_err(|e| IngestError::Other(e.into()))?;

    let mut primary_path = None;
    for file in files {
        let name = safe_name(&file.name)?;
        let path = dir.join(name);
        std::fs::write(&path, &file.bytes).map_err(|e| IngestError::Other(e.into()))?;
        if file.name == primary {
            primary_path = Some(path);
        }
    }
    primary_path.ok_or_else(|| {
        IngestError::Other(anyhow::anyhow!("primary file {primary} is not in the bundle"))
    })
}

/// Submitted filenames become scratch-relative paths; anything that could
/// escape the scratch directory is rejected outright.
fn safe_name(name: &str) -> Result<&str, IngestError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
    {
        return Err(IngestError::Other(anyhow::anyhow!(
            "unsafe filename: {name}"
        )));
    }
    Ok(name)
}
