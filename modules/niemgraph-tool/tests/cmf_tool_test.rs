//! Subprocess failure-taxonomy tests against a scripted fake tool.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use niemgraph_common::error::IngestError;
use niemgraph_common::types::FileInput;
use niemgraph_tool::{CmfTool, SchemaTool};

fn fake_tool(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("fake-cmftool");
    let script = format!("#!/bin/sh\n{body}\n");
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn schema_bundle() -> Vec<FileInput> {
    vec![FileInput::new(
        "main.xsd",
        b"<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\" targetNamespace=\"urn:t\"/>".to_vec(),
    )]
}

fn instance() -> FileInput {
    FileInput::new("doc.xml", b"<root/>".to_vec())
}

#[tokio::test]
async fn json_report_on_stdout_is_parsed() {
    let dir = TempDir::new().unwrap();
    let tool_path = fake_tool(
        &dir,
        r#"echo '{"valid":false,"summary":"1 error(s)","errors":[{"file":"doc.xml","line":3,"severity":"error","message":"unexpected element"}],"warnings":[]}'"#,
    );
    let tool = CmfTool::new(tool_path, Duration::from_secs(5));

    let report = tool
        .validate_xml(&schema_bundle(), "main.xsd", &instance(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!report.valid);
    assert_eq!(report.errors[0].message, "unexpected element");
}

#[tokio::test]
async fn nonzero_exit_surfaces_stderr() {
    let dir = TempDir::new().unwrap();
    let tool_path = fake_tool(&dir, "echo 'schema load failure' >&2; exit 3");
    let tool = CmfTool::new(tool_path, Duration::from_secs(5));

    let err = tool
        .validate_xml(&schema_bundle(), "main.xsd", &instance(), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        IngestError::ToolExecution { status, stderr } => {
            assert_eq!(status, 3);
            assert!(stderr.contains("schema load failure"));
        }
        other => panic!("expected ToolExecution, got {other}"),
    }
}

#[tokio::test]
async fn hung_tool_times_out() {
    let dir = TempDir::new().unwrap();
    let tool_path = fake_tool(&dir, "sleep 30");
    let tool = CmfTool::new(tool_path, Duration::from_millis(200));

    let err = tool
        .validate_xml(&schema_bundle(), "main.xsd", &instance(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::ToolTimeout(_)));
}

#[tokio::test]
async fn missing_binary_is_tool_unavailable() {
    let tool = CmfTool::new("/nonexistent/cmftool", Duration::from_secs(1));
    let err = tool
        .validate_xml(&schema_bundle(), "main.xsd", &instance(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::ToolUnavailable(_)));
}

#[tokio::test]
async fn cancellation_wins_over_a_running_tool() {
    let dir = TempDir::new().unwrap();
    let tool_path = fake_tool(&dir, "sleep 30");
    let tool = CmfTool::new(tool_path, Duration::from_secs(60));

    let cancel = CancellationToken::new();
    let c = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        c.cancel();
    });

    let err = tool
        .xsd_to_model(&schema_bundle(), "main.xsd", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Cancelled));
}

#[tokio::test]
async fn skip_ndr_checks_imports_only() {
    // No tool binary on disk at all — the import scan must not shell out.
    let tool = CmfTool::new("/nonexistent/cmftool", Duration::from_secs(1));
    let check = tool
        .validate_schema_bundle(&schema_bundle(), "main.xsd", true, &CancellationToken::new())
        .await
        .unwrap();
    assert!(check.passed());
    assert!(check.ndr_report.is_none());
}
