//! Parsing of the external tool's stdout into `ValidationReport`.
//!
//! The tool normally writes a JSON report. Older builds write gcc-style
//! diagnostic lines (`file:line:col: severity [rule] message`); those are
//! accepted as a fallback so a tool upgrade never silently drops findings.

use std::sync::LazyLock;

use regex::Regex;

use niemgraph_common::types::{Severity, ValidationIssue, ValidationReport};

static LOCATED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<file>[^:\s][^:]*):(?P<line>\d+)(?::(?P<col>\d+))?:\s*(?P<sev>error|warning)\s*(?:\[(?P<rule>[^\]]+)\])?\s*:?\s*(?P<msg>.+)$",
    )
    .expect("diagnostic line regex")
});

static BARE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<sev>error|warning)\s*(?:\[(?P<rule>[^\]]+)\])?\s*:?\s*(?P<msg>.+)$")
        .expect("bare diagnostic line regex")
});

/// Parse tool stdout. `fallback_file` attributes findings that carry no
/// location of their own.
pub fn parse_report(stdout: &[u8], fallback_file: &str) -> ValidationReport {
    if let Ok(report) = serde_json::from_slice::<ValidationReport>(stdout) {
        return report;
    }

    let text = String::from_utf8_lossy(stdout);
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(issue) = parse_line(line, fallback_file) {
            match issue.severity {
                Severity::Error => errors.push(issue),
                Severity::Warning => warnings.push(issue),
            }
        }
    }

    let valid = errors.is_empty();
    let summary = if valid {
        format!("pass ({} warning(s))", warnings.len())
    } else {
        format!("{} error(s), {} warning(s)", errors.len(), warnings.len())
    };
    ValidationReport {
        valid,
        summary,
        errors,
        warnings,
    }
}

fn parse_line(line: &str, fallback_file: &str) -> Option<ValidationIssue> {
    if let Some(caps) = LOCATED_LINE.captures(line) {
        return Some(ValidationIssue {
            file: caps["file"].to_string(),
            line: caps["line"].parse().ok(),
            column: caps.name("col").and_then(|c| c.as_str().parse().ok()),
            rule: caps.name("rule").map(|r| r.as_str().to_string()),
            severity: severity(&caps["sev"]),
            message: caps["msg"].trim().to_string(),
        });
    }
    if let Some(caps) = BARE_LINE.captures(line) {
        return Some(ValidationIssue {
            file: fallback_file.to_string(),
            line: None,
            column: None,
            rule: caps.name("rule").map(|r| r.as_str().to_string()),
            severity: severity(&caps["sev"]),
            message: caps["msg"].trim().to_string(),
        });
    }
    None
}

fn severity(s: &str) -> Severity {
    if s == "warning" {
        Severity::Warning
    } else {
        Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_report_is_taken_verbatim() {
        let stdout = br#"{"valid":false,"summary":"2 errors","errors":[{"file":"a.xsd","line":4,"column":11,"rule":"ndr-9-12","severity":"error","message":"bad name"}],"warnings":[]}"#;
        let report = parse_report(stdout, "bundle");
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].rule.as_deref(), Some("ndr-9-12"));
        assert_eq!(report.errors[0].line, Some(4));
    }

    #[test]
    fn gcc_style_lines_are_grouped_by_severity() {
        let stdout = b"main.xsd:12:5: error [ndr-7-4] element name not in camel case\n\
                       main.xsd:30:1: warning missing documentation\n\
                       ext.xsd:2:9: error [ndr-11-1] bad conformance target\n";
        let report = parse_report(stdout, "bundle");
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.errors[1].file, "ext.xsd");
        assert_eq!(report.errors[0].column, Some(5));
    }

    #[test]
    fn bare_lines_fall_back_to_the_given_file() {
        let report = parse_report(b"error: schema not loadable\n", "pack.xsd");
        assert_eq!(report.errors[0].file, "pack.xsd");
        assert_eq!(report.errors[0].message, "schema not loadable");
    }

    #[test]
    fn silent_tool_means_pass() {
        let report = parse_report(b"", "bundle");
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }
}
