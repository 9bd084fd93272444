//! Import-completeness scan over a submitted XSD bundle.
//!
//! Every namespace declared via `xs:import` must resolve to a submitted file
//! whose `targetNamespace` matches, and every `xs:include` location must name
//! a submitted file. W3C namespaces are always considered available.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};

use niemgraph_common::types::{FileInput, MissingImport, Severity, ValidationIssue};

/// Namespaces the validating parser itself provides.
const BUILTIN_NAMESPACES: &[&str] = &[
    "http://www.w3.org/2001/XMLSchema",
    "http://www.w3.org/2001/XMLSchema-instance",
    "http://www.w3.org/XML/1998/namespace",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedImport {
    pub namespace: String,
    pub provided_by: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub resolved: Vec<ResolvedImport>,
    pub missing: Vec<MissingImport>,
    /// Malformed XSDs and unresolvable includes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ValidationIssue>,
}

impl ImportReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
            && self
                .issues
                .iter()
                .all(|i| i.severity != Severity::Error)
    }
}

struct ScannedSchema {
    target_namespace: Option<String>,
    imports: Vec<String>,
    includes: Vec<String>,
}

/// Scan a bundle for unresolved imports and includes.
pub fn scan_imports(files: &[FileInput]) -> ImportReport {
    let mut report = ImportReport::default();
    let mut by_namespace: BTreeMap<String, String> = BTreeMap::new();
    let mut scans: Vec<(String, ScannedSchema)> = Vec::new();

    for file in files {
        match scan_one(&file.bytes) {
            Ok(scan) => {
                if let Some(ns) = &scan.target_namespace {
                    by_namespace.entry(ns.clone()).or_insert_with(|| file.name.clone());
                }
                scans.push((file.name.clone(), scan));
            }
            Err(e) => report.issues.push(ValidationIssue {
                file: file.name.clone(),
                line: None,
                column: None,
                rule: Some("import-scan".to_string()),
                severity: Severity::Error,
                message: format!("not a parseable XSD: {e}"),
            }),
        }
    }

    // namespace -> files that imported it, in first-seen order
    let mut needed: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (filename, scan) in &scans {
        for ns in &scan.imports {
            if BUILTIN_NAMESPACES.contains(&ns.as_str()) {
                continue;
            }
            if let Some(provider) = by_namespace.get(ns) {
                let entry = ResolvedImport {
                    namespace: ns.clone(),
                    provided_by: provider.clone(),
                };
                if !report.resolved.contains(&entry) {
                    report.resolved.push(entry);
                }
            } else {
                let files = needed.entry(ns.clone()).or_default();
                if !files.contains(filename) {
                    files.push(filename.clone());
                }
            }
        }
        for loc in &scan.includes {
            let base = loc.rsplit('/').next().unwrap_or(loc);
            if !files_contain(&scans, base) {
                report.issues.push(ValidationIssue {
                    file: filename.clone(),
                    line: None,
                    column: None,
                    rule: Some("include-resolution".to_string()),
                    severity: Severity::Error,
                    message: format!("xs:include location {loc} is not in the bundle"),
                });
            }
        }
    }

    report.missing = needed
        .into_iter()
        .map(|(namespace, needed_by)| MissingImport { namespace, needed_by })
        .collect();
    report
}

fn files_contain(scans: &[(String, ScannedSchema)], name: &str) -> bool {
    scans.iter().any(|(f, _)| f == name)
}

fn scan_one(bytes: &[u8]) -> Result<ScannedSchema, quick_xml::Error> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut scan = ScannedSchema {
        target_namespace: None,
        imports: Vec::new(),
        includes: Vec::new(),
    };

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"schema" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"targetNamespace" {
                                scan.target_namespace =
                                    Some(String::from_utf8_lossy(&attr.value).into_owned());
                            }
                        }
                    }
                    b"import" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"namespace" {
                                scan.imports
                                    .push(String::from_utf8_lossy(&attr.value).into_owned());
                            }
                        }
                    }
                    b"include" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"schemaLocation" {
                                scan.includes
                                    .push(String::from_utf8_lossy(&attr.value).into_owned());
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(scan)
}

fn local_name(qname: &[u8]) -> &[u8] {
    match qname.iter().rposition(|&b| b == b':') {
        Some(pos) => &qname[pos + 1..],
        None => qname,
    }
}
