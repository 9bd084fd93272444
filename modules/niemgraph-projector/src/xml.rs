//! XML instance lowering.
//!
//! Resolves namespace prefixes so `structures:*` and `xsi:*` attributes are
//! recognized by their bound namespace, not their spelling. DTDs and
//! external entities are never resolved; quick-xml does not fetch anything,
//! and DocType events are discarded.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use niemgraph_common::error::IngestError;

use crate::tree::{Elem, ElemTree, MAX_DEPTH, MAX_DOC_BYTES};

const XSI_URI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Lower XML bytes into the normalized element tree.
pub fn lower_xml(bytes: &[u8]) -> Result<ElemTree, IngestError> {
    if bytes.len() > MAX_DOC_BYTES {
        return Err(IngestError::Projection(format!(
            "document exceeds {} byte cap",
            MAX_DOC_BYTES
        )));
    }

    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);
    let mut buf = Vec::new();

    let mut tree: Option<ElemTree> = None;
    let mut stack: Vec<usize> = Vec::new();
    // (depth, prefix, uri); popped when the declaring element closes.
    let mut bindings: Vec<(usize, String, String)> = Vec::new();
    let mut texts: Vec<String> = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| IngestError::Projection(format!("XML parse: {e}")))?;
        match event {
            Event::Start(ref e) => {
                let depth = stack.len();
                if depth >= MAX_DEPTH {
                    return Err(IngestError::Projection(format!(
                        "element nesting exceeds depth cap {MAX_DEPTH}"
                    )));
                }
                let elem = read_element(e, depth, &mut bindings)?;
                let idx = match (&mut tree, stack.last()) {
                    (Some(t), Some(&parent)) => t.push_child(parent, elem),
                    (Some(_), None) => {
                        return Err(IngestError::Projection(
                            "multiple root elements".to_string(),
                        ))
                    }
                    (None, _) => {
                        tree = Some(ElemTree::new(elem));
                        0
                    }
                };
                stack.push(idx);
                texts.push(String::new());
            }
            Event::Empty(ref e) => {
                let depth = stack.len();
                if depth >= MAX_DEPTH {
                    return Err(IngestError::Projection(format!(
                        "element nesting exceeds depth cap {MAX_DEPTH}"
                    )));
                }
                let elem = read_element(e, depth, &mut bindings)?;
                bindings.retain(|(d, _, _)| *d != depth);
                match (&mut tree, stack.last()) {
                    (Some(t), Some(&parent)) => {
                        t.push_child(parent, elem);
                    }
                    (Some(_), None) => {
                        return Err(IngestError::Projection(
                            "multiple root elements".to_string(),
                        ))
                    }
                    (None, _) => tree = Some(ElemTree::new(elem)),
                }
            }
            Event::Text(ref t) => {
                if let Some(text) = texts.last_mut() {
                    let piece = t
                        .unescape()
                        .map_err(|e| IngestError::Projection(format!("XML text: {e}")))?;
                    text.push_str(&piece);
                }
            }
            Event::End(_) => {
                let idx = stack
                    .pop()
                    .ok_or_else(|| IngestError::Projection("unbalanced end tag".to_string()))?;
                let depth = stack.len();
                bindings.retain(|(d, _, _)| *d != depth);
                let text = texts.pop().unwrap_or_default();
                if let Some(t) = &mut tree {
                    let elem = &mut t.elems[idx];
                    let trimmed = text.trim();
                    if !trimmed.is_empty() && elem.children.is_empty() {
                        elem.text = Some(trimmed.to_string());
                    }
                }
            }
            Event::Eof => break,
            // DocType, comments, PIs, CData are not part of the projection.
            _ => {}
        }
        buf.clear();
    }

    tree.ok_or_else(|| IngestError::Projection("document has no root element".to_string()))
}

fn read_element(
    e: &BytesStart<'_>,
    depth: usize,
    bindings: &mut Vec<(usize, String, String)>,
) -> Result<Elem, IngestError> {
    let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut elem = Elem::named(qname);

    // Two passes: namespace declarations first, then classification, so an
    // xmlns on this very element governs its own attributes.
    let mut plain: Vec<(String, String)> = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| IngestError::Projection(format!("XML attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        if key == "xmlns" {
            bindings.push((depth, String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            bindings.push((depth, prefix.to_string(), value));
        } else {
            plain.push((key, value));
        }
    }

    for (key, value) in plain {
        let (prefix, local) = split_qname(&key);
        if is_structures(prefix, bindings) {
            match local {
                "id" => elem.structures_id = Some(value),
                "ref" => elem.structures_ref = Some(strip_fragment(&value)),
                "uri" => elem.structures_uri = Some(value),
                _ => elem.attrs.push((key, value)),
            }
        } else if is_xsi(prefix, bindings) {
            match local {
                "nil" => elem.nil = value == "true",
                "type" => elem.xsi_type = Some(value),
                // Other xsi attrs (schemaLocation) carry no instance data.
                _ => {}
            }
        } else if local.ends_with("metadataRef") || local.ends_with("MetadataRef") {
            elem.metadata_refs.push((key, value));
        } else {
            elem.attrs.push((key, value));
        }
    }
    Ok(elem)
}

fn split_qname(qname: &str) -> (&str, &str) {
    match qname.split_once(':') {
        Some((p, l)) => (p, l),
        None => ("", qname),
    }
}

fn strip_fragment(value: &str) -> String {
    value.strip_prefix('#').unwrap_or(value).to_string()
}

fn resolve<'a>(prefix: &str, bindings: &'a [(usize, String, String)]) -> Option<&'a str> {
    bindings
        .iter()
        .rev()
        .find(|(_, p, _)| p == prefix)
        .map(|(_, _, uri)| uri.as_str())
}

fn is_structures(prefix: &str, bindings: &[(usize, String, String)]) -> bool {
    match resolve(prefix, bindings) {
        Some(uri) => uri.contains("/structures"),
        // Unbound prefixes fall back to the conventional spelling.
        None => prefix == "structures" || prefix == "s",
    }
}

fn is_xsi(prefix: &str, bindings: &[(usize, String, String)]) -> bool {
    match resolve(prefix, bindings) {
        Some(uri) => uri == XSI_URI,
        None => prefix == "xsi",
    }
}
