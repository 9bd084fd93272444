//! XML -> NIEM JSON instance conversion.
//!
//! Produces the JSON-LD-flavored shape the JSON lowering accepts, so a
//! converted document projects to the same graph as its XML source:
//! `structures:id` becomes `@id`, a reference carrier becomes a lone
//! `{"@id": ...}` object, the URI form keeps its `#`, repeated elements
//! become arrays, and attributes become sibling keys.

use serde_json::{json, Map, Value};

use niemgraph_common::error::IngestError;

use crate::tree::{Elem, ElemTree};
use crate::xml::lower_xml;

/// Convert XML instance bytes to a pretty-printed NIEM JSON document.
pub fn xml_to_json(bytes: &[u8]) -> Result<String, IngestError> {
    let tree = lower_xml(bytes)?;
    let root = tree.get(tree.root);
    let mut doc = Map::new();
    doc.insert(root.qname.clone(), value_of(&tree, tree.root));
    serde_json::to_string_pretty(&Value::Object(doc))
        .map_err(|e| IngestError::Projection(format!("serialize JSON: {e}")))
}

fn value_of(tree: &ElemTree, idx: usize) -> Value {
    let elem = tree.get(idx);

    if elem.is_ref_only() {
        if let Some(target) = &elem.structures_ref {
            return json!({ "@id": target });
        }
    }

    if elem.is_scalar() && elem.attrs.is_empty() && elem.metadata_refs.is_empty() {
        return Value::String(elem.text.clone().unwrap_or_default());
    }

    let mut obj = Map::new();
    apply_identity_keys(elem, &mut obj);

    if let Some(text) = &elem.text {
        obj.insert("rdf:value".to_string(), Value::String(text.clone()));
    }
    for (key, value) in &elem.attrs {
        obj.insert(key.clone(), Value::String(value.clone()));
    }
    for (key, value) in &elem.metadata_refs {
        obj.insert(key.clone(), Value::String(value.clone()));
    }

    // Group repeated children into arrays, document order within a group.
    let mut grouped: Map<String, Value> = Map::new();
    for &child in &tree.get(idx).children {
        let child_elem = tree.get(child);
        let value = value_of(tree, child);
        match grouped.get_mut(&child_elem.qname) {
            None => {
                grouped.insert(child_elem.qname.clone(), value);
            }
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    for (key, value) in grouped {
        obj.insert(key, value);
    }

    Value::Object(obj)
}

fn apply_identity_keys(elem: &Elem, obj: &mut Map<String, Value>) {
    if let Some(uri) = &elem.structures_uri {
        obj.insert("@id".to_string(), Value::String(uri.clone()));
    } else if let Some(id) = &elem.structures_id {
        // A payload-free id carrier would be indistinguishable from a
        // reference as a lone `@id`; spell it out in that case.
        if elem.children.is_empty() && elem.text.is_none() && elem.attrs.is_empty() {
            obj.insert("structures:id".to_string(), Value::String(id.clone()));
        } else {
            obj.insert("@id".to_string(), Value::String(id.clone()));
        }
    }
    if let Some(xsi) = &elem.xsi_type {
        obj.insert("xsi:type".to_string(), Value::String(xsi.clone()));
    }
}
