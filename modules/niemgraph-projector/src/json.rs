//! JSON instance lowering.
//!
//! NIEM JSON follows the JSON-LD conventions: `@id` carries identity, an
//! object holding nothing but `@id` is a reference, and an `@id` beginning
//! with `#` is the URI form that marks a role. Keys are qnames; arrays fan
//! out into repeated children. Key order is canonicalized by the JSON
//! parser, so lowering is deterministic for equal bytes.

use serde_json::Value;

use niemgraph_common::error::IngestError;

use crate::tree::{Elem, ElemTree, MAX_DEPTH, MAX_DOC_BYTES};

/// Lower JSON bytes into the normalized element tree.
pub fn lower_json(bytes: &[u8]) -> Result<ElemTree, IngestError> {
    if bytes.len() > MAX_DOC_BYTES {
        return Err(IngestError::Projection(format!(
            "document exceeds {} byte cap",
            MAX_DOC_BYTES
        )));
    }
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| IngestError::Projection(format!("JSON parse: {e}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| IngestError::Projection("top-level JSON must be an object".to_string()))?;

    let payload_keys: Vec<&String> = obj.keys().filter(|k| !k.starts_with('@')).collect();

    let mut tree;
    if payload_keys.len() == 1 && obj[payload_keys[0]].is_object() {
        // Conventional single-root document: {"exch:Message": {...}}
        let qname = payload_keys[0].clone();
        tree = ElemTree::new(Elem::named(qname.clone()));
        let root_obj = obj[&qname]
            .as_object()
            .ok_or_else(|| IngestError::Projection("root must be an object".to_string()))?;
        lower_object(&mut tree, 0, root_obj, 1)?;
    } else {
        tree = ElemTree::new(Elem::named("root"));
        lower_object(&mut tree, 0, obj, 1)?;
    }
    Ok(tree)
}

fn lower_object(
    tree: &mut ElemTree,
    idx: usize,
    obj: &serde_json::Map<String, Value>,
    depth: usize,
) -> Result<(), IngestError> {
    if depth > MAX_DEPTH {
        return Err(IngestError::Projection(format!(
            "object nesting exceeds depth cap {MAX_DEPTH}"
        )));
    }

    let payload_count = obj.keys().filter(|k| *k != "@context").count();

    for (key, value) in obj {
        match key.as_str() {
            "@context" => continue,
            "@id" | "structures:id" | "structures:ref" | "structures:uri" => {
                let Some(v) = value.as_str() else { continue };
                apply_identity(&mut tree.elems[idx], key, v, payload_count);
            }
            "xsi:type" => {
                if let Some(v) = value.as_str() {
                    tree.elems[idx].xsi_type = Some(v.to_string());
                }
            }
            "rdf:value" => {
                tree.elems[idx].text = scalar_text(value);
            }
            _ if (key.ends_with("metadataRef") || key.ends_with("MetadataRef"))
                && value.is_string() =>
            {
                let v = value.as_str().unwrap_or_default().to_string();
                tree.elems[idx].metadata_refs.push((key.clone(), v));
            }
            _ => lower_field(tree, idx, key, value, depth)?,
        }
    }
    Ok(())
}

fn apply_identity(elem: &mut Elem, key: &str, value: &str, payload_count: usize) {
    match key {
        "structures:ref" => elem.structures_ref = Some(strip_fragment(value)),
        "structures:uri" => elem.structures_uri = Some(value.to_string()),
        "structures:id" => elem.structures_id = Some(value.to_string()),
        // "@id" alone is a reference carrier; with payload it is either the
        // URI form (leading #) or an ordinary id.
        _ if payload_count == 1 => elem.structures_ref = Some(strip_fragment(value)),
        _ if value.starts_with('#') => elem.structures_uri = Some(value.to_string()),
        _ => elem.structures_id = Some(value.to_string()),
    }
}

fn lower_field(
    tree: &mut ElemTree,
    parent: usize,
    key: &str,
    value: &Value,
    depth: usize,
) -> Result<(), IngestError> {
    match value {
        Value::Null => Ok(()),
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            let mut child = Elem::named(key);
            child.text = scalar_text(value);
            tree.push_child(parent, child);
            Ok(())
        }
        Value::Object(obj) => {
            // `{"rdf:value": ..., attr keys...}` is the JSON spelling of
            // simple content with attributes; keep it a scalar leaf.
            if obj.contains_key("rdf:value")
                && obj.keys().all(|k| k == "rdf:value" || !k.starts_with('@'))
                && obj
                    .iter()
                    .all(|(k, v)| k == "rdf:value" || v.is_string() || v.is_number() || v.is_boolean())
            {
                let mut child = Elem::named(key);
                child.text = scalar_text(&obj["rdf:value"]);
                for (k, v) in obj {
                    if k == "rdf:value" {
                        continue;
                    }
                    if k.ends_with("metadataRef") || k.ends_with("MetadataRef") {
                        child
                            .metadata_refs
                            .push((k.clone(), scalar_text(v).unwrap_or_default()));
                    } else {
                        child
                            .attrs
                            .push((k.clone(), scalar_text(v).unwrap_or_default()));
                    }
                }
                tree.push_child(parent, child);
                return Ok(());
            }
            let child = tree.push_child(parent, Elem::named(key));
            lower_object(tree, child, obj, depth + 1)
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Array(_) => {
                        return Err(IngestError::Projection(format!(
                            "nested arrays are not a NIEM JSON shape (field {key})"
                        )))
                    }
                    _ => lower_field(tree, parent, key, item, depth)?,
                }
            }
            Ok(())
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn strip_fragment(value: &str) -> String {
    value.strip_prefix('#').unwrap_or(value).to_string()
}
