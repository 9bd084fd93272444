//! Parser for the canonical model format (CMF) the external tool emits.
//!
//! Only the declarations the mapping compiler consumes are materialized:
//! namespaces, classes with their extension chain and property list, and
//! object/data properties. Unknown CMF elements are skipped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use niemgraph_common::error::IngestError;

#[derive(Debug, Clone, Default)]
pub struct CmfNamespace {
    pub id: String,
    pub prefix: String,
    pub uri: String,
}

/// One `HasProperty` row on a class.
#[derive(Debug, Clone)]
pub struct CmfHasProperty {
    pub property_ref: String,
    pub min_occurs: u32,
    /// `None` means unbounded.
    pub max_occurs: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct CmfClass {
    pub id: String,
    pub name: String,
    pub namespace_ref: String,
    pub extension_ref: Option<String>,
    pub augmentable: bool,
    pub properties: Vec<CmfHasProperty>,
}

#[derive(Debug, Clone, Default)]
pub struct CmfObjectProperty {
    pub id: String,
    pub name: String,
    pub namespace_ref: String,
    pub class_ref: Option<String>,
    pub sub_property_of: Option<String>,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CmfDataProperty {
    pub id: String,
    pub name: String,
    pub namespace_ref: String,
    pub datatype_ref: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CmfModel {
    pub namespaces: Vec<CmfNamespace>,
    pub classes: Vec<CmfClass>,
    pub object_properties: Vec<CmfObjectProperty>,
    pub data_properties: Vec<CmfDataProperty>,
}

enum Current {
    None,
    Namespace(CmfNamespace),
    Class(CmfClass),
    ObjectProp(CmfObjectProperty),
    DataProp(CmfDataProperty),
}

impl CmfModel {
    pub fn parse(bytes: &[u8]) -> Result<Self, IngestError> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);
        let mut buf = Vec::new();

        let mut model = CmfModel::default();
        let mut stack: Vec<String> = Vec::new();
        let mut current = Current::None;
        let mut has_property: Option<CmfHasProperty> = None;
        let mut text = String::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| IngestError::MappingCompilation(format!("canonical model XML: {e}")))?;
            match event {
                Event::Start(ref e) => {
                    let local = local_name_of(e);
                    open_element(
                        &local,
                        e,
                        &stack,
                        &mut current,
                        &mut has_property,
                    );
                    stack.push(local);
                    text.clear();
                }
                Event::Empty(ref e) => {
                    let local = local_name_of(e);
                    open_element(&local, e, &stack, &mut current, &mut has_property);
                }
                Event::Text(ref t) => {
                    let value = t
                        .unescape()
                        .map_err(|e| {
                            IngestError::MappingCompilation(format!("canonical model text: {e}"))
                        })?;
                    text.push_str(&value);
                }
                Event::End(_) => {
                    let local = match stack.pop() {
                        Some(l) => l,
                        None => continue,
                    };
                    close_element(
                        &local,
                        text.trim(),
                        &stack,
                        &mut model,
                        &mut current,
                        &mut has_property,
                    );
                    text.clear();
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(model)
    }
}

fn open_element(
    local: &str,
    e: &BytesStart<'_>,
    stack: &[String],
    current: &mut Current,
    has_property: &mut Option<CmfHasProperty>,
) {
    let depth = stack.len();
    match local {
        // Top-level declarations (directly under Model).
        "Namespace" if depth == 1 => {
            *current = Current::Namespace(CmfNamespace {
                id: attr_local(e, "id").unwrap_or_default(),
                ..CmfNamespace::default()
            });
        }
        "Class" if depth == 1 => {
            *current = Current::Class(CmfClass {
                id: attr_local(e, "id").unwrap_or_default(),
                ..CmfClass::default()
            });
        }
        "ObjectProperty" if depth == 1 => {
            *current = Current::ObjectProp(CmfObjectProperty {
                id: attr_local(e, "id").unwrap_or_default(),
                ..CmfObjectProperty::default()
            });
        }
        "DataProperty" if depth == 1 => {
            *current = Current::DataProp(CmfDataProperty {
                id: attr_local(e, "id").unwrap_or_default(),
                ..CmfDataProperty::default()
            });
        }

        // References inside a declaration.
        "Namespace" => {
            if let Some(r) = attr_local(e, "ref") {
                match current {
                    Current::Class(c) => c.namespace_ref = r,
                    Current::ObjectProp(p) => p.namespace_ref = r,
                    Current::DataProp(p) => p.namespace_ref = r,
                    _ => {}
                }
            }
        }
        "ExtensionOfClass" => {
            if let (Current::Class(c), Some(r)) = (&mut *current, attr_local(e, "ref")) {
                c.extension_ref = Some(r);
            }
        }
        "SubPropertyOf" => {
            if let (Current::ObjectProp(p), Some(r)) = (&mut *current, attr_local(e, "ref")) {
                p.sub_property_of = Some(r);
            }
        }
        "Class" => {
            if let (Current::ObjectProp(p), Some(r)) = (&mut *current, attr_local(e, "ref")) {
                p.class_ref = Some(r);
            }
        }
        "Datatype" => {
            if let (Current::DataProp(p), Some(r)) = (&mut *current, attr_local(e, "ref")) {
                p.datatype_ref = Some(r);
            }
        }
        "HasProperty" => {
            *has_property = Some(CmfHasProperty {
                property_ref: String::new(),
                min_occurs: 0,
                max_occurs: Some(1),
            });
        }
        "ObjectProperty" | "DataProperty" => {
            // Property reference row inside HasProperty.
            if let (Some(hp), Some(r)) = (has_property.as_mut(), attr_local(e, "ref")) {
                hp.property_ref = r;
            }
        }
        _ => {}
    }
}

fn close_element(
    local: &str,
    text: &str,
    stack: &[String],
    model: &mut CmfModel,
    current: &mut Current,
    has_property: &mut Option<CmfHasProperty>,
) {
    let depth = stack.len();
    match local {
        "Name" => match current {
            Current::Class(c) => c.name = text.to_string(),
            Current::ObjectProp(p) => p.name = text.to_string(),
            Current::DataProp(p) => p.name = text.to_string(),
            _ => {}
        },
        "NamespaceURI" => {
            if let Current::Namespace(ns) = current {
                ns.uri = text.to_string();
            }
        }
        "NamespacePrefixText" => {
            if let Current::Namespace(ns) = current {
                ns.prefix = text.to_string();
            }
        }
        "AbstractIndicator" => {
            if let Current::ObjectProp(p) = current {
                p.is_abstract = text == "true";
            }
        }
        "AugmentableIndicator" => {
            if let Current::Class(c) = current {
                c.augmentable = text == "true";
            }
        }
        "MinOccursQuantity" => {
            if let Some(hp) = has_property.as_mut() {
                hp.min_occurs = text.parse().unwrap_or(0);
            }
        }
        "MaxOccursQuantity" => {
            if let Some(hp) = has_property.as_mut() {
                hp.max_occurs = if text == "unbounded" {
                    None
                } else {
                    Some(text.parse().unwrap_or(1))
                };
            }
        }
        "HasProperty" => {
            if let (Current::Class(c), Some(hp)) = (&mut *current, has_property.take()) {
                if !hp.property_ref.is_empty() {
                    c.properties.push(hp);
                }
            }
        }
        "Namespace" if depth == 1 => {
            if let Current::Namespace(ns) = std::mem::replace(current, Current::None) {
                model.namespaces.push(ns);
            }
        }
        "Class" if depth == 1 => {
            if let Current::Class(c) = std::mem::replace(current, Current::None) {
                model.classes.push(c);
            }
        }
        "ObjectProperty" if depth == 1 => {
            if let Current::ObjectProp(p) = std::mem::replace(current, Current::None) {
                model.object_properties.push(p);
            }
        }
        "DataProperty" if depth == 1 => {
            if let Current::DataProp(p) = std::mem::replace(current, Current::None) {
                model.data_properties.push(p);
            }
        }
        _ => {}
    }
}

fn local_name_of(e: &BytesStart<'_>) -> String {
    let name = e.name();
    let raw = name.as_ref();
    let local = match raw.iter().rposition(|&b| b == b':') {
        Some(pos) => &raw[pos + 1..],
        None => raw,
    };
    String::from_utf8_lossy(local).into_owned()
}

/// Attribute value matched by the attribute's local name (`structures:id`
/// and plain `id` both answer to `id`).
fn attr_local(e: &BytesStart<'_>, local: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        let key = attr.key.as_ref();
        let key_local = match key.iter().rposition(|&b| b == b':') {
            Some(pos) => &key[pos + 1..],
            None => key,
        };
        if key_local == local.as_bytes() {
            return Some(String::from_utf8_lossy(&attr.value).into_owned());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<Model xmlns="https://docs.oasis-open.org/niemopen/ns/model/cmf/1.0/"
       xmlns:structures="https://docs.oasis-open.org/niemopen/ns/model/structures/6.0/">
  <Namespace structures:id="nc">
    <NamespaceURI>https://docs.oasis-open.org/niemopen/ns/model/niem-core/6.0/</NamespaceURI>
    <NamespacePrefixText>nc</NamespacePrefixText>
  </Namespace>
  <Class structures:id="nc.PersonType">
    <Name>PersonType</Name>
    <Namespace structures:ref="nc" xsi:nil="true"/>
    <ExtensionOfClass structures:ref="structures.ObjectType"/>
    <AugmentableIndicator>true</AugmentableIndicator>
    <HasProperty>
      <DataProperty structures:ref="nc.PersonGivenName"/>
      <MinOccursQuantity>0</MinOccursQuantity>
      <MaxOccursQuantity>unbounded</MaxOccursQuantity>
    </HasProperty>
  </Class>
  <ObjectProperty structures:id="nc.Person">
    <Name>Person</Name>
    <Namespace structures:ref="nc"/>
    <Class structures:ref="nc.PersonType"/>
  </ObjectProperty>
  <DataProperty structures:id="nc.PersonGivenName">
    <Name>PersonGivenName</Name>
    <Namespace structures:ref="nc"/>
    <Datatype structures:ref="xs.string"/>
  </DataProperty>
</Model>"#;

    #[test]
    fn parses_all_declaration_kinds() {
        let model = CmfModel::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(model.namespaces.len(), 1);
        assert_eq!(model.namespaces[0].prefix, "nc");
        assert_eq!(model.classes.len(), 1);

        let class = &model.classes[0];
        assert_eq!(class.id, "nc.PersonType");
        assert_eq!(class.extension_ref.as_deref(), Some("structures.ObjectType"));
        assert!(class.augmentable);
        assert_eq!(class.properties.len(), 1);
        assert_eq!(class.properties[0].property_ref, "nc.PersonGivenName");
        assert_eq!(class.properties[0].max_occurs, None);

        assert_eq!(model.object_properties[0].class_ref.as_deref(), Some("nc.PersonType"));
        assert_eq!(model.data_properties[0].datatype_ref.as_deref(), Some("xs.string"));
    }

    #[test]
    fn malformed_cmf_is_a_compilation_error() {
        let err = CmfModel::parse(b"<Model><Class").unwrap_err();
        assert!(matches!(err, IngestError::MappingCompilation(_)));
    }
}
