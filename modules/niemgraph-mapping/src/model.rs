//! The `GraphMapping`: on-disk projection contract for one schema bundle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use niemgraph_common::error::IngestError;

/// Label of the hub node that unifies co-referenced roles.
pub const ENTITY_LABEL: &str = "Entity";

/// Edge type from an association node to each of its endpoints.
pub const ASSOCIATED_WITH: &str = "ASSOCIATED_WITH";

/// Node label from a qname: `j:Charge` -> `j_Charge`.
pub fn label_for_qname(qname: &str) -> String {
    qname.replace(':', "_")
}

/// Relationship type for an object-valued field: `HAS_` plus the ASCII
/// uppercased local name, non-alphanumerics mapped to `_`.
/// `j:PersonName` -> `HAS_PERSONNAME`.
pub fn rel_type_for_field(field_qname: &str) -> String {
    let local = field_qname.rsplit(':').next().unwrap_or(field_qname);
    let mut out = String::with_capacity(local.len() + 4);
    out.push_str("HAS_");
    for ch in local.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push('_');
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RefVia {
    #[serde(rename = "structures:ref")]
    StructuresRef,
    #[serde(rename = "structures:uri")]
    StructuresUri,
    #[serde(rename = "id-attr")]
    IdAttr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    ZeroOrOne,
    One,
    ZeroOrMany,
    OneOrMany,
}

impl Cardinality {
    pub fn from_occurs(min: u32, max: Option<u32>) -> Self {
        match (min, max) {
            (0, Some(1)) => Cardinality::ZeroOrOne,
            (_, Some(1)) => Cardinality::One,
            (0, _) => Cardinality::ZeroOrMany,
            (_, _) => Cardinality::OneOrMany,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Out,
    In,
}

/// A simple-content property of an object class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarProp {
    /// Field qname relative to the owning object, e.g. `nc:PersonGivenName`.
    pub path_from_object: String,
    /// Graph property key, the qname with `:` mapped to `_`.
    pub neo4j_property: String,
    /// Declared datatype qname, e.g. `xs:string`.
    pub datatype: String,
}

/// An element that becomes a node when it appears in an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectClass {
    pub qname: String,
    pub label: String,
    /// True when the element's type permits `structures:id`.
    pub carries_structures_id: bool,
    #[serde(default)]
    pub scalar_props: Vec<ScalarProp>,
}

/// An object-valued field: owner element contains (or references) target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDecl {
    pub owner_qname: String,
    pub field_qname: String,
    /// Label of the referenced object, or `Entity` for role references.
    pub target_label: String,
    pub rel_type: String,
    pub via: RefVia,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationEndpoint {
    pub role_qname: String,
    pub target_label: String,
    pub direction: Direction,
    pub via: RefVia,
    pub cardinality: Cardinality,
}

/// An n-ary relationship expressed as a first-class element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationDecl {
    pub qname: String,
    pub rel_type: String,
    pub endpoints: Vec<AssociationEndpoint>,
}

/// Properties and relations an augmentation adds to its target. The
/// augmentation wrapper never becomes a node of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AugmentationDecl {
    pub target_qname: String,
    #[serde(default)]
    pub added_props: Vec<ScalarProp>,
    #[serde(default)]
    pub added_relations: Vec<ReferenceDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polymorphism {
    pub strategy: String,
    pub type_property_name: String,
}

impl Default for Polymorphism {
    fn default() -> Self {
        Self {
            strategy: "extraLabel".to_string(),
            type_property_name: "xsiType".to_string(),
        }
    }
}

/// The compiled projection contract for one schema bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMapping {
    /// Prefix -> IRI. Prefixes are unique.
    pub namespaces: BTreeMap<String, String>,
    pub objects: Vec<ObjectClass>,
    pub references: Vec<ReferenceDecl>,
    pub associations: Vec<AssociationDecl>,
    pub augmentations: Vec<AugmentationDecl>,
    pub polymorphism: Polymorphism,
}

impl GraphMapping {
    pub fn empty() -> Self {
        Self {
            namespaces: BTreeMap::new(),
            objects: Vec::new(),
            references: Vec::new(),
            associations: Vec::new(),
            augmentations: Vec::new(),
            polymorphism: Polymorphism::default(),
        }
    }

    /// Apply the canonical collection ordering. Serialization of a
    /// canonicalized mapping is byte-stable.
    pub fn canonicalize(&mut self) {
        self.objects.sort_by(|a, b| a.qname.cmp(&b.qname));
        for obj in &mut self.objects {
            obj.scalar_props.sort();
        }
        self.references.sort();
        self.associations.sort_by(|a, b| a.qname.cmp(&b.qname));
        for assoc in &mut self.associations {
            assoc.endpoints.sort();
        }
        self.augmentations
            .sort_by(|a, b| a.target_qname.cmp(&b.target_qname));
        for aug in &mut self.augmentations {
            aug.added_props.sort();
            aug.added_relations.sort();
        }
    }

    pub fn to_yaml(&self) -> Result<String, IngestError> {
        serde_yaml::to_string(self)
            .map_err(|e| IngestError::MappingCompilation(format!("serialize mapping: {e}")))
    }

    pub fn from_yaml(text: &str) -> Result<Self, IngestError> {
        serde_yaml::from_str(text)
            .map_err(|e| IngestError::MappingCompilation(format!("parse mapping: {e}")))
    }

    pub fn object_by_qname(&self, qname: &str) -> Option<&ObjectClass> {
        self.objects.iter().find(|o| o.qname == qname)
    }
}
