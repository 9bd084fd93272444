//! Compilation of a canonical model into a `GraphMapping`.
//!
//! Elements (object properties) are the unit of projection: an element whose
//! type is an ordinary object class becomes an `ObjectClass` entry; an
//! element whose type derives from the NIEM association base becomes an
//! `AssociationDecl`; an element whose type is an augmentation type is
//! folded into its owners as an `AugmentationDecl`. Scalar and object-valued
//! properties are collected through the type's extension chain.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use niemgraph_common::error::IngestError;

use crate::cmf::{CmfClass, CmfDataProperty, CmfModel, CmfObjectProperty};
use crate::model::{
    label_for_qname, rel_type_for_field, AssociationDecl, AssociationEndpoint, AugmentationDecl,
    Cardinality, Direction, GraphMapping, ObjectClass, Polymorphism, RefVia, ReferenceDecl,
    ScalarProp, ENTITY_LABEL,
};

const STRUCTURES_PREFIX: &str = "structures";

/// Compile canonical model bytes into a graph mapping. Pure: equal input
/// bytes produce an equal (and identically serialized) mapping.
pub fn compile(cmf_bytes: &[u8]) -> Result<GraphMapping, IngestError> {
    let model = CmfModel::parse(cmf_bytes)?;
    Compiler::new(&model)?.run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    Object,
    Association,
    Augmentation,
}

struct ClassFacts {
    kind: ClassKind,
    carries_structures_id: bool,
}

struct Compiler<'a> {
    prefixes: BTreeMap<&'a str, &'a str>,
    classes: BTreeMap<&'a str, &'a CmfClass>,
    object_props: BTreeMap<&'a str, &'a CmfObjectProperty>,
    data_props: BTreeMap<&'a str, &'a CmfDataProperty>,
    /// Abstract head id -> concrete substitutes.
    substitutes: BTreeMap<&'a str, Vec<&'a CmfObjectProperty>>,
    namespaces: BTreeMap<String, String>,
}

impl<'a> Compiler<'a> {
    fn new(model: &'a CmfModel) -> Result<Self, IngestError> {
        let mut prefixes: BTreeMap<&str, &str> = BTreeMap::new();
        let mut namespaces: BTreeMap<String, String> = BTreeMap::new();
        for ns in &model.namespaces {
            if let Some(existing) = namespaces.get(&ns.prefix) {
                if existing != &ns.uri {
                    return Err(IngestError::MappingCompilation(format!(
                        "prefix {} bound to both {} and {}",
                        ns.prefix, existing, ns.uri
                    )));
                }
            }
            prefixes.insert(ns.id.as_str(), ns.prefix.as_str());
            namespaces.insert(ns.prefix.clone(), ns.uri.clone());
        }

        let classes = model
            .classes
            .iter()
            .map(|c| (c.id.as_str(), c))
            .collect::<BTreeMap<_, _>>();
        let object_props = model
            .object_properties
            .iter()
            .map(|p| (p.id.as_str(), p))
            .collect::<BTreeMap<_, _>>();
        let data_props = model
            .data_properties
            .iter()
            .map(|p| (p.id.as_str(), p))
            .collect::<BTreeMap<_, _>>();

        let mut substitutes: BTreeMap<&str, Vec<&CmfObjectProperty>> = BTreeMap::new();
        for prop in model.object_properties.iter().filter(|p| !p.is_abstract) {
            if let Some(head) = &prop.sub_property_of {
                substitutes.entry(head.as_str()).or_default().push(prop);
            }
        }

        Ok(Self {
            prefixes,
            classes,
            object_props,
            data_props,
            substitutes,
            namespaces,
        })
    }

    fn run(mut self) -> Result<GraphMapping, IngestError> {
        let mut mapping = GraphMapping {
            namespaces: std::mem::take(&mut self.namespaces),
            objects: Vec::new(),
            references: Vec::new(),
            associations: Vec::new(),
            augmentations: Vec::new(),
            polymorphism: Polymorphism::default(),
        };

        // Augmentations keyed by target qname so multiple wrappers merge.
        let mut augmentations: BTreeMap<String, AugmentationDecl> = BTreeMap::new();

        for (_, prop) in &self.object_props {
            if prop.is_abstract {
                continue;
            }
            let class = match &prop.class_ref {
                Some(id) => self.class_by_id(id)?,
                None => continue,
            };
            let facts = self.class_facts(class);
            let qname = self.qname(&prop.namespace_ref, &prop.name)?;

            match facts.kind {
                ClassKind::Augmentation => {
                    // Folded into each owner below; never an object itself.
                    continue;
                }
                ClassKind::Association => {
                    mapping.associations.push(AssociationDecl {
                        qname: qname.clone(),
                        rel_type: crate::model::ASSOCIATED_WITH.to_string(),
                        endpoints: self.association_endpoints(class)?,
                    });
                }
                ClassKind::Object => {
                    mapping.objects.push(ObjectClass {
                        label: label_for_qname(&qname),
                        qname: qname.clone(),
                        carries_structures_id: facts.carries_structures_id,
                        scalar_props: self.scalar_props(class)?,
                    });
                    self.object_references(&qname, class, &mut mapping.references, &mut augmentations)?;
                }
            }
        }

        mapping.augmentations = augmentations.into_values().collect();
        self.check_targets(&mapping)?;
        mapping.canonicalize();
        debug!(
            objects = mapping.objects.len(),
            references = mapping.references.len(),
            associations = mapping.associations.len(),
            "compiled graph mapping"
        );
        Ok(mapping)
    }

    // ----- classification -------------------------------------------------

    /// Walk self and the extension chain; the first association/augmentation
    /// marker wins, and reaching any structures base grants `structures:id`.
    fn class_facts(&self, class: &'a CmfClass) -> ClassFacts {
        let mut kind = None;
        let mut carries = false;
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut cursor = Some(class);

        while let Some(c) = cursor {
            if !seen.insert(c.id.as_str()) {
                break; // cycle in extension chain
            }
            if kind.is_none() {
                if c.name.ends_with("AssociationType") {
                    kind = Some(ClassKind::Association);
                } else if c.name.ends_with("AugmentationType") {
                    kind = Some(ClassKind::Augmentation);
                }
            }
            if c.augmentable {
                carries = true;
            }
            cursor = match &c.extension_ref {
                Some(base_id) => {
                    if base_id.starts_with(STRUCTURES_PREFIX) {
                        carries = true;
                        if kind.is_none() && base_id.ends_with("AssociationType") {
                            kind = Some(ClassKind::Association);
                        }
                    }
                    self.classes.get(base_id.as_str()).copied()
                }
                None => None,
            };
        }

        ClassFacts {
            kind: kind.unwrap_or(ClassKind::Object),
            carries_structures_id: carries,
        }
    }

    // ----- property collection --------------------------------------------

    /// Data properties reachable on the class, extension chain included.
    fn scalar_props(&self, class: &'a CmfClass) -> Result<Vec<ScalarProp>, IngestError> {
        let mut props = Vec::new();
        let mut seen_paths = BTreeSet::new();
        self.walk_chain(class, |c| {
            for row in &c.properties {
                if let Some(dp) = self.data_props.get(row.property_ref.as_str()) {
                    let path = self.qname(&dp.namespace_ref, &dp.name)?;
                    if seen_paths.insert(path.clone()) {
                        props.push(ScalarProp {
                            neo4j_property: label_for_qname(&path),
                            datatype: datatype_qname(dp.datatype_ref.as_deref()),
                            path_from_object: path,
                        });
                    }
                }
            }
            Ok(())
        })?;
        Ok(props)
    }

    /// Object-valued rows of the owner become references; augmentation-typed
    /// children fold into the owner's augmentation entry.
    fn object_references(
        &self,
        owner_qname: &str,
        class: &'a CmfClass,
        references: &mut Vec<ReferenceDecl>,
        augmentations: &mut BTreeMap<String, AugmentationDecl>,
    ) -> Result<(), IngestError> {
        self.walk_chain(class, |c| {
            for row in &c.properties {
                let id = row.property_ref.as_str();
                if self.data_props.contains_key(id) {
                    continue;
                }
                let child = *self.object_props.get(id).ok_or_else(|| {
                    IngestError::MappingCompilation(format!("unresolved property {id}"))
                })?;
                let cardinality = Cardinality::from_occurs(row.min_occurs, row.max_occurs);

                if child.is_abstract {
                    // Substitution head: flatten each concrete substitute
                    // into the owning reference (extraLabel polymorphism).
                    for sub in self
                        .substitutes
                        .get(child.id.as_str())
                        .map(|v| v.as_slice())
                        .unwrap_or_default()
                    {
                        references.push(self.reference_for(owner_qname, sub, cardinality)?);
                    }
                    continue;
                }

                let child_class = match &child.class_ref {
                    Some(id) => self.class_by_id(id)?,
                    None => continue,
                };
                match self.class_facts(child_class).kind {
                    ClassKind::Augmentation => {
                        self.fold_augmentation(owner_qname, child_class, augmentations)?;
                    }
                    ClassKind::Association => {
                        // Associations are first-class nodes; containment is
                        // structural, not a declared reference (M2).
                    }
                    ClassKind::Object => {
                        references.push(self.reference_for(owner_qname, child, cardinality)?);
                    }
                }
            }
            Ok(())
        })
    }

    fn reference_for(
        &self,
        owner_qname: &str,
        child: &'a CmfObjectProperty,
        cardinality: Cardinality,
    ) -> Result<ReferenceDecl, IngestError> {
        let field_qname = self.qname(&child.namespace_ref, &child.name)?;
        // RoleOf references point at the entity hub, not at a class label.
        let (target_label, via) = if child.name.starts_with("RoleOf") {
            (ENTITY_LABEL.to_string(), RefVia::StructuresUri)
        } else {
            (label_for_qname(&field_qname), RefVia::StructuresRef)
        };
        Ok(ReferenceDecl {
            owner_qname: owner_qname.to_string(),
            rel_type: rel_type_for_field(&field_qname),
            field_qname,
            target_label,
            via,
            cardinality,
        })
    }

    fn fold_augmentation(
        &self,
        owner_qname: &str,
        aug_class: &'a CmfClass,
        augmentations: &mut BTreeMap<String, AugmentationDecl>,
    ) -> Result<(), IngestError> {
        let entry = augmentations
            .entry(owner_qname.to_string())
            .or_insert_with(|| AugmentationDecl {
                target_qname: owner_qname.to_string(),
                added_props: Vec::new(),
                added_relations: Vec::new(),
            });

        for prop in self.scalar_props(aug_class)? {
            if !entry.added_props.contains(&prop) {
                entry.added_props.push(prop);
            }
        }
        // Object-valued children of the wrapper re-parent onto the target.
        self.walk_chain(aug_class, |c| {
            for row in &c.properties {
                let id = row.property_ref.as_str();
                if self.data_props.contains_key(id) {
                    continue;
                }
                if let Some(child) = self.object_props.get(id) {
                    if child.is_abstract || child.class_ref.is_none() {
                        continue;
                    }
                    let decl = self.reference_for(
                        owner_qname,
                        child,
                        Cardinality::from_occurs(row.min_occurs, row.max_occurs),
                    )?;
                    if !entry.added_relations.contains(&decl) {
                        entry.added_relations.push(decl);
                    }
                }
            }
            Ok(())
        })?;
        Ok(())
    }

    fn association_endpoints(
        &self,
        class: &'a CmfClass,
    ) -> Result<Vec<AssociationEndpoint>, IngestError> {
        let mut endpoints = Vec::new();
        self.walk_chain(class, |c| {
            for row in &c.properties {
                let id = row.property_ref.as_str();
                if self.data_props.contains_key(id) {
                    continue;
                }
                let role = *self.object_props.get(id).ok_or_else(|| {
                    IngestError::MappingCompilation(format!("unresolved property {id}"))
                })?;
                if role.is_abstract {
                    continue;
                }
                let role_qname = self.qname(&role.namespace_ref, &role.name)?;
                let target_label = if role.name.starts_with("RoleOf") {
                    ENTITY_LABEL.to_string()
                } else {
                    label_for_qname(&role_qname)
                };
                endpoints.push(AssociationEndpoint {
                    role_qname,
                    target_label,
                    direction: Direction::Out,
                    via: RefVia::StructuresRef,
                    cardinality: Cardinality::from_occurs(row.min_occurs, row.max_occurs),
                });
            }
            Ok(())
        })?;
        Ok(endpoints)
    }

    // ----- plumbing -------------------------------------------------------

    fn walk_chain<F>(&self, class: &'a CmfClass, mut visit: F) -> Result<(), IngestError>
    where
        F: FnMut(&'a CmfClass) -> Result<(), IngestError>,
    {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut cursor = Some(class);
        while let Some(c) = cursor {
            if !seen.insert(c.id.as_str()) {
                break;
            }
            visit(c)?;
            cursor = c
                .extension_ref
                .as_deref()
                .and_then(|id| self.classes.get(id).copied());
        }
        Ok(())
    }

    fn class_by_id(&self, id: &str) -> Result<&'a CmfClass, IngestError> {
        self.classes
            .get(id)
            .copied()
            .ok_or_else(|| IngestError::MappingCompilation(format!("unresolved class {id}")))
    }

    fn qname(&self, ns_ref: &str, name: &str) -> Result<String, IngestError> {
        let prefix = match self.prefixes.get(ns_ref) {
            Some(p) => p,
            None if ns_ref == STRUCTURES_PREFIX => STRUCTURES_PREFIX,
            None => {
                return Err(IngestError::MappingCompilation(format!(
                    "unknown namespace {ns_ref} for {name}"
                )))
            }
        };
        Ok(format!("{prefix}:{name}"))
    }

    /// Every reference and endpoint target must be the label of exactly one
    /// object or the entity hub.
    fn check_targets(&self, mapping: &GraphMapping) -> Result<(), IngestError> {
        let labels: BTreeSet<&str> = mapping.objects.iter().map(|o| o.label.as_str()).collect();
        let check = |label: &str, what: &str| {
            if label != ENTITY_LABEL && !labels.contains(label) {
                return Err(IngestError::MappingCompilation(format!(
                    "{what} targets unknown label {label}"
                )));
            }
            Ok(())
        };
        for r in &mapping.references {
            check(&r.target_label, &format!("reference {}", r.field_qname))?;
        }
        for a in &mapping.associations {
            for e in &a.endpoints {
                check(&e.target_label, &format!("association {}", a.qname))?;
            }
        }
        Ok(())
    }
}

fn datatype_qname(datatype_ref: Option<&str>) -> String {
    match datatype_ref {
        Some(id) => id.replacen('.', ":", 1),
        None => "xs:string".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Crash-driver shaped canonical model: a person object with scalar
    /// props, a role class, a charge, an association, and an augmentation.
    const CMF: &str = r#"<?xml version="1.0"?>
<Model xmlns="https://docs.oasis-open.org/niemopen/ns/model/cmf/1.0/"
       xmlns:structures="https://docs.oasis-open.org/niemopen/ns/model/structures/6.0/">
  <Namespace structures:id="nc">
    <NamespaceURI>https://example.org/niem-core/</NamespaceURI>
    <NamespacePrefixText>nc</NamespacePrefixText>
  </Namespace>
  <Namespace structures:id="j">
    <NamespaceURI>https://example.org/justice/</NamespaceURI>
    <NamespacePrefixText>j</NamespacePrefixText>
  </Namespace>

  <Class structures:id="nc.PersonType">
    <Name>PersonType</Name>
    <Namespace structures:ref="nc"/>
    <ExtensionOfClass structures:ref="structures.ObjectType"/>
    <AugmentableIndicator>true</AugmentableIndicator>
    <HasProperty>
      <DataProperty structures:ref="nc.PersonGivenName"/>
      <MinOccursQuantity>0</MinOccursQuantity>
      <MaxOccursQuantity>1</MaxOccursQuantity>
    </HasProperty>
    <HasProperty>
      <ObjectProperty structures:ref="j.PersonAugmentation"/>
      <MinOccursQuantity>0</MinOccursQuantity>
      <MaxOccursQuantity>1</MaxOccursQuantity>
    </HasProperty>
  </Class>

  <Class structures:id="j.CrashDriverType">
    <Name>CrashDriverType</Name>
    <Namespace structures:ref="j"/>
    <ExtensionOfClass structures:ref="nc.PersonType"/>
    <HasProperty>
      <ObjectProperty structures:ref="nc.RoleOfPerson"/>
      <MinOccursQuantity>1</MinOccursQuantity>
      <MaxOccursQuantity>1</MaxOccursQuantity>
    </HasProperty>
  </Class>

  <Class structures:id="j.ChargeType">
    <Name>ChargeType</Name>
    <Namespace structures:ref="j"/>
    <ExtensionOfClass structures:ref="structures.ObjectType"/>
    <HasProperty>
      <DataProperty structures:ref="j.ChargeDescriptionText"/>
      <MinOccursQuantity>0</MinOccursQuantity>
      <MaxOccursQuantity>1</MaxOccursQuantity>
    </HasProperty>
  </Class>

  <Class structures:id="j.PersonChargeAssociationType">
    <Name>PersonChargeAssociationType</Name>
    <Namespace structures:ref="j"/>
    <ExtensionOfClass structures:ref="structures.AssociationType"/>
    <HasProperty>
      <ObjectProperty structures:ref="nc.Person"/>
      <MinOccursQuantity>1</MinOccursQuantity>
      <MaxOccursQuantity>1</MaxOccursQuantity>
    </HasProperty>
    <HasProperty>
      <ObjectProperty structures:ref="j.Charge"/>
      <MinOccursQuantity>1</MinOccursQuantity>
      <MaxOccursQuantity>unbounded</MaxOccursQuantity>
    </HasProperty>
  </Class>

  <Class structures:id="j.PersonAugmentationType">
    <Name>PersonAugmentationType</Name>
    <Namespace structures:ref="j"/>
    <ExtensionOfClass structures:ref="structures.AugmentationType"/>
    <HasProperty>
      <DataProperty structures:ref="j.PersonAdultIndicator"/>
      <MinOccursQuantity>0</MinOccursQuantity>
      <MaxOccursQuantity>1</MaxOccursQuantity>
    </HasProperty>
  </Class>

  <ObjectProperty structures:id="nc.Person">
    <Name>Person</Name>
    <Namespace structures:ref="nc"/>
    <Class structures:ref="nc.PersonType"/>
  </ObjectProperty>
  <ObjectProperty structures:id="nc.RoleOfPerson">
    <Name>RoleOfPerson</Name>
    <Namespace structures:ref="nc"/>
    <Class structures:ref="nc.PersonType"/>
  </ObjectProperty>
  <ObjectProperty structures:id="j.CrashDriver">
    <Name>CrashDriver</Name>
    <Namespace structures:ref="j"/>
    <Class structures:ref="j.CrashDriverType"/>
  </ObjectProperty>
  <ObjectProperty structures:id="j.Charge">
    <Name>Charge</Name>
    <Namespace structures:ref="j"/>
    <Class structures:ref="j.ChargeType"/>
  </ObjectProperty>
  <ObjectProperty structures:id="j.PersonChargeAssociation">
    <Name>PersonChargeAssociation</Name>
    <Namespace structures:ref="j"/>
    <Class structures:ref="j.PersonChargeAssociationType"/>
  </ObjectProperty>
  <ObjectProperty structures:id="j.PersonAugmentation">
    <Name>PersonAugmentation</Name>
    <Namespace structures:ref="j"/>
    <Class structures:ref="j.PersonAugmentationType"/>
  </ObjectProperty>

  <DataProperty structures:id="nc.PersonGivenName">
    <Name>PersonGivenName</Name>
    <Namespace structures:ref="nc"/>
    <Datatype structures:ref="xs.string"/>
  </DataProperty>
  <DataProperty structures:id="j.ChargeDescriptionText">
    <Name>ChargeDescriptionText</Name>
    <Namespace structures:ref="j"/>
    <Datatype structures:ref="xs.string"/>
  </DataProperty>
  <DataProperty structures:id="j.PersonAdultIndicator">
    <Name>PersonAdultIndicator</Name>
    <Namespace structures:ref="j"/>
    <Datatype structures:ref="xs.boolean"/>
  </DataProperty>
</Model>"#;

    #[test]
    fn objects_get_labels_and_inherited_scalars() {
        let mapping = compile(CMF.as_bytes()).unwrap();

        let charge = mapping.object_by_qname("j:Charge").unwrap();
        assert_eq!(charge.label, "j_Charge");
        assert!(charge.carries_structures_id);
        assert_eq!(charge.scalar_props.len(), 1);
        assert_eq!(charge.scalar_props[0].neo4j_property, "j_ChargeDescriptionText");

        // CrashDriverType extends PersonType: inherits PersonGivenName.
        let driver = mapping.object_by_qname("j:CrashDriver").unwrap();
        assert!(driver
            .scalar_props
            .iter()
            .any(|p| p.path_from_object == "nc:PersonGivenName"));
    }

    #[test]
    fn role_reference_targets_the_entity_hub() {
        let mapping = compile(CMF.as_bytes()).unwrap();
        let role_ref = mapping
            .references
            .iter()
            .find(|r| r.owner_qname == "j:CrashDriver" && r.field_qname == "nc:RoleOfPerson")
            .unwrap();
        assert_eq!(role_ref.target_label, ENTITY_LABEL);
        assert_eq!(role_ref.via, RefVia::StructuresUri);
    }

    #[test]
    fn association_is_first_class_with_role_endpoints() {
        let mapping = compile(CMF.as_bytes()).unwrap();
        assert_eq!(mapping.associations.len(), 1);
        let assoc = &mapping.associations[0];
        assert_eq!(assoc.qname, "j:PersonChargeAssociation");
        assert_eq!(assoc.rel_type, "ASSOCIATED_WITH");
        let roles: Vec<_> = assoc.endpoints.iter().map(|e| e.role_qname.as_str()).collect();
        assert_eq!(roles, vec!["j:Charge", "nc:Person"]);
        // The association element itself never appears as an object.
        assert!(mapping.object_by_qname("j:PersonChargeAssociation").is_none());
    }

    #[test]
    fn augmentation_folds_into_its_target() {
        let mapping = compile(CMF.as_bytes()).unwrap();
        // PersonType owns the augmentation point; both Person-typed elements
        // inherit it.
        let person_aug = mapping
            .augmentations
            .iter()
            .find(|a| a.target_qname == "nc:Person")
            .unwrap();
        assert_eq!(person_aug.added_props.len(), 1);
        assert_eq!(person_aug.added_props[0].neo4j_property, "j_PersonAdultIndicator");
        assert!(mapping.object_by_qname("j:PersonAugmentation").is_none());
    }

    #[test]
    fn rel_types_follow_the_has_convention() {
        let mapping = compile(CMF.as_bytes()).unwrap();
        let any_ref = mapping
            .references
            .iter()
            .find(|r| r.field_qname == "nc:RoleOfPerson")
            .unwrap();
        assert_eq!(any_ref.rel_type, "HAS_ROLEOFPERSON");
    }

    #[test]
    fn compilation_is_deterministic() {
        let a = compile(CMF.as_bytes()).unwrap().to_yaml().unwrap();
        let b = compile(CMF.as_bytes()).unwrap().to_yaml().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_prefix_with_different_iri_fails() {
        let cmf = r#"<Model>
  <Namespace structures:id="nc"><NamespaceURI>urn:a</NamespaceURI><NamespacePrefixText>nc</NamespacePrefixText></Namespace>
  <Namespace structures:id="nc2"><NamespaceURI>urn:b</NamespaceURI><NamespacePrefixText>nc</NamespacePrefixText></Namespace>
</Model>"#;
        let err = compile(cmf.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::MappingCompilation(_)));
    }

    #[test]
    fn unresolved_property_target_fails() {
        let cmf = r#"<Model>
  <Namespace structures:id="a"><NamespaceURI>urn:a</NamespaceURI><NamespacePrefixText>a</NamespacePrefixText></Namespace>
  <Class structures:id="a.ThingType">
    <Name>ThingType</Name>
    <Namespace structures:ref="a"/>
    <ExtensionOfClass structures:ref="structures.ObjectType"/>
    <HasProperty><ObjectProperty structures:ref="a.Missing"/><MinOccursQuantity>1</MinOccursQuantity><MaxOccursQuantity>1</MaxOccursQuantity></HasProperty>
  </Class>
  <ObjectProperty structures:id="a.Thing">
    <Name>Thing</Name>
    <Namespace structures:ref="a"/>
    <Class structures:ref="a.ThingType"/>
  </ObjectProperty>
</Model>"#;
        let err = compile(cmf.as_bytes()).unwrap_err();
        match err {
            IngestError::MappingCompilation(msg) => assert!(msg.contains("a.Missing")),
            other => panic!("unexpected: {other}"),
        }
    }
}
