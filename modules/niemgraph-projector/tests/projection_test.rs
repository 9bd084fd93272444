//! End-to-end projection scenarios over both converters.

use std::collections::BTreeMap;

use tokio_util::sync::CancellationToken;

use niemgraph_mapping::{
    AssociationDecl, AssociationEndpoint, AugmentationDecl, Cardinality, Direction, GraphMapping,
    ObjectClass, RefVia, ReferenceDecl, ScalarProp,
};
use niemgraph_projector::convert::xml_to_json;
use niemgraph_projector::{
    FileIdentity, Mutation, ProjectedEdge, ProjectedNode, ProjectionMode, ProjectionOutput,
    Projector, PropValue,
};

fn ident(name: &str, upload: &str, bytes: &[u8]) -> FileIdentity {
    FileIdentity::new(name, upload, bytes, "bundle01")
}

fn object(qname: &str) -> ObjectClass {
    ObjectClass {
        qname: qname.to_string(),
        label: qname.replace(':', "_"),
        carries_structures_id: true,
        scalar_props: Vec::new(),
    }
}

/// Crash-driver flavored mapping used across the scenarios.
fn mapping() -> GraphMapping {
    let mut m = GraphMapping::empty();
    m.namespaces
        .insert("j".to_string(), "https://example.org/justice/".to_string());
    m.namespaces
        .insert("nc".to_string(), "https://example.org/niem-core/".to_string());
    m.objects = vec![
        object("j:Charge"),
        object("j:CrashDriver"),
        object("j:CrashPerson"),
        object("nc:Person"),
    ];
    m.references = vec![ReferenceDecl {
        owner_qname: "exch:Doc".to_string(),
        field_qname: "j:Charge".to_string(),
        target_label: "j_Charge".to_string(),
        rel_type: "HAS_CHARGE".to_string(),
        via: RefVia::StructuresRef,
        cardinality: Cardinality::ZeroOrMany,
    }];
    m.associations = vec![AssociationDecl {
        qname: "j:PersonChargeAssociation".to_string(),
        rel_type: "ASSOCIATED_WITH".to_string(),
        endpoints: vec![
            AssociationEndpoint {
                role_qname: "nc:Person".to_string(),
                target_label: "nc_Person".to_string(),
                direction: Direction::Out,
                via: RefVia::StructuresRef,
                cardinality: Cardinality::One,
            },
            AssociationEndpoint {
                role_qname: "j:Charge".to_string(),
                target_label: "j_Charge".to_string(),
                direction: Direction::Out,
                via: RefVia::StructuresRef,
                cardinality: Cardinality::One,
            },
        ],
    }];
    m.augmentations = vec![AugmentationDecl {
        target_qname: "j:CrashDriver".to_string(),
        added_props: vec![ScalarProp {
            path_from_object: "j:PersonAdultIndicator".to_string(),
            neo4j_property: "j_PersonAdultIndicator".to_string(),
            datatype: "xs:boolean".to_string(),
        }],
        added_relations: Vec::new(),
    }];
    m.canonicalize();
    m
}

fn project_xml(mode: ProjectionMode<'_>, xml: &[u8], name: &str, upload: &str) -> ProjectionOutput {
    let projector = Projector::new(mode);
    projector
        .project_xml(xml, &ident(name, upload, xml), &CancellationToken::new())
        .unwrap()
}

fn nodes(output: &ProjectionOutput) -> Vec<&ProjectedNode> {
    output.nodes().collect()
}

fn edges(output: &ProjectionOutput) -> Vec<&ProjectedEdge> {
    output.edges().collect()
}

fn str_prop<'a>(node: &'a ProjectedNode, key: &str) -> Option<&'a str> {
    match node.properties.get(key) {
        Some(PropValue::Str(s)) => Some(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// S1 — minimal XML, dynamic mode
// ---------------------------------------------------------------------------

#[test]
fn s1_minimal_dynamic_document_is_one_node() {
    let xml = b"<root><a>1</a><b>2</b></root>";
    let out = project_xml(ProjectionMode::Dynamic, xml, "min.xml", "u1");

    let ns = nodes(&out);
    assert_eq!(ns.len(), 1);
    assert_eq!(edges(&out).len(), 0);

    let root = ns[0];
    assert!(root.id.contains("_syn_"));
    assert_eq!(root.labels, vec!["root"]);
    assert_eq!(str_prop(root, "a"), Some("1"));
    assert_eq!(str_prop(root, "b"), Some("2"));
    assert_eq!(str_prop(root, "qname"), Some("root"));
    assert_eq!(str_prop(root, "sourceDoc"), Some("min.xml"));
    assert_eq!(str_prop(root, "_schema_id"), Some("bundle01"));
}

// ---------------------------------------------------------------------------
// S2 — explicit id and reference carrier
// ---------------------------------------------------------------------------

#[test]
fn s2_explicit_id_and_reference() {
    let m = mapping();
    let xml = br#"<exch:Doc>
        <j:Charge structures:id="CH01"><j:ChargeText>Speeding</j:ChargeText></j:Charge>
        <j:Ref structures:ref="CH01" xsi:nil="true"/>
    </exch:Doc>"#;
    let out = project_xml(ProjectionMode::Mapped(&m), xml, "doc.xml", "u1");

    // Root and the charge; the reference carrier creates no node.
    let ns = nodes(&out);
    assert_eq!(ns.len(), 2);
    let charge = ns.iter().find(|n| n.labels[0] == "j_Charge").unwrap();
    assert!(charge.id.ends_with("_CH01"));
    assert_eq!(str_prop(charge, "structures_id"), Some("CH01"));
    assert_eq!(str_prop(charge, "j_ChargeText"), Some("Speeding"));

    let has_ref: Vec<_> = edges(&out)
        .into_iter()
        .filter(|e| e.rel_type == "HAS_REF")
        .collect();
    assert_eq!(has_ref.len(), 1);
    assert_eq!(has_ref[0].to_id, charge.id);

    // The inline charge also hangs off its parent with the declared type.
    assert!(edges(&out).iter().any(|e| e.rel_type == "HAS_CHARGE"));
}

// ---------------------------------------------------------------------------
// S3 — hub pattern for co-referenced roles
// ---------------------------------------------------------------------------

#[test]
fn s3_shared_uri_builds_roles_and_hub() {
    let m = mapping();
    let xml = br##"<exch:Doc>
        <j:CrashDriver structures:uri="#P01"><nc:PersonGivenName>Jo</nc:PersonGivenName></j:CrashDriver>
        <j:CrashPerson structures:uri="#P01"><nc:PersonGivenName>Jo</nc:PersonGivenName></j:CrashPerson>
    </exch:Doc>"##;
    let out = project_xml(ProjectionMode::Mapped(&m), xml, "crash.xml", "u1");

    let ns = nodes(&out);
    let roles: Vec<_> = ns
        .iter()
        .filter(|n| matches!(n.properties.get("_isRole"), Some(PropValue::Bool(true))))
        .collect();
    assert_eq!(roles.len(), 2);
    for role in &roles {
        assert_eq!(str_prop(role, "structures_uri"), Some("#P01"));
        assert!(role.id.contains("_syn_"));
    }

    let hub = ns
        .iter()
        .find(|n| matches!(n.properties.get("_isHub"), Some(PropValue::Bool(true))))
        .unwrap();
    assert!(hub.id.ends_with("_hub_P01"));
    assert_eq!(hub.labels, vec!["Entity", "Entity_P01"]);
    assert_eq!(str_prop(hub, "entity_id"), Some("P01"));
    assert_eq!(str_prop(hub, "uri_value"), Some("#P01"));
    assert_eq!(hub.properties.get("role_count"), Some(&PropValue::Int(2)));
    assert_eq!(
        hub.properties.get("role_types"),
        Some(&PropValue::StrList(vec![
            "j:CrashDriver".to_string(),
            "j:CrashPerson".to_string()
        ]))
    );

    let represents: Vec<_> = edges(&out)
        .into_iter()
        .filter(|e| e.rel_type == "REPRESENTS")
        .collect();
    assert_eq!(represents.len(), 2);
    assert!(represents.iter().all(|e| e.to_id == hub.id));
}

#[test]
fn s3_single_uri_occurrence_makes_no_hub() {
    let m = mapping();
    let xml = br##"<exch:Doc>
        <j:CrashDriver structures:uri="#P01"><nc:PersonGivenName>Jo</nc:PersonGivenName></j:CrashDriver>
    </exch:Doc>"##;
    let out = project_xml(ProjectionMode::Mapped(&m), xml, "crash.xml", "u1");

    assert!(!nodes(&out)
        .iter()
        .any(|n| matches!(n.properties.get("_isHub"), Some(PropValue::Bool(true)))));
    assert!(!edges(&out).iter().any(|e| e.rel_type == "REPRESENTS"));
    // Projected as an ordinary node; the uri is consumed.
    let driver = nodes(&out)
        .into_iter()
        .find(|n| n.labels[0] == "j_CrashDriver")
        .unwrap();
    assert!(driver.properties.get("structures_uri").is_none());
}

// ---------------------------------------------------------------------------
// S4 — association
// ---------------------------------------------------------------------------

#[test]
fn s4_association_emits_role_edges() {
    let m = mapping();
    let xml = br#"<exch:Doc>
        <nc:Person structures:id="P01"/>
        <j:Charge structures:id="CH01"/>
        <j:PersonChargeAssociation>
            <nc:Person structures:ref="P01"/>
            <j:Charge structures:ref="CH01"/>
        </j:PersonChargeAssociation>
    </exch:Doc>"#;
    let out = project_xml(ProjectionMode::Mapped(&m), xml, "assoc.xml", "u1");

    let ns = nodes(&out);
    let assoc = ns
        .iter()
        .find(|n| matches!(n.properties.get("_isAssociation"), Some(PropValue::Bool(true))))
        .unwrap();
    assert_eq!(assoc.labels[0], "j_PersonChargeAssociation");

    let assoc_edges: Vec<_> = edges(&out)
        .into_iter()
        .filter(|e| e.rel_type == "ASSOCIATED_WITH")
        .collect();
    assert_eq!(assoc_edges.len(), 2);
    let mut role_qnames: Vec<_> = assoc_edges
        .iter()
        .map(|e| match e.properties.get("role_qname") {
            Some(PropValue::Str(s)) => s.as_str(),
            _ => "",
        })
        .collect();
    role_qnames.sort();
    assert_eq!(role_qnames, vec!["j:Charge", "nc:Person"]);
    // Both endpoints resolve to the projected id-carrying nodes.
    assert!(assoc_edges.iter().all(|e| e.from_id == assoc.id));
    assert!(assoc_edges.iter().any(|e| e.to_id.ends_with("_P01")));
    assert!(assoc_edges.iter().any(|e| e.to_id.ends_with("_CH01")));
}

// ---------------------------------------------------------------------------
// S5 — augmentation folds into its parent
// ---------------------------------------------------------------------------

#[test]
fn s5_augmentation_becomes_parent_properties() {
    let m = mapping();
    let xml = br#"<exch:Doc>
        <j:CrashDriver>
            <j:PersonAugmentation>
                <j:PersonAdultIndicator>true</j:PersonAdultIndicator>
            </j:PersonAugmentation>
        </j:CrashDriver>
    </exch:Doc>"#;
    let out = project_xml(ProjectionMode::Mapped(&m), xml, "aug.xml", "u1");

    let ns = nodes(&out);
    // Root and driver only; no node for the wrapper.
    assert_eq!(ns.len(), 2);
    let driver = ns.iter().find(|n| n.labels[0] == "j_CrashDriver").unwrap();
    // The mapping declares xs:boolean, so the value lands typed.
    assert_eq!(
        driver.properties.get("j_PersonAdultIndicator"),
        Some(&PropValue::Bool(true))
    );
    assert_eq!(
        driver.properties.get("j_PersonAdultIndicator_isAugmentation"),
        Some(&PropValue::Bool(true))
    );
}

// ---------------------------------------------------------------------------
// Strictness and flattening
// ---------------------------------------------------------------------------

#[test]
fn unknown_structural_element_fails_strict_xml() {
    let m = mapping();
    let xml = br#"<exch:Doc><exch:Mystery structures:id="M01"><a>1</a></exch:Mystery></exch:Doc>"#;
    let projector = Projector::new(ProjectionMode::Mapped(&m));
    let err = projector
        .project_xml(xml, &ident("bad.xml", "u1", xml), &CancellationToken::new())
        .unwrap_err();
    assert!(err.to_string().contains("unknown element"));
}

#[test]
fn unknown_structural_element_warns_lenient_json() {
    let m = mapping();
    let json = br#"{"exch:Doc": {"exch:Mystery": {"@id": "M01", "a": "1", "b": "2"}}}"#;
    let projector = Projector::new(ProjectionMode::Mapped(&m));
    let out = projector
        .project_json(json, &ident("bad.json", "u1", json), &CancellationToken::new())
        .unwrap();
    assert!(out.warnings.iter().any(|w| w.contains("exch:Mystery")));
    assert_eq!(out.node_count(), 1); // just the root
}

#[test]
fn unlisted_property_container_flattens_with_path_keys() {
    let m = mapping();
    let xml = br#"<exch:Doc>
        <nc:Person structures:id="P01">
            <nc:PersonName><nc:PersonGivenName>Jo</nc:PersonGivenName></nc:PersonName>
        </nc:Person>
    </exch:Doc>"#;
    let out = project_xml(ProjectionMode::Mapped(&m), xml, "flat.xml", "u1");

    let person = nodes(&out)
        .into_iter()
        .find(|n| n.labels[0] == "nc_Person")
        .unwrap();
    assert_eq!(
        str_prop(person, "nc_PersonName__nc_PersonGivenName"),
        Some("Jo")
    );
}

#[test]
fn dangling_reference_is_a_warning_not_a_failure() {
    let m = mapping();
    let xml = br#"<exch:Doc><j:Ref structures:ref="NOPE" xsi:nil="true"/></exch:Doc>"#;
    let out = project_xml(ProjectionMode::Mapped(&m), xml, "dang.xml", "u1");
    assert!(out.warnings.iter().any(|w| w.contains("dangling")));
    assert_eq!(out.edge_count(), 1);
    assert!(edges(&out)[0].to_id.ends_with("_NOPE"));
}

// ---------------------------------------------------------------------------
// Universal properties
// ---------------------------------------------------------------------------

fn corpus_xml() -> &'static [u8] {
    br##"<exch:Doc>
        <nc:Person structures:id="P01"><nc:PersonGivenName>Jo</nc:PersonGivenName></nc:Person>
        <j:Charge structures:id="CH01"><j:ChargeText>Speeding</j:ChargeText></j:Charge>
        <j:CrashDriver structures:uri="#E1"><nc:PersonGivenName>Jo</nc:PersonGivenName></j:CrashDriver>
        <j:CrashPerson structures:uri="#E1"><nc:PersonMiddleName>A</nc:PersonMiddleName><nc:PersonMiddleName>B</nc:PersonMiddleName></j:CrashPerson>
        <j:PersonChargeAssociation>
            <nc:Person structures:ref="P01"/>
            <j:Charge structures:ref="CH01"/>
        </j:PersonChargeAssociation>
    </exch:Doc>"##
}

#[test]
fn t1_node_ids_are_unique_within_a_file() {
    let m = mapping();
    let out = project_xml(ProjectionMode::Mapped(&m), corpus_xml(), "c.xml", "u1");
    let mut ids: Vec<_> = out.nodes().map(|n| n.id.clone()).collect();
    let before = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), before);
}

#[test]
fn t2_distinct_files_emit_disjoint_ids() {
    let m = mapping();
    let a = project_xml(ProjectionMode::Mapped(&m), corpus_xml(), "c.xml", "u1");
    let b = project_xml(ProjectionMode::Mapped(&m), corpus_xml(), "c.xml", "u2");
    let ids_a: std::collections::BTreeSet<_> = a.nodes().map(|n| n.id.clone()).collect();
    let ids_b: std::collections::BTreeSet<_> = b.nodes().map(|n| n.id.clone()).collect();
    assert!(ids_a.is_disjoint(&ids_b));
}

#[test]
fn t3_edge_endpoints_exist_in_the_same_file() {
    let m = mapping();
    let out = project_xml(ProjectionMode::Mapped(&m), corpus_xml(), "c.xml", "u1");
    let ids: std::collections::BTreeSet<_> = out.nodes().map(|n| n.id.as_str()).collect();
    for edge in out.edges() {
        assert!(ids.contains(edge.from_id.as_str()), "missing {}", edge.from_id);
        assert!(ids.contains(edge.to_id.as_str()), "missing {}", edge.to_id);
    }
}

#[test]
fn t5_projection_is_deterministic() {
    let m = mapping();
    let a = project_xml(ProjectionMode::Mapped(&m), corpus_xml(), "c.xml", "u1");
    let b = project_xml(ProjectionMode::Mapped(&m), corpus_xml(), "c.xml", "u1");
    assert_eq!(a.mutations, b.mutations);
}

// ---------------------------------------------------------------------------
// T10 — format parity, modulo synthetic-id renaming
// ---------------------------------------------------------------------------

type NodeKey = (Vec<String>, Vec<(String, String)>);

fn node_key(node: &ProjectedNode) -> NodeKey {
    let props = node
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), format!("{v:?}")))
        .collect();
    (node.labels.clone(), props)
}

fn tuples(output: &ProjectionOutput) -> (Vec<NodeKey>, Vec<(String, NodeKey, NodeKey, String)>) {
    let by_id: BTreeMap<&str, &ProjectedNode> =
        output.nodes().map(|n| (n.id.as_str(), n)).collect();
    let mut node_keys: Vec<NodeKey> = output.nodes().map(node_key).collect();
    node_keys.sort();
    let mut edge_keys: Vec<_> = output
        .edges()
        .map(|e| {
            let from = by_id.get(e.from_id.as_str()).map(|n| node_key(n)).unwrap_or_default();
            let to = by_id.get(e.to_id.as_str()).map(|n| node_key(n)).unwrap_or_default();
            let props = format!("{:?}", e.properties);
            (e.rel_type.clone(), from, to, props)
        })
        .collect();
    edge_keys.sort();
    (node_keys, edge_keys)
}

#[test]
fn t10_xml_and_converted_json_project_identically() {
    let m = mapping();
    let xml = corpus_xml();
    let json = xml_to_json(xml).unwrap();

    let projector = Projector::new(ProjectionMode::Mapped(&m));
    let from_xml = projector
        .project_xml(xml, &ident("c.xml", "u1", xml), &CancellationToken::new())
        .unwrap();
    let from_json = projector
        .project_json(
            json.as_bytes(),
            &ident("c.json", "u1", json.as_bytes()),
            &CancellationToken::new(),
        )
        .unwrap();

    let (nodes_xml, edges_xml) = tuples(&from_xml);
    let (nodes_json, edges_json) = tuples(&from_json);

    // sourceDoc necessarily differs between the twins; scrub it.
    let scrub = |keys: Vec<NodeKey>| -> Vec<NodeKey> {
        keys.into_iter()
            .map(|(labels, props)| {
                (
                    labels,
                    props
                        .into_iter()
                        .filter(|(k, _)| k != "sourceDoc")
                        .collect(),
                )
            })
            .collect()
    };
    assert_eq!(scrub(nodes_xml), scrub(nodes_json));

    let scrub_edges = |keys: Vec<(String, NodeKey, NodeKey, String)>| -> Vec<_> {
        keys.into_iter()
            .map(|(rel, from, to, props)| {
                let strip = |(labels, props): NodeKey| -> NodeKey {
                    (
                        labels,
                        props
                            .into_iter()
                            .filter(|(k, _)| k != "sourceDoc")
                            .collect(),
                    )
                };
                (rel, strip(from), strip(to), props)
            })
            .collect()
    };
    assert_eq!(scrub_edges(edges_xml), scrub_edges(edges_json));
}
