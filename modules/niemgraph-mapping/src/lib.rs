//! Schema-driven graph mapping.
//!
//! Consumes the canonical model (CMF) produced by the external tool and
//! compiles it into a `GraphMapping`: the projection contract that tells the
//! projector which elements become nodes, which become associations, which
//! are augmentations, and how labels and relationship types are derived.
//! Compilation is a pure function of the CMF bytes; identical bundles yield
//! byte-identical serialized mappings.

pub mod cmf;
pub mod compiler;
pub mod model;

pub use compiler::compile;
pub use model::{
    label_for_qname, rel_type_for_field, AssociationDecl, AssociationEndpoint, AugmentationDecl,
    Cardinality, Direction, GraphMapping, ObjectClass, Polymorphism, RefVia, ReferenceDecl,
    ScalarProp, ENTITY_LABEL,
};
