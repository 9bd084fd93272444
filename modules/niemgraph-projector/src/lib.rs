//! Structural transformer: NIEM instance documents to graph mutations.
//!
//! Two sibling converters (XML, JSON) lower an instance into one normalized
//! element tree; a single projection core then applies the NIEM identity,
//! role/hub, association, and augmentation rules in two passes (nodes, then
//! edges). Because the core is shared, the XML and JSON converters agree on
//! every node and edge they emit for equivalent inputs.

pub mod convert;
pub mod identity;
pub mod json;
pub mod mutation;
pub mod project;
pub mod tree;
pub mod xml;

pub use identity::FileIdentity;
pub use mutation::{Mutation, ProjectedEdge, ProjectedNode, ProjectionOutput, PropBag, PropValue};
pub use project::{ProjectionMode, Projector, Strictness};
