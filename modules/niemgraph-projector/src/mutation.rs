//! Graph mutations emitted by the projector.

use std::collections::BTreeMap;

use serde::Serialize;

/// Scalar or array-valued node/edge property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    StrList(Vec<String>),
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Str(v)
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int(v)
    }
}

pub type PropBag = BTreeMap<String, PropValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedNode {
    pub id: String,
    pub labels: Vec<String>,
    pub properties: PropBag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedEdge {
    pub from_id: String,
    pub from_label: String,
    pub to_id: String,
    pub to_label: String,
    pub rel_type: String,
    pub properties: PropBag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Mutation {
    Node(ProjectedNode),
    Edge(ProjectedEdge),
}

/// Ordered emission: all nodes precede all edges, so every edge endpoint
/// that exists in the file has already been merged when the edge runs.
#[derive(Debug, Clone, Default)]
pub struct ProjectionOutput {
    pub mutations: Vec<Mutation>,
    pub warnings: Vec<String>,
}

impl ProjectionOutput {
    pub fn nodes(&self) -> impl Iterator<Item = &ProjectedNode> {
        self.mutations.iter().filter_map(|m| match m {
            Mutation::Node(n) => Some(n),
            Mutation::Edge(_) => None,
        })
    }

    pub fn edges(&self) -> impl Iterator<Item = &ProjectedEdge> {
        self.mutations.iter().filter_map(|m| match m {
            Mutation::Edge(e) => Some(e),
            Mutation::Node(_) => None,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }
}
