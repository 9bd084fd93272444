//! Transactional MERGE writer over Bolt.
//!
//! Exactly two statement shapes reach the database: a node MERGE and an
//! edge MATCH..MERGE. Statement text contains only labels and relationship
//! types drawn from the mapping and sanitised to `[A-Za-z0-9_]`; every value
//! from instance bytes travels in parameters. A created-flag bookkeeping
//! clause reports how many nodes and edges the MERGE actually created.

use async_trait::async_trait;
use neo4rs::{
    query, BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltString, BoltType,
};
use tracing::{debug, warn};

use niemgraph_common::error::IngestError;
use niemgraph_projector::{Mutation, ProjectedEdge, ProjectedNode, PropBag, PropValue};

use crate::sink::{GraphSink, SinkStats};
use crate::GraphClient;

/// Write-side wrapper for the graph. Used by the ingest orchestrator only.
pub struct GraphWriter {
    client: GraphClient,
}

impl GraphWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GraphSink for GraphWriter {
    async fn apply(
        &self,
        source_doc: &str,
        mutations: &[Mutation],
    ) -> Result<SinkStats, IngestError> {
        let mut txn = self
            .client
            .graph
            .start_txn()
            .await
            .map_err(|e| IngestError::Sink(format!("begin transaction: {e}")))?;

        let mut stats = SinkStats::default();
        for mutation in mutations {
            let q = match mutation {
                Mutation::Node(node) => node_query(node)?,
                Mutation::Edge(edge) => edge_query(edge)?,
            };
            let mut stream = txn
                .execute(q)
                .await
                .map_err(|e| IngestError::Sink(format!("run statement: {e}")))?;
            let created = match stream.next(txn.handle()).await {
                Ok(Some(row)) => row.get::<bool>("created").unwrap_or(false),
                Ok(None) => false,
                Err(e) => {
                    // Abandoning the txn without commit rolls it back.
                    warn!(file = source_doc, error = %e, "statement failed, aborting file transaction");
                    return Err(IngestError::Sink(format!("statement failed: {e}")));
                }
            };
            if created {
                match mutation {
                    Mutation::Node(_) => stats.nodes_created += 1,
                    Mutation::Edge(_) => stats.edges_created += 1,
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| IngestError::Sink(format!("commit: {e}")))?;
        debug!(
            file = source_doc,
            nodes = stats.nodes_created,
            edges = stats.edges_created,
            "committed file transaction"
        );
        Ok(stats)
    }
}

fn node_query(node: &ProjectedNode) -> Result<neo4rs::Query, IngestError> {
    let statement = node_statement(&node.labels)?;
    Ok(query(&statement)
        .param("id", node.id.as_str())
        .param("props", bolt_props(&node.properties)))
}

fn edge_query(edge: &ProjectedEdge) -> Result<neo4rs::Query, IngestError> {
    let statement = edge_statement(&edge.rel_type)?;
    Ok(query(&statement)
        .param("from", edge.from_id.as_str())
        .param("to", edge.to_id.as_str())
        .param("props", bolt_props(&edge.properties)))
}

/// `MERGE (n:`L1`:`L2` {id:$id}) … SET n += $props` with created bookkeeping.
fn node_statement(labels: &[String]) -> Result<String, IngestError> {
    let mut label_spec = String::new();
    for label in labels {
        label_spec.push_str(":`");
        label_spec.push_str(identifier(label)?);
        label_spec.push('`');
    }
    Ok(format!(
        "MERGE (n{label_spec} {{id: $id}}) \
         ON CREATE SET n.__created = true \
         SET n += $props \
         WITH n, coalesce(n.__created, false) AS created \
         REMOVE n.__created \
         RETURN created"
    ))
}

/// `MATCH (a {id:$from}), (b {id:$to}) MERGE (a)-[r:`T`]->(b) SET r += $props`.
fn edge_statement(rel_type: &str) -> Result<String, IngestError> {
    let rel = identifier(rel_type)?;
    Ok(format!(
        "MATCH (a {{id: $from}}), (b {{id: $to}}) \
         MERGE (a)-[r:`{rel}`]->(b) \
         ON CREATE SET r.__created = true \
         SET r += $props \
         WITH r, coalesce(r.__created, false) AS created \
         REMOVE r.__created \
         RETURN created"
    ))
}

/// Labels and relationship types are interpolated into (backticked)
/// statement text. Qname-derived labels may carry `.` and `-` (NCName
/// characters); anything else outside `[A-Za-z0-9_]` is refused rather
/// than quoted.
fn identifier(name: &str) -> Result<&str, IngestError> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(IngestError::Sink(format!(
            "unsafe graph identifier: {name:?}"
        )));
    }
    Ok(name)
}

fn bolt_props(props: &PropBag) -> BoltType {
    let mut map = BoltMap::default();
    for (key, value) in props {
        map.put(BoltString::from(key.as_str()), bolt_value(value));
    }
    BoltType::Map(map)
}

fn bolt_value(value: &PropValue) -> BoltType {
    match value {
        PropValue::Str(s) => BoltType::String(BoltString::from(s.as_str())),
        PropValue::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        PropValue::Int(i) => BoltType::Integer(BoltInteger::new(*i)),
        PropValue::Float(f) => BoltType::Float(BoltFloat::new(*f)),
        PropValue::StrList(items) => {
            let mut list = BoltList::default();
            for item in items {
                list.push(BoltType::String(BoltString::from(item.as_str())));
            }
            BoltType::List(list)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_statement_is_shape_only() {
        let stmt = node_statement(&["j_Charge".to_string()]).unwrap();
        assert!(stmt.starts_with("MERGE (n:`j_Charge` {id: $id})"));
        assert!(stmt.contains("SET n += $props"));
        // No instance value can reach statement text: only the label and
        // fixed template fragments appear.
        assert!(!stmt.contains("CH01"));
    }

    #[test]
    fn hub_nodes_carry_both_labels() {
        let stmt = node_statement(&["Entity".to_string(), "Entity_P01".to_string()]).unwrap();
        assert!(stmt.starts_with("MERGE (n:`Entity`:`Entity_P01` {id: $id})"));
    }

    #[test]
    fn edge_statement_matches_by_parameterized_ids() {
        let stmt = edge_statement("HAS_CHARGE").unwrap();
        assert!(stmt.starts_with("MATCH (a {id: $from}), (b {id: $to})"));
        assert!(stmt.contains("MERGE (a)-[r:`HAS_CHARGE`]->(b)"));
    }

    #[test]
    fn hostile_identifiers_are_refused() {
        assert!(identifier("j_Charge").is_ok());
        assert!(identifier("HAS_REF").is_ok());
        assert!(identifier("Entity_P-01").is_ok());
        assert!(identifier("bad`label").is_err());
        assert!(identifier("drop db;").is_err());
        assert!(identifier("").is_err());
        assert!(identifier("with space").is_err());
    }
}
