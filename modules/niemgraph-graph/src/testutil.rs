//! Test utilities: an in-memory sink with MERGE-by-id semantics for
//! contract tests, and a Neo4j testcontainer helper for live tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use niemgraph_common::error::IngestError;
use niemgraph_projector::{Mutation, PropBag};

use crate::sink::{GraphSink, SinkStats};

#[cfg(feature = "test-utils")]
pub use containers::neo4j_container;

#[cfg(feature = "test-utils")]
mod containers {
    use testcontainers::{
        core::{ContainerPort, WaitFor},
        runners::AsyncRunner,
        ContainerAsync, GenericImage, ImageExt,
    };

    use crate::{BoltSettings, GraphClient};

    /// Spin up a Neo4j container and return the container handle plus a
    /// connected client.
    ///
    /// The container stops when `ContainerAsync` drops, so callers must
    /// hold it alive for the duration of the test.
    pub async fn neo4j_container() -> (ContainerAsync<GenericImage>, GraphClient) {
        let image = GenericImage::new("neo4j", "5-community")
            .with_exposed_port(ContainerPort::Tcp(7687))
            .with_wait_for(WaitFor::message_on_stdout("Started."))
            .with_env_var("NEO4J_AUTH", "none");

        let container = image
            .start()
            .await
            .expect("Failed to start Neo4j container");

        let host_port = container
            .get_host_port_ipv4(7687)
            .await
            .expect("Failed to get Neo4j host port");

        let uri = format!("bolt://127.0.0.1:{host_port}");
        let client = GraphClient::connect(&uri, "", "", BoltSettings::default())
            .await
            .expect("Failed to connect to Neo4j");

        (container, client)
    }
}

#[derive(Debug, Default)]
struct Recorded {
    nodes: BTreeMap<String, (Vec<String>, PropBag)>,
    edges: BTreeMap<(String, String, String), PropBag>,
}

/// Applies mutations to an in-process map the way the Bolt writer applies
/// them to Neo4j: MERGE by node id, MERGE by (from, rel, to). A whole apply
/// call either lands or (when primed to fail) leaves no trace, mirroring the
/// per-file transaction.
#[derive(Default)]
pub struct RecordingSink {
    state: Mutex<Recorded>,
    fail_next: Mutex<Option<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next apply call fail with the given message.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.fail_next.lock().unwrap() = Some(message.into());
    }

    pub fn node_count(&self) -> usize {
        self.state.lock().unwrap().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.state.lock().unwrap().edges.len()
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().nodes.keys().cloned().collect()
    }

    pub fn labels_of(&self, id: &str) -> Option<Vec<String>> {
        self.state
            .lock()
            .unwrap()
            .nodes
            .get(id)
            .map(|(labels, _)| labels.clone())
    }
}

#[async_trait]
impl GraphSink for RecordingSink {
    async fn apply(
        &self,
        _source_doc: &str,
        mutations: &[Mutation],
    ) -> Result<SinkStats, IngestError> {
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(IngestError::Sink(message));
        }

        let mut state = self.state.lock().unwrap();
        let mut stats = SinkStats::default();
        for mutation in mutations {
            match mutation {
                Mutation::Node(node) => {
                    if !state.nodes.contains_key(&node.id) {
                        stats.nodes_created += 1;
                    }
                    let slot = state
                        .nodes
                        .entry(node.id.clone())
                        .or_insert_with(|| (node.labels.clone(), PropBag::new()));
                    slot.1.extend(node.properties.clone());
                }
                Mutation::Edge(edge) => {
                    let key = (
                        edge.from_id.clone(),
                        edge.rel_type.clone(),
                        edge.to_id.clone(),
                    );
                    if !state.edges.contains_key(&key) {
                        stats.edges_created += 1;
                    }
                    state.edges.entry(key).or_default().extend(edge.properties.clone());
                }
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use niemgraph_projector::{ProjectedNode, PropValue};

    fn node(id: &str) -> Mutation {
        let mut props = PropBag::new();
        props.insert("qname".to_string(), PropValue::Str("a:B".to_string()));
        Mutation::Node(ProjectedNode {
            id: id.to_string(),
            labels: vec!["a_B".to_string()],
            properties: props,
        })
    }

    #[tokio::test]
    async fn reapplying_identical_mutations_creates_nothing() {
        let sink = RecordingSink::new();
        let mutations = vec![node("f1_A"), node("f1_B")];

        let first = sink.apply("doc.xml", &mutations).await.unwrap();
        assert_eq!(first.nodes_created, 2);

        let second = sink.apply("doc.xml", &mutations).await.unwrap();
        assert_eq!(second.nodes_created, 0);
        assert_eq!(sink.node_count(), 2);
    }
}
