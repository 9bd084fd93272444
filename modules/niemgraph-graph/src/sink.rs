//! The narrow seam between the projector and the graph database.

use async_trait::async_trait;

use niemgraph_common::error::IngestError;
use niemgraph_projector::Mutation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub nodes_created: u64,
    pub edges_created: u64,
}

/// Applies one file's mutations as a single logical transaction: all commit
/// or none do. Implementations must MERGE by id so re-applying the same
/// mutations is a no-op.
#[async_trait]
pub trait GraphSink: Send + Sync {
    async fn apply(&self, source_doc: &str, mutations: &[Mutation]) -> Result<SinkStats, IngestError>;
}
