pub mod client;
pub mod sink;
#[cfg(any(test, feature = "test-utils"))]
pub mod testutil;
pub mod writer;

pub use client::{BoltSettings, GraphClient};
pub use sink::{GraphSink, SinkStats};
#[cfg(any(test, feature = "test-utils"))]
pub use testutil::RecordingSink;
pub use writer::GraphWriter;

/// Re-export neo4rs::query for downstream crates that need raw Cypher
/// access (e.g. test assertions).
pub use neo4rs::query;
