use neo4rs::{ConfigBuilder, Graph};

/// Bolt tuning for the ingest write path. Mutations commit in per-file
/// transactions gated by the batch semaphore, so the pool stays small;
/// both knobs are surfaced through configuration rather than baked in.
#[derive(Debug, Clone)]
pub struct BoltSettings {
    pub fetch_size: usize,
    pub max_connections: usize,
}

impl Default for BoltSettings {
    fn default() -> Self {
        Self {
            fetch_size: 500,
            max_connections: 10,
        }
    }
}

/// Connection handle shared by the writer and the live tests.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
}

impl GraphClient {
    pub async fn connect(
        uri: &str,
        user: &str,
        password: &str,
        settings: BoltSettings,
    ) -> Result<Self, neo4rs::Error> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .fetch_size(settings.fetch_size)
            .max_connections(settings.max_connections)
            .build()?;
        let graph = Graph::connect(config).await?;
        Ok(Self { graph })
    }

    /// Raw access for ad-hoc Cypher, used by test assertions.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}
