use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use niemgraph_common::batch::{BatchExecutor, BatchLimits};
use niemgraph_common::Config;
use niemgraph_graph::{BoltSettings, GraphClient, GraphSink, GraphWriter};
use niemgraph_ingest::{BundleService, IngestOrchestrator, MappingCache};
use niemgraph_store::{BlobStore, PgBlobStore};
use niemgraph_tool::{CmfTool, SchemaTool};

mod rest;

pub struct AppState {
    pub bundles: Arc<BundleService>,
    pub orchestrator: IngestOrchestrator,
    pub cancel: CancellationToken,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let graph_client = GraphClient::connect(
        &config.neo4j_uri,
        &config.neo4j_user,
        &config.neo4j_password,
        BoltSettings {
            fetch_size: config.neo4j_fetch_size,
            max_connections: config.neo4j_max_connections,
        },
    )
    .await?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = PgBlobStore::new(pool);
    store.migrate().await?;

    let tool: Arc<dyn SchemaTool> = Arc::new(CmfTool::new(
        config.niem_tool_path.clone(),
        config.per_file_timeout(),
    ));
    let graph: Arc<dyn GraphSink> = Arc::new(GraphWriter::new(graph_client));
    let blobs: Arc<dyn BlobStore> = Arc::new(store);
    let cache = Arc::new(MappingCache::new());
    let bundles = Arc::new(BundleService::new(
        Arc::clone(&tool),
        Arc::clone(&blobs),
        cache,
    ));
    let executor = Arc::new(BatchExecutor::new(BatchLimits::from_config(&config)));
    let orchestrator = IngestOrchestrator::new(
        tool,
        graph,
        blobs,
        Arc::clone(&bundles),
        executor,
        config.persist_source_docs,
    );

    let state = Arc::new(AppState {
        bundles,
        orchestrator,
        cancel: CancellationToken::new(),
    });

    let app = rest::router(Arc::clone(&state)).layer(TraceLayer::new_for_http());
    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!(%addr, "niemgraph api listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
