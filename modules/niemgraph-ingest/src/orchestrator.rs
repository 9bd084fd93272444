//! Per-file ingest pipeline: validate, project, commit, persist.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use niemgraph_common::batch::{BatchExecutor, OpKind};
use niemgraph_common::error::IngestError;
use niemgraph_common::types::{BatchReport, FileInput, FileOutcome, ValidationReport};
use niemgraph_graph::GraphSink;
use niemgraph_mapping::GraphMapping;
use niemgraph_projector::convert::xml_to_json;
use niemgraph_projector::{FileIdentity, ProjectionMode, Projector};
use niemgraph_store::{keys, BlobStore};
use niemgraph_tool::SchemaTool;

use crate::bundles::BundleService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceFormat {
    Xml,
    Json,
}

/// Result of converting one XML instance to NIEM JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedDoc {
    pub filename: String,
    pub json: String,
}

/// Mapping and schema files resolved once per batch, shared by every file.
struct BatchCtx {
    bundle_id: String,
    mapping: Arc<GraphMapping>,
    schema_files: Vec<FileInput>,
    primary: String,
}

pub struct IngestOrchestrator {
    tool: Arc<dyn SchemaTool>,
    graph: Arc<dyn GraphSink>,
    blobs: Arc<dyn BlobStore>,
    bundles: Arc<BundleService>,
    executor: Arc<BatchExecutor>,
    persist_source_docs: bool,
}

impl IngestOrchestrator {
    pub fn new(
        tool: Arc<dyn SchemaTool>,
        graph: Arc<dyn GraphSink>,
        blobs: Arc<dyn BlobStore>,
        bundles: Arc<BundleService>,
        executor: Arc<BatchExecutor>,
        persist_source_docs: bool,
    ) -> Self {
        Self {
            tool,
            graph,
            blobs,
            bundles,
            executor,
            persist_source_docs,
        }
    }

    pub async fn ingest_xml(
        &self,
        files: Vec<FileInput>,
        bundle_id: Option<String>,
        upload_id: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, IngestError> {
        self.ingest(files, bundle_id, upload_id, InstanceFormat::Xml, cancel)
            .await
    }

    pub async fn ingest_json(
        &self,
        files: Vec<FileInput>,
        bundle_id: Option<String>,
        upload_id: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, IngestError> {
        self.ingest(files, bundle_id, upload_id, InstanceFormat::Json, cancel)
            .await
    }

    /// Ingest a batch against the requested (or active) bundle. With no
    /// bundle at all, files project in dynamic mode without validation.
    async fn ingest(
        &self,
        files: Vec<FileInput>,
        bundle_id: Option<String>,
        upload_id: Option<String>,
        format: InstanceFormat,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, IngestError> {
        let resolved = match bundle_id {
            Some(id) => Some(id),
            None => self.bundles.active_bundle().await?,
        };
        let ctx = match &resolved {
            Some(id) => {
                let mapping = self.bundles.load_mapping(id).await?;
                let (schema_files, primary) = self.bundles.schema_files(id).await?;
                Some(Arc::new(BatchCtx {
                    bundle_id: id.clone(),
                    mapping,
                    schema_files,
                    primary,
                }))
            }
            None => None,
        };

        let pipeline = Arc::new(FilePipeline {
            tool: Arc::clone(&self.tool),
            graph: Arc::clone(&self.graph),
            blobs: Arc::clone(&self.blobs),
            ctx,
            format,
            upload_id: upload_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            persist: self.persist_source_docs,
            cancel: cancel.clone(),
        });

        let entries = self
            .executor
            .run_batch(files, OpKind::Ingest, cancel, move |file| {
                let pipeline = Arc::clone(&pipeline);
                async move { pipeline.run(file).await }
            })
            .await?;

        Ok(BatchReport::from_entries(resolved, entries))
    }

    /// Batch XML -> NIEM JSON conversion. Converted documents come back in
    /// filename order; failures appear only in the report.
    pub async fn convert_xml(
        &self,
        files: Vec<FileInput>,
        cancel: &CancellationToken,
    ) -> Result<(BatchReport, Vec<ConvertedDoc>), IngestError> {
        let collected: Arc<Mutex<Vec<ConvertedDoc>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&collected);

        let entries = self
            .executor
            .run_batch(files, OpKind::Convert, cancel, move |file| {
                let sink = Arc::clone(&sink);
                async move {
                    let json = xml_to_json(&file.bytes)?;
                    sink.lock().unwrap().push(ConvertedDoc {
                        filename: file.name,
                        json,
                    });
                    Ok(FileOutcome::default())
                }
            })
            .await?;

        let mut docs = std::mem::take(&mut *collected.lock().unwrap());
        docs.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok((BatchReport::from_entries(None, entries), docs))
    }
}

struct FilePipeline {
    tool: Arc<dyn SchemaTool>,
    graph: Arc<dyn GraphSink>,
    blobs: Arc<dyn BlobStore>,
    ctx: Option<Arc<BatchCtx>>,
    format: InstanceFormat,
    upload_id: String,
    persist: bool,
    cancel: CancellationToken,
}

impl FilePipeline {
    async fn run(&self, file: FileInput) -> Result<FileOutcome, IngestError> {
        let mut validation: Option<ValidationReport> = None;

        let (schema_id, output) = match &self.ctx {
            Some(ctx) => {
                let report = match self.format {
                    InstanceFormat::Xml => {
                        self.tool
                            .validate_xml(&ctx.schema_files, &ctx.primary, &file, &self.cancel)
                            .await?
                    }
                    InstanceFormat::Json => {
                        self.tool
                            .validate_json(&ctx.schema_files, &ctx.primary, &file, &self.cancel)
                            .await?
                    }
                };
                // Invalid instances never touch the graph or blob sinks.
                if !report.valid {
                    return Err(IngestError::Validation(report));
                }
                validation = Some(report);

                let ident =
                    FileIdentity::new(&file.name, &self.upload_id, &file.bytes, &ctx.bundle_id);
                let projector = Projector::new(ProjectionMode::Mapped(&ctx.mapping));
                let output = match self.format {
                    InstanceFormat::Xml => {
                        projector.project_xml(&file.bytes, &ident, &self.cancel)?
                    }
                    InstanceFormat::Json => {
                        projector.project_json(&file.bytes, &ident, &self.cancel)?
                    }
                };
                (ctx.bundle_id.clone(), output)
            }
            None => {
                // Dynamic mode: no schema, no validation, labels from qnames.
                let ident = FileIdentity::new(&file.name, &self.upload_id, &file.bytes, "dynamic");
                let projector = Projector::new(ProjectionMode::Dynamic);
                let output = match self.format {
                    InstanceFormat::Xml => {
                        projector.project_xml(&file.bytes, &ident, &self.cancel)?
                    }
                    InstanceFormat::Json => {
                        projector.project_json(&file.bytes, &ident, &self.cancel)?
                    }
                };
                ("dynamic".to_string(), output)
            }
        };

        let mut warnings = output.warnings.clone();
        let stats = self.graph.apply(&file.name, &output.mutations).await?;

        // Source bytes persist only after the graph commit; a failed blob
        // write is a soft warning because the graph already holds the
        // projected state.
        if self.persist {
            let key = keys::instance(&schema_id, &self.upload_id, &file.name);
            if let Err(e) = self.blobs.put(&key, &file.bytes).await {
                warn!(file = %file.name, error = %e, "failed to persist source bytes");
                warnings.push(format!("source bytes not persisted: {e}"));
            }
        }

        Ok(FileOutcome {
            nodes_created: stats.nodes_created,
            edges_created: stats.edges_created,
            validation,
            warnings,
        })
    }
}
