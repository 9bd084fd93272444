//! Schema-bundle lifecycle: submission, compilation, activation, listing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::info;

use niemgraph_common::error::IngestError;
use niemgraph_common::types::FileInput;
use niemgraph_mapping::GraphMapping;
use niemgraph_store::{keys, BlobStore, StoreError};
use niemgraph_tool::{SchemaCheck, SchemaTool};

use crate::cache::MappingCache;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    pub bundle_id: String,
    pub primary: String,
    pub files: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub bundle_id: String,
    #[serde(flatten)]
    pub check: SchemaCheck,
    pub active: bool,
}

pub struct BundleService {
    tool: Arc<dyn SchemaTool>,
    blobs: Arc<dyn BlobStore>,
    cache: Arc<MappingCache>,
}

impl BundleService {
    pub fn new(
        tool: Arc<dyn SchemaTool>,
        blobs: Arc<dyn BlobStore>,
        cache: Arc<MappingCache>,
    ) -> Self {
        Self { tool, blobs, cache }
    }

    /// Validate, canonicalize, and compile a schema bundle. The bundle id is
    /// a content hash, so resubmitting identical files lands on the same id.
    /// The first successfully compiled bundle auto-activates.
    pub async fn submit_schema_bundle(
        &self,
        files: Vec<FileInput>,
        primary: &str,
        skip_ndr: bool,
        cancel: &CancellationToken,
    ) -> Result<SubmitOutcome, IngestError> {
        if files.is_empty() {
            return Err(IngestError::Other(anyhow::anyhow!("empty schema bundle")));
        }
        if !files.iter().any(|f| f.name == primary) {
            return Err(IngestError::Other(anyhow::anyhow!(
                "primary file {primary} is not in the bundle"
            )));
        }

        let bundle_id = bundle_id(&files);
        let check = self
            .tool
            .validate_schema_bundle(&files, primary, skip_ndr, cancel)
            .await?;

        // The report is kept even for rejected bundles so a failed upload
        // can be inspected afterwards.
        self.put_json(&keys::ndr_report(&bundle_id), &check).await?;

        if !check.import_report.missing.is_empty() {
            return Err(IngestError::SchemaIncomplete {
                missing: check.import_report.missing.clone(),
            });
        }
        if !check.passed() {
            let report = check
                .ndr_report
                .clone()
                .unwrap_or_else(|| {
                    niemgraph_common::types::ValidationReport::failed("schema validation failed", Vec::new())
                });
            return Err(IngestError::Validation(report));
        }

        let cmf = self.tool.xsd_to_model(&files, primary, cancel).await?;
        let mapping = niemgraph_mapping::compile(&cmf)?;
        let yaml = mapping.to_yaml()?;

        for file in &files {
            self.put(&keys::schema_file(&bundle_id, &file.name), &file.bytes)
                .await?;
        }
        self.put(&keys::canonical_model(&bundle_id), &cmf).await?;
        self.put(&keys::mapping(&bundle_id), yaml.as_bytes()).await?;
        let manifest = BundleManifest {
            bundle_id: bundle_id.clone(),
            primary: primary.to_string(),
            files: files.iter().map(|f| f.name.clone()).collect(),
            created_at: Utc::now(),
        };
        self.put_json(&keys::manifest(&bundle_id), &manifest).await?;

        self.cache.insert(&bundle_id, Arc::new(mapping)).await;

        let active = if self.active_bundle().await?.is_none() {
            self.activate_bundle(&bundle_id).await?;
            true
        } else {
            false
        };

        info!(bundle_id, active, files = manifest.files.len(), "schema bundle accepted");
        Ok(SubmitOutcome {
            bundle_id,
            check,
            active,
        })
    }

    pub async fn activate_bundle(&self, bundle_id: &str) -> Result<(), IngestError> {
        let manifest = self.get(&keys::manifest(bundle_id)).await?;
        if manifest.is_none() {
            return Err(IngestError::UnknownBundle(bundle_id.to_string()));
        }
        self.put(keys::ACTIVE_BUNDLE, bundle_id.as_bytes()).await?;
        info!(bundle_id, "bundle activated");
        Ok(())
    }

    pub async fn active_bundle(&self) -> Result<Option<String>, IngestError> {
        Ok(self
            .get(keys::ACTIVE_BUNDLE)
            .await?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    pub async fn list_bundles(&self) -> Result<Vec<BundleManifest>, IngestError> {
        let mut manifests = Vec::new();
        for key in self.list("").await? {
            if !key.ends_with("/manifest.json") || key.starts_with("instances/") {
                continue;
            }
            if let Some(bytes) = self.get(&key).await? {
                if let Ok(manifest) = serde_json::from_slice::<BundleManifest>(&bytes) {
                    manifests.push(manifest);
                }
            }
        }
        manifests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(manifests)
    }

    pub async fn load_mapping(&self, bundle_id: &str) -> Result<Arc<GraphMapping>, IngestError> {
        self.cache.get_or_load(bundle_id, self.blobs.as_ref()).await
    }

    /// The bundle's schema files plus its primary, for instance validation.
    pub async fn schema_files(
        &self,
        bundle_id: &str,
    ) -> Result<(Vec<FileInput>, String), IngestError> {
        let manifest_bytes = self
            .get(&keys::manifest(bundle_id))
            .await?
            .ok_or_else(|| IngestError::UnknownBundle(bundle_id.to_string()))?;
        let manifest: BundleManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| IngestError::Other(anyhow::anyhow!("corrupt manifest: {e}")))?;

        let mut files = Vec::with_capacity(manifest.files.len());
        for name in &manifest.files {
            let bytes = self
                .get(&keys::schema_file(bundle_id, name))
                .await?
                .ok_or_else(|| {
                    IngestError::Other(anyhow::anyhow!("schema file {name} missing from store"))
                })?;
            files.push(FileInput::new(name.clone(), bytes));
        }
        Ok((files, manifest.primary))
    }

    // ----- blob helpers ---------------------------------------------------

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), IngestError> {
        self.blobs.put(key, bytes).await.map_err(store_err)
    }

    async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), IngestError> {
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| IngestError::Other(anyhow::anyhow!("serialize {key}: {e}")))?;
        self.put(key, &bytes).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IngestError> {
        self.blobs.get(key).await.map_err(store_err)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, IngestError> {
        self.blobs.list(prefix).await.map_err(store_err)
    }
}

fn store_err(e: StoreError) -> IngestError {
    IngestError::Sink(e.to_string())
}

/// Content hash of the canonical bundle: sorted `name NUL bytes` pairs.
pub fn bundle_id(files: &[FileInput]) -> String {
    let mut sorted: Vec<&FileInput> = files.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    let mut hasher = Sha256::new();
    for file in sorted {
        hasher.update(file.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(&file.bytes);
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())[..12].to_string()
}
