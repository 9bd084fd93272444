//! Read-mostly cache of compiled mappings, keyed by bundle id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use niemgraph_common::error::IngestError;
use niemgraph_mapping::GraphMapping;
use niemgraph_store::{keys, BlobStore};

/// Misses fall through to the blob store; writes happen only on bundle
/// submission and activation.
#[derive(Default)]
pub struct MappingCache {
    inner: RwLock<HashMap<String, Arc<GraphMapping>>>,
}

impl MappingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, bundle_id: &str, mapping: Arc<GraphMapping>) {
        self.inner
            .write()
            .await
            .insert(bundle_id.to_string(), mapping);
    }

    pub async fn get_or_load(
        &self,
        bundle_id: &str,
        blobs: &dyn BlobStore,
    ) -> Result<Arc<GraphMapping>, IngestError> {
        if let Some(found) = self.inner.read().await.get(bundle_id) {
            return Ok(Arc::clone(found));
        }

        let bytes = blobs
            .get(&keys::mapping(bundle_id))
            .await
            .map_err(|e| IngestError::Sink(e.to_string()))?
            .ok_or_else(|| IngestError::UnknownBundle(bundle_id.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| IngestError::MappingCompilation(format!("mapping not UTF-8: {e}")))?;
        let mapping = Arc::new(GraphMapping::from_yaml(&text)?);

        debug!(bundle_id, "loaded mapping from blob store");
        self.inner
            .write()
            .await
            .insert(bundle_id.to_string(), Arc::clone(&mapping));
        Ok(mapping)
    }
}
