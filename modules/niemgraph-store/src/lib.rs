//! Blob sink: a namespaced byte KV used for schema bundles, compiled
//! mappings, validation reports, and ingested source documents.

pub mod keys;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("blob store database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The four operations the core uses. Nothing here interprets the bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

pub use memory::MemoryBlobStore;
pub use postgres::PgBlobStore;
