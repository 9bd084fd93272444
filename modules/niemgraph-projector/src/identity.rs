//! File-scoped node identity.
//!
//! Every node id is prefixed by an 8-hex-char digest of the file's
//! `(filename, uploadId, contentHash)` triple. The prefix is the sole
//! mechanism keeping local identifiers like `P01` from colliding across
//! files; cross-file merge is deliberately impossible.

use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct FileIdentity {
    pub file_hash: String,
    pub source_doc: String,
    pub schema_id: String,
    pub upload_id: String,
}

impl FileIdentity {
    pub fn new(filename: &str, upload_id: &str, bytes: &[u8], schema_id: &str) -> Self {
        let content = content_hash(bytes);
        Self {
            file_hash: file_hash(filename, upload_id, &content),
            source_doc: filename.to_string(),
            schema_id: schema_id.to_string(),
            upload_id: upload_id.to_string(),
        }
    }

    /// `{fileHash}_{structuresId}`
    pub fn id_for(&self, structures_id: &str) -> String {
        format!("{}_{}", self.file_hash, structures_id)
    }

    /// `{fileHash}_hub_{entityId}`
    pub fn hub_id(&self, entity_id: &str) -> String {
        format!("{}_hub_{}", self.file_hash, entity_id)
    }

    /// `{fileHash}_syn_{hash16}` over `(parentId, qname, ordinalPath)`.
    pub fn synthetic_id(&self, parent_id: &str, qname: &str, ordinal_path: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(parent_id.as_bytes());
        hasher.update(b"|");
        hasher.update(qname.as_bytes());
        hasher.update(b"|");
        hasher.update(ordinal_path.as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("{}_syn_{}", self.file_hash, &digest[..16])
    }
}

pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn file_hash(filename: &str, upload_id: &str, content_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update(upload_id.as_bytes());
    hasher.update(content_hash.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..8].to_string()
}
