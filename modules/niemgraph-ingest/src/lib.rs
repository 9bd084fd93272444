//! Pipeline stitching: bundle lifecycle, mapping cache, per-file ingest.

pub mod bundles;
pub mod cache;
pub mod orchestrator;

pub use bundles::{BundleManifest, BundleService, SubmitOutcome};
pub use cache::MappingCache;
pub use orchestrator::{ConvertedDoc, IngestOrchestrator, InstanceFormat};
