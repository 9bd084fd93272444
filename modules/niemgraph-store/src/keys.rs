//! Blob key scheme, namespaced by bundle id.

pub fn schema_prefix(bundle_id: &str) -> String {
    format!("{bundle_id}/schema/")
}

pub fn schema_file(bundle_id: &str, filename: &str) -> String {
    format!("{bundle_id}/schema/{filename}")
}

pub fn canonical_model(bundle_id: &str) -> String {
    format!("{bundle_id}/canonical.cmf")
}

pub fn mapping(bundle_id: &str) -> String {
    format!("{bundle_id}/mapping.yaml")
}

pub fn ndr_report(bundle_id: &str) -> String {
    format!("{bundle_id}/ndr_report.json")
}

pub fn manifest(bundle_id: &str) -> String {
    format!("{bundle_id}/manifest.json")
}

pub fn instance(bundle_id: &str, upload_id: &str, filename: &str) -> String {
    format!("instances/{bundle_id}/{upload_id}/{filename}")
}

/// The marker blob naming the active bundle.
pub const ACTIVE_BUNDLE: &str = "active_bundle";
