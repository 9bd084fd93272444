//! REST surface over the core entrypoints. JSON in, JSON out; batch and
//! validation reports are returned verbatim.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use niemgraph_common::error::IngestError;
use niemgraph_common::types::FileInput;

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/schemas", post(submit_schema).get(list_schemas))
        .route("/api/schemas/{id}/activate", post(activate_schema))
        .route("/api/ingest/xml", post(ingest_xml))
        .route("/api/ingest/json", post(ingest_json))
        .route("/api/convert/xml-to-json", post(convert_xml))
        .with_state(state)
}

// ----- request DTOs --------------------------------------------------------

#[derive(Deserialize)]
struct FileDto {
    name: String,
    content: String,
}

impl FileDto {
    fn into_input(self) -> FileInput {
        FileInput::new(self.name, self.content.into_bytes())
    }
}

fn into_inputs(files: Vec<FileDto>) -> Vec<FileInput> {
    files.into_iter().map(FileDto::into_input).collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitSchemaRequest {
    files: Vec<FileDto>,
    primary: String,
    #[serde(default)]
    skip_ndr: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestRequest {
    files: Vec<FileDto>,
    #[serde(default)]
    bundle_id: Option<String>,
    #[serde(default)]
    upload_id: Option<String>,
}

#[derive(Deserialize)]
struct ConvertRequest {
    files: Vec<FileDto>,
}

// ----- handlers ------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn submit_schema(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitSchemaRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = state
        .bundles
        .submit_schema_bundle(
            into_inputs(req.files),
            &req.primary,
            req.skip_ndr,
            &state.cancel,
        )
        .await?;
    Ok(Json(serde_json::to_value(outcome).unwrap_or_default()))
}

async fn list_schemas(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bundles = state.bundles.list_bundles().await?;
    let active = state.bundles.active_bundle().await?;
    Ok(Json(json!({"bundles": bundles, "activeBundleId": active})))
}

async fn activate_schema(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.bundles.activate_bundle(&id).await?;
    Ok(Json(json!({"activeBundleId": id})))
}

async fn ingest_xml(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = state
        .orchestrator
        .ingest_xml(
            into_inputs(req.files),
            req.bundle_id,
            req.upload_id,
            &state.cancel,
        )
        .await?;
    Ok(Json(serde_json::to_value(report).unwrap_or_default()))
}

async fn ingest_json(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = state
        .orchestrator
        .ingest_json(
            into_inputs(req.files),
            req.bundle_id,
            req.upload_id,
            &state.cancel,
        )
        .await?;
    Ok(Json(serde_json::to_value(report).unwrap_or_default()))
}

async fn convert_xml(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConvertRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (report, documents) = state
        .orchestrator
        .convert_xml(into_inputs(req.files), &state.cancel)
        .await?;
    Ok(Json(json!({"report": report, "documents": documents})))
}

// ----- error mapping -------------------------------------------------------

pub struct ApiError(IngestError);

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            IngestError::Validation(_)
            | IngestError::SchemaIncomplete { .. }
            | IngestError::MappingCompilation(_)
            | IngestError::Projection(_)
            | IngestError::BatchTooLarge { .. }
            | IngestError::ToolUnavailable(_)
            | IngestError::ToolExecution { .. }
            | IngestError::ToolTimeout(_)
            | IngestError::NoActiveBundle => StatusCode::BAD_REQUEST,
            IngestError::UnknownBundle(_) => StatusCode::NOT_FOUND,
            IngestError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            IngestError::Sink(_) | IngestError::Config(_) | IngestError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = match self.0 {
            IngestError::Validation(report) => {
                json!({"error": "validation failed", "report": report})
            }
            IngestError::SchemaIncomplete { missing } => {
                json!({"error": "schema bundle incomplete", "missing": missing})
            }
            other => json!({"error": other.to_string()}),
        };
        (status, Json(body)).into_response()
    }
}
