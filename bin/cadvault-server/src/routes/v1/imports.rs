//! Model file import endpoints.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use bytes::BytesMut;
use cadvault_core::{validate_file_name, ImportRequest};
use cadvault_types::{is_renderable, ImportOutcome, InspectionMetadata};
use tracing::debug;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::v1::import::{FileCheckRequest, FileCheckResponse, ImportUpload};
use crate::state::AppState;

/// Room for the metadata fields and multipart framing on top of the file.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(import_file, check_file),
    components(schemas(ImportUpload, ImportOutcome, FileCheckRequest, FileCheckResponse))
)]
pub struct ImportsApi;

pub fn router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/imports",
            post(import_file).layer(DefaultBodyLimit::max(max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES))),
        )
        .route("/imports/check", post(check_file))
}

#[utoipa::path(
    post,
    path = "/v1/imports",
    tag = "imports",
    request_body(content = ImportUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File imported", body = ImportOutcome),
        (status = 400, description = "Unsupported file type or missing metadata"),
        (status = 413, description = "File too large"),
        (status = 502, description = "Upload failed; the record is left pending"),
    )
)]
pub async fn import_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImportOutcome>), ServerError> {
    let max_bytes = state.config.max_upload_bytes();
    let mut file: Option<(String, BytesMut)> = None;
    let mut metadata = InspectionMetadata::default();
    let mut tags = Vec::new();
    let mut description = None;
    let mut created_by = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("failed to read multipart field: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            // Reject before reading a byte of an unsupported file.
            validate_file_name(&file_name)?;

            let mut data = BytesMut::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| ServerError::BadRequest(format!("failed to read file chunk: {e}")))?
            {
                data.extend_from_slice(&chunk);
                if data.len() > max_bytes {
                    return Err(ServerError::PayloadTooLarge(format!(
                        "file exceeds the {} MB limit",
                        state.config.max_upload_mb
                    )));
                }
            }
            debug!(%file_name, size_bytes = data.len(), "received file upload");
            file = Some((file_name, data));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ServerError::BadRequest(format!("failed to read field {name}: {e}")))?;
        match name.as_str() {
            "projectName" => metadata.project_name = value,
            "assetName" => metadata.asset_name = value,
            "assetType" => metadata.asset_type = value,
            "inspectionType" => metadata.inspection_type = value,
            "lastInspected" => metadata.last_inspected = value,
            "engineerInCharge" => metadata.engineer_in_charge = value,
            "tags" => tags = value.split(',').map(|t| t.trim().to_owned()).collect(),
            "description" => description = Some(value),
            "createdBy" => created_by = Some(value),
            other => return Err(ServerError::BadRequest(format!("unknown field: {other}"))),
        }
    }

    let (file_name, data) = file.ok_or_else(|| ServerError::BadRequest("no file uploaded".into()))?;
    let mut request = ImportRequest::new(file_name, data.freeze(), metadata);
    request.tags = tags;
    request.description = description;
    request.created_by = created_by;

    let outcome = state.importer.import(request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Check a file name against the import allow-list without uploading.
#[utoipa::path(
    post,
    path = "/v1/imports/check",
    tag = "imports",
    request_body = FileCheckRequest,
    responses(
        (status = 200, description = "File type accepted", body = FileCheckResponse),
        (status = 400, description = "Unsupported file type"),
    )
)]
pub async fn check_file(Json(req): Json<FileCheckRequest>) -> Result<Json<FileCheckResponse>, ServerError> {
    let extension = validate_file_name(&req.file_name)?;
    Ok(Json(FileCheckResponse {
        renderable: is_renderable(&extension),
        file_name: req.file_name,
        extension,
    }))
}
