use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Multipart body of `POST /v1/imports`. Documentation only; the handler
/// reads the fields one by one.
#[allow(dead_code)]
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct ImportUpload {
    /// `.stp`, `.step`, `.obj`, `.fbx` or `.stl`.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub project_name: String,
    pub asset_name: String,
    pub asset_type: String,
    pub inspection_type: String,
    pub last_inspected: String,
    pub engineer_in_charge: String,
    /// Comma-separated extra tags.
    pub tags: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileCheckRequest {
    pub file_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileCheckResponse {
    pub file_name: String,
    pub extension: String,
    /// `false` when the file will import but cannot be previewed.
    pub renderable: bool,
}
