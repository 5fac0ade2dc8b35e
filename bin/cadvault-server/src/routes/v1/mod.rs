pub mod geometries;
pub mod imports;

use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::state::AppState;

/// Routes nested under `/v1`.
pub fn router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .merge(geometries::router())
        .merge(imports::router(max_upload_bytes))
}

#[derive(OpenApi)]
#[openapi()]
pub struct V1Api;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut doc = V1Api::openapi();
    doc.merge(geometries::GeometriesApi::openapi());
    doc.merge(imports::ImportsApi::openapi());
    doc
}
