pub mod purge;

use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::state::AppState;

/// Maintenance routes nested under `/admin`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().merge(purge::router())
}

#[derive(OpenApi)]
#[openapi()]
pub struct AdminApi;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut doc = AdminApi::openapi();
    doc.merge(purge::PurgeApi::openapi());
    doc
}
