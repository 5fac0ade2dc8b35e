use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::admin::purge::{PurgeRequest, PurgeResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(purge_pending), components(schemas(PurgeRequest, PurgeResponse)))]
pub struct PurgeApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/purge-pending", post(purge_pending))
}

/// Delete imports that never finished, together with any uploaded files.
#[utoipa::path(
    post,
    path = "/admin/purge-pending",
    tag = "admin",
    request_body = PurgeRequest,
    responses(
        (status = 200, description = "Stale pending records removed", body = PurgeResponse),
        (status = 500, description = "Store error"),
    )
)]
pub async fn purge_pending(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PurgeRequest>,
) -> Result<Json<PurgeResponse>, ServerError> {
    let older_than = chrono::Duration::minutes(i64::from(req.older_than_minutes));
    let purged = state.library.purge_pending(older_than).await?;
    Ok(Json(PurgeResponse { purged }))
}
