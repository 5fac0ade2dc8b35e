//! Geometry library endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use cadvault_types::{GeometryPatch, GeometryRecord, NewGeometry, Scene};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::v1::geometry::{FeaturedQuery, ListQuery, RatingRequest, SceneQuery, SearchQuery};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_geometry,
        list_geometries,
        search_geometries,
        popular_geometries,
        recent_geometries,
        get_geometry,
        update_geometry,
        delete_geometry,
        record_download,
        rate_geometry,
        get_scene,
        download_file,
    ),
    components(schemas(GeometryRecord, NewGeometry, GeometryPatch, RatingRequest, Scene))
)]
pub struct GeometriesApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/geometries", post(create_geometry).get(list_geometries))
        .route("/geometries/search", get(search_geometries))
        .route("/geometries/popular", get(popular_geometries))
        .route("/geometries/recent", get(recent_geometries))
        .route(
            "/geometries/{id}",
            get(get_geometry).patch(update_geometry).delete(delete_geometry),
        )
        .route("/geometries/{id}/downloads", post(record_download))
        .route("/geometries/{id}/rating", post(rate_geometry))
        .route("/geometries/{id}/scene", get(get_scene))
        .route("/geometries/{id}/file", get(download_file))
}

#[utoipa::path(
    post,
    path = "/v1/geometries",
    tag = "geometries",
    request_body = NewGeometry,
    responses(
        (status = 201, description = "Geometry created", body = GeometryRecord),
        (status = 400, description = "Invalid fields"),
        (status = 500, description = "Store error"),
    )
)]
pub async fn create_geometry(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewGeometry>,
) -> Result<(StatusCode, Json<GeometryRecord>), ServerError> {
    let record = state.library.create(req).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/v1/geometries",
    tag = "geometries",
    params(ListQuery),
    responses(
        (status = 200, description = "Geometries listed", body = [GeometryRecord]),
        (status = 400, description = "Bad query"),
        (status = 500, description = "Store error"),
    )
)]
pub async fn list_geometries(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<GeometryRecord>>, ServerError> {
    let records = state.library.list(&q.into_filter()).await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/v1/geometries/search",
    tag = "geometries",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching geometries", body = [GeometryRecord]),
        (status = 500, description = "Store error"),
    )
)]
pub async fn search_geometries(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<GeometryRecord>>, ServerError> {
    Ok(Json(state.library.search(&q.q).await?))
}

#[utoipa::path(
    get,
    path = "/v1/geometries/popular",
    tag = "geometries",
    params(FeaturedQuery),
    responses(
        (status = 200, description = "Most downloaded geometries", body = [GeometryRecord]),
        (status = 500, description = "Store error"),
    )
)]
pub async fn popular_geometries(
    State(state): State<Arc<AppState>>,
    Query(q): Query<FeaturedQuery>,
) -> Result<Json<Vec<GeometryRecord>>, ServerError> {
    Ok(Json(state.library.popular(q.limit).await?))
}

#[utoipa::path(
    get,
    path = "/v1/geometries/recent",
    tag = "geometries",
    params(FeaturedQuery),
    responses(
        (status = 200, description = "Newest geometries", body = [GeometryRecord]),
        (status = 500, description = "Store error"),
    )
)]
pub async fn recent_geometries(
    State(state): State<Arc<AppState>>,
    Query(q): Query<FeaturedQuery>,
) -> Result<Json<Vec<GeometryRecord>>, ServerError> {
    Ok(Json(state.library.recent(q.limit).await?))
}

#[utoipa::path(
    get,
    path = "/v1/geometries/{id}",
    tag = "geometries",
    params(("id" = String, Path, description = "Geometry id")),
    responses(
        (status = 200, description = "Geometry retrieved", body = GeometryRecord),
        (status = 404, description = "Geometry not found"),
        (status = 500, description = "Store error"),
    )
)]
pub async fn get_geometry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GeometryRecord>, ServerError> {
    state
        .library
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("geometry {id} not found")))
}

#[utoipa::path(
    patch,
    path = "/v1/geometries/{id}",
    tag = "geometries",
    params(("id" = String, Path, description = "Geometry id")),
    request_body = GeometryPatch,
    responses(
        (status = 200, description = "Geometry updated", body = GeometryRecord),
        (status = 400, description = "Invalid fields"),
        (status = 404, description = "Geometry not found"),
        (status = 500, description = "Store error"),
    )
)]
pub async fn update_geometry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<GeometryPatch>,
) -> Result<Json<GeometryRecord>, ServerError> {
    Ok(Json(state.library.update(&id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/v1/geometries/{id}",
    tag = "geometries",
    params(("id" = String, Path, description = "Geometry id")),
    responses(
        (status = 204, description = "Geometry deleted (or already absent)"),
        (status = 500, description = "Store error"),
    )
)]
pub async fn delete_geometry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.library.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/geometries/{id}/downloads",
    tag = "geometries",
    params(("id" = String, Path, description = "Geometry id")),
    responses(
        (status = 200, description = "Download recorded", body = GeometryRecord),
        (status = 404, description = "Geometry not found"),
        (status = 500, description = "Store error"),
    )
)]
pub async fn record_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GeometryRecord>, ServerError> {
    state.library.record_download(&id).await?;
    get_geometry(State(state), Path(id)).await
}

#[utoipa::path(
    post,
    path = "/v1/geometries/{id}/rating",
    tag = "geometries",
    params(("id" = String, Path, description = "Geometry id")),
    request_body = RatingRequest,
    responses(
        (status = 200, description = "Rating applied", body = GeometryRecord),
        (status = 400, description = "Invalid rating"),
        (status = 404, description = "Geometry not found"),
        (status = 500, description = "Store error"),
    )
)]
pub async fn rate_geometry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RatingRequest>,
) -> Result<Json<GeometryRecord>, ServerError> {
    Ok(Json(state.library.rate(&id, req.rating).await?))
}

#[utoipa::path(
    get,
    path = "/v1/geometries/{id}/scene",
    tag = "viewer",
    params(("id" = String, Path, description = "Geometry id"), SceneQuery),
    responses(
        (status = 200, description = "Scene description", body = Scene),
        (status = 404, description = "Geometry or model file not found"),
        (status = 422, description = "Model file could not be parsed"),
        (status = 502, description = "Model file could not be fetched"),
    )
)]
pub async fn get_scene(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<SceneQuery>,
) -> Result<Json<Scene>, ServerError> {
    let record = state
        .library
        .get(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("geometry {id} not found")))?;
    let scene = state
        .viewer
        .describe(&record, q.settings(), q.include_mesh.unwrap_or(false))
        .await?;
    Ok(Json(scene))
}

/// Redirect to the record's model file.
#[utoipa::path(
    get,
    path = "/v1/geometries/{id}/file",
    tag = "geometries",
    params(("id" = String, Path, description = "Geometry id")),
    responses(
        (status = 307, description = "Redirect to the model file"),
        (status = 404, description = "Geometry or model file not found"),
        (status = 500, description = "Store error"),
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Redirect, ServerError> {
    state
        .library
        .file_url(&id)
        .await?
        .map(|url| Redirect::temporary(&url))
        .ok_or_else(|| ServerError::NotFound(format!("no model file for geometry {id}")))
}
