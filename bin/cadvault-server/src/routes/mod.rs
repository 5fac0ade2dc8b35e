//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional OpenAPI document (disable with `CADVAULT_ENABLE_DOCS=false`)
//! - Health route
//! - `/v1` library, import and viewer routes
//! - `/admin` maintenance routes
//! - `/files` static serving of the blob store root

mod admin;
pub mod doc;
mod health;
mod v1;

use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Json, Router};
use cadvault_core::blob::local::FILES_ROUTE;
use tower_http::services::ServeDir;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut api = Router::new()
        .merge(health::router())
        .nest("/v1", v1::router(state.config.max_upload_bytes()))
        .nest("/admin", admin::router());

    if state.config.enable_docs {
        let api_doc = doc::get_docs();
        api = api.route(
            "/api-docs/openapi.json",
            get(move || {
                let api_doc = api_doc.clone();
                async move { Json(api_doc) }
            }),
        );
    }

    // Stored model files, with their own read-only CORS policy.
    let files = Router::new()
        .nest_service(FILES_ROUTE, ServeDir::new(state.blobs.root()))
        .layer(cors::files_cors_layer());

    api.layer(cors::cors_layer(&state))
        .merge(files)
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use cadvault_core::{LocalBlobStore, SqliteStore};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;

    const BOUNDARY: &str = "cadvault-test-boundary";

    const CUBE_OBJ: &str = "v 0 0 0\nv 2 0 0\nv 2 2 0\nv 0 2 0\nv 0 0 2\nv 2 0 2\nv 2 2 2\nv 0 2 2\n\
                            f 1 2 3 4\nf 5 6 7 8\nf 1 2 6 5\n";

    async fn app_with(dir: &tempfile::TempDir, tweak: impl FnOnce(&mut Config)) -> Router {
        let mut config = Config::for_tests(dir.path().to_path_buf());
        tweak(&mut config);
        let store = SqliteStore::connect(&config.database_url).await.unwrap();
        let blobs = LocalBlobStore::open(&config.storage_dir, &config.public_url).await.unwrap();
        build(Arc::new(AppState::new(config, store, blobs, reqwest::Client::new())))
    }

    async fn app(dir: &tempfile::TempDir) -> Router {
        app_with(dir, |_| {}).await
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn import_request(file_name: &str, content: &[u8], fields: &[(&str, &str)]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/v1/imports")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    const METADATA: &[(&str, &str)] = &[
        ("projectName", "North Pier"),
        ("assetName", "Pile Cap 7"),
        ("assetType", "Concrete"),
        ("inspectionType", "Visual"),
        ("lastInspected", "2025-03-14"),
        ("engineerInCharge", "R. Osei"),
        ("tags", "pier, marine"),
    ];

    #[tokio::test]
    async fn health_reports_ok_and_echoes_trace_id() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;
        let trace_id = "6f1c1f0e-3a4b-4c5d-8e9f-0a1b2c3d4e5f";
        let req = Request::builder()
            .uri("/health")
            .header(trace::X_TRACE_ID, trace_id)
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[trace::X_TRACE_ID], trace_id);

        let (_, body) = send(&app, get("/health")).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "ok");
    }

    #[tokio::test]
    async fn create_get_update_delete_round() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, created) = send(
            &app,
            json_request(
                "POST",
                "/v1/geometries",
                json!({
                    "name": "Unit cube",
                    "category": "primitive",
                    "geometryType": "cube",
                    "parameters": {"width": 1, "height": 1, "depth": 1},
                    "downloadCount": 50,
                    "rating": 5
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["downloadCount"], 0);
        assert_eq!(created["rating"], 0.0);
        let id = created["id"].as_str().unwrap().to_owned();

        let (status, fetched) = send(&app, get(&format!("/v1/geometries/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Unit cube");

        let (status, updated) = send(
            &app,
            json_request("PATCH", &format!("/v1/geometries/{id}"), json!({"tags": ["basic"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["tags"], json!(["basic"]));

        let (status, _) = send(&app, json_request("DELETE", &format!("/v1/geometries/{id}"), json!({}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, get(&format!("/v1/geometries/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains(&id));
    }

    #[tokio::test]
    async fn invalid_input_is_a_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/v1/geometries",
                json!({"name": " ", "category": "custom", "geometryType": "cube"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (_, created) = send(
            &app,
            json_request(
                "POST",
                "/v1/geometries",
                json!({"name": "Rated", "category": "custom", "geometryType": "cube"}),
            ),
        )
        .await;
        let id = created["id"].as_str().unwrap();
        let (status, _) = send(
            &app,
            json_request("POST", &format!("/v1/geometries/{id}/rating"), json!({"rating": -2})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn download_and_rating_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;
        let (_, created) = send(
            &app,
            json_request(
                "POST",
                "/v1/geometries",
                json!({"name": "Valve", "category": "custom", "geometryType": "cylinder"}),
            ),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        for _ in 0..2 {
            let (status, _) = send(&app, json_request("POST", &format!("/v1/geometries/{id}/downloads"), json!({}))).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (_, rated) = send(
            &app,
            json_request("POST", &format!("/v1/geometries/{id}/rating"), json!({"rating": 3})),
        )
        .await;
        assert_eq!(rated["downloadCount"], 2);
        assert_eq!(rated["rating"], 1.0);

        let (_, popular) = send(&app, get("/v1/geometries/popular")).await;
        assert_eq!(popular[0]["id"], *id);

        let (status, _) = send(&app, json_request("POST", "/v1/geometries/missing/downloads", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn import_then_view_and_download() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, outcome) = send(&app, import_request("cube.obj", CUBE_OBJ.as_bytes(), METADATA)).await;
        assert_eq!(status, StatusCode::CREATED, "{outcome}");
        assert_eq!(outcome["renderable"], true);
        let record = &outcome["record"];
        assert_eq!(record["status"], "ready");
        assert_eq!(record["category"], "imported");
        assert_eq!(record["tags"], json!(["imported", "3d-model", "pier", "marine"]));
        assert_eq!(record["parameters"]["fileType"], ".obj");
        let id = record["id"].as_str().unwrap();
        let file_url = record["fileUrl"].as_str().unwrap();

        let (status, scene) = send(&app, get(&format!("/v1/geometries/{id}/scene?autoRotate=true"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(scene["content"]["kind"], "model");
        assert_eq!(scene["content"]["transform"]["scale"], 4.0);
        assert_eq!(scene["settings"]["autoRotate"], true);
        assert!(scene["content"].get("mesh").is_none());

        let (_, search) = send(&app, get("/v1/geometries/search?q=MARINE")).await;
        assert_eq!(search.as_array().unwrap().len(), 1);

        let path = file_url.strip_prefix("http://localhost:3000").unwrap();
        let req = Request::builder()
            .uri(path)
            .header(header::ORIGIN, "https://viewer.example.com")
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], CUBE_OBJ.as_bytes());
    }

    #[tokio::test]
    async fn unsupported_import_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;
        let (status, body) = send(&app, import_request("plan.dwg", b"AC1027", METADATA)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains(".dwg"));

        let (_, listed) = send(&app, get("/v1/geometries?includePending=true")).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn import_without_metadata_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;
        let (status, _) = send(&app, import_request("part.step", b"ISO-10303-21;", &METADATA[..2])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_import_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;
        // Test config caps uploads at 1 MB.
        let big = vec![b'v'; 1024 * 1024 + 1];
        let res = app.clone().oneshot(import_request("big.stl", &big, METADATA)).await.unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn check_reports_renderability() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;
        let (status, body) = send(
            &app,
            json_request("POST", "/v1/imports/check", json!({"fileName": "Housing.FBX"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["extension"], ".fbx");
        assert_eq!(body["renderable"], false);

        let (status, _) = send(
            &app,
            json_request("POST", "/v1/imports/check", json!({"fileName": "drawing.dwg"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn openapi_document_lists_routes() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;
        let (status, doc) = send(&app, get("/api-docs/openapi.json")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/v1/geometries"].is_object());
        assert!(doc["paths"]["/v1/imports"].is_object());

        let dir = tempfile::tempdir().unwrap();
        let app = app_with(&dir, |c| c.enable_docs = false).await;
        let res = app.oneshot(get("/api-docs/openapi.json")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn purge_pending_route_reports_purged_ids() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;
        let (status, body) = send(&app, json_request("POST", "/admin/purge-pending", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["purged"], json!([]));

        let (_, created) = send(
            &app,
            json_request(
                "POST",
                "/v1/geometries",
                json!({"name": "Stuck", "category": "imported", "geometryType": "custom", "status": "pending"}),
            ),
        )
        .await;
        let id = created["id"].as_str().unwrap();
        let (status, body) = send(
            &app,
            json_request("POST", "/admin/purge-pending", json!({"olderThanMinutes": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["purged"], json!([id]));
    }

    #[tokio::test]
    async fn file_route_redirects_to_the_record_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;
        let (_, outcome) = send(&app, import_request("cube.obj", CUBE_OBJ.as_bytes(), METADATA)).await;
        let id = outcome["record"]["id"].as_str().unwrap();
        let file_url = outcome["record"]["fileUrl"].as_str().unwrap();

        let res = app.clone().oneshot(get(&format!("/v1/geometries/{id}/file"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.headers()[header::LOCATION], file_url);

        let (_, bare) = send(
            &app,
            json_request("POST", "/v1/geometries", json!({"name": "Bare", "category": "custom", "geometryType": "cube"})),
        )
        .await;
        let bare_id = bare["id"].as_str().unwrap();
        let (status, _) = send(&app, get(&format!("/v1/geometries/{bare_id}/file"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, get("/v1/geometries/missing/file")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_a_record_keeps_files_it_only_points_at() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;
        let (_, outcome) = send(&app, import_request("cube.obj", CUBE_OBJ.as_bytes(), METADATA)).await;
        let file_url = outcome["record"]["fileUrl"].as_str().unwrap().to_owned();

        let (_, other) = send(
            &app,
            json_request(
                "POST",
                "/v1/geometries",
                json!({"name": "Alias", "category": "custom", "geometryType": "custom", "fileUrl": file_url}),
            ),
        )
        .await;
        let other_id = other["id"].as_str().unwrap();
        let (status, _) = send(&app, json_request("DELETE", &format!("/v1/geometries/{other_id}"), json!({}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let path = file_url.strip_prefix("http://localhost:3000").unwrap();
        let res = app.clone().oneshot(get(path)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn remote_model_fetch_can_be_switched_off() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(&dir, |c| c.remote_fetch = false).await;
        let (_, created) = send(
            &app,
            json_request(
                "POST",
                "/v1/geometries",
                json!({
                    "name": "Remote",
                    "category": "imported",
                    "geometryType": "custom",
                    "parameters": {"fileType": ".obj"},
                    "fileUrl": "http://169.254.169.254/latest/meta-data"
                }),
            ),
        )
        .await;
        let id = created["id"].as_str().unwrap();
        let (status, body) = send(&app, get(&format!("/v1/geometries/{id}/scene"))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("disabled"));
    }
}
