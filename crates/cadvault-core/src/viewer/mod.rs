//! Turns a stored record into a scene the renderer can draw.
//!
//! Model files are fetched, parsed, then scaled uniformly so the largest
//! bounding-box dimension equals [`TARGET_SIZE`] and translated so the box is
//! centred on the origin. Records without a file describe a primitive shape;
//! files with no loader become a placeholder.

pub mod loader;

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use cadvault_types::{
    is_renderable, Bounds, GeometryRecord, MeshData, ModelTransform, Scene, SceneContent, SceneRig,
    ViewerSettings, TARGET_SIZE,
};
use glam::Vec3;
use tracing::{debug, info, warn};

use crate::blob::BlobStore;
use crate::error::{BlobError, ViewerError};

pub use loader::RawMesh;

/// A mesh after centring and scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub transform: ModelTransform,
    pub source_bounds: Bounds,
    pub bounds: Bounds,
    pub positions: Vec<[f32; 3]>,
}

/// Bounding box of `positions`, or `None` when there are none.
pub fn bounds_of(positions: &[Vec3]) -> Option<Bounds> {
    let first = *positions.first()?;
    let (min, max) = positions
        .iter()
        .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
    Some(Bounds { min: min.to_array(), max: max.to_array() })
}

/// Scale `mesh` so its largest dimension is `target` and centre it on the origin.
pub fn normalize(mesh: &RawMesh, target: f32) -> Result<Normalized, ViewerError> {
    let source_bounds = bounds_of(&mesh.positions).ok_or(ViewerError::Empty)?;
    let largest = source_bounds.largest_dimension();
    if !largest.is_finite() || largest <= f32::EPSILON {
        return Err(ViewerError::Empty);
    }

    let scale = target / largest;
    let translation = -Vec3::from_array(source_bounds.center()) * scale;
    let positions: Vec<[f32; 3]> = mesh
        .positions
        .iter()
        .map(|p| (*p * scale + translation).to_array())
        .collect();

    let min = Vec3::from_array(source_bounds.min) * scale + translation;
    let max = Vec3::from_array(source_bounds.max) * scale + translation;
    Ok(Normalized {
        transform: ModelTransform { scale, translation: translation.to_array() },
        source_bounds,
        bounds: Bounds { min: min.to_array(), max: max.to_array() },
        positions,
    })
}

/// Default cap on a model file fetched from another host.
pub const DEFAULT_FETCH_LIMIT: usize = 200 * 1024 * 1024;

/// Builds [`Scene`]s. Cheap to clone.
pub struct Viewer<B> {
    blobs: Arc<B>,
    http: reqwest::Client,
    fetch_limit: usize,
    remote_fetch: bool,
}

impl<B> Clone for Viewer<B> {
    fn clone(&self) -> Self {
        Self {
            blobs: Arc::clone(&self.blobs),
            http: self.http.clone(),
            fetch_limit: self.fetch_limit,
            remote_fetch: self.remote_fetch,
        }
    }
}

impl<B: BlobStore> Viewer<B> {
    /// `http` is used for model URLs that the blob store did not issue.
    pub fn new(blobs: Arc<B>, http: reqwest::Client) -> Self {
        Self { blobs, http, fetch_limit: DEFAULT_FETCH_LIMIT, remote_fetch: true }
    }

    /// Largest remote body, in bytes, read before giving up.
    pub fn with_fetch_limit(mut self, bytes: usize) -> Self {
        self.fetch_limit = bytes;
        self
    }

    /// Allow or refuse model URLs the blob store did not issue.
    pub fn with_remote_fetch(mut self, enabled: bool) -> Self {
        self.remote_fetch = enabled;
        self
    }

    /// Describe `record` under `settings`. With `include_mesh` the normalised
    /// vertex and index buffers are embedded in the result.
    pub async fn describe(
        &self,
        record: &GeometryRecord,
        settings: ViewerSettings,
        include_mesh: bool,
    ) -> Result<Scene, ViewerError> {
        let file_type = record.file_type().map(str::to_ascii_lowercase);
        let content = match file_type.as_deref() {
            None => SceneContent::Primitive {
                geometry_type: record.geometry_type,
                parameters: record.parameters.clone(),
                material: record.material.clone(),
            },
            Some(file_type) if !is_renderable(file_type) => {
                debug!(geometry_id = %record.id, file_type, "no loader, using placeholder");
                SceneContent::Placeholder {
                    file_type: Some(file_type.to_owned()),
                    reason: format!("{file_type} files cannot be previewed"),
                }
            }
            Some(file_type) if record.file_url.is_empty() => SceneContent::Placeholder {
                file_type: Some(file_type.to_owned()),
                reason: "model file has not been uploaded".to_owned(),
            },
            Some(file_type) => self.load_model(record, file_type, include_mesh).await?,
        };

        Ok(Scene {
            geometry_id: record.id.clone(),
            settings,
            rig: SceneRig::default(),
            content,
        })
    }

    async fn load_model(
        &self,
        record: &GeometryRecord,
        file_type: &str,
        include_mesh: bool,
    ) -> Result<SceneContent, ViewerError> {
        let bytes = self.fetch(&record.file_url).await?;
        let size_bytes = bytes.len();

        let kind = file_type.to_owned();
        let mesh = tokio::task::spawn_blocking(move || loader::load(&kind, &bytes))
            .await
            .map_err(|e| ViewerError::Parse {
                file_type: file_type.to_owned(),
                message: e.to_string(),
            })??;

        let normalized = normalize(&mesh, TARGET_SIZE)?;
        info!(
            geometry_id = %record.id,
            file_type,
            size_bytes,
            vertices = mesh.positions.len(),
            scale = normalized.transform.scale,
            "model normalised"
        );

        Ok(SceneContent::Model {
            file_type: file_type.to_owned(),
            transform: normalized.transform,
            source_bounds: normalized.source_bounds,
            bounds: normalized.bounds,
            vertex_count: mesh.positions.len(),
            material: record.material.clone(),
            mesh: include_mesh.then(|| MeshData {
                positions: normalized.positions,
                indices: mesh.indices,
            }),
        })
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, BlobError> {
        if self.blobs.owns(url) {
            return self.blobs.fetch(url).await;
        }
        if !self.remote_fetch {
            return Err(BlobError::RemoteFetchDisabled(url.to_owned()));
        }
        let parsed = reqwest::Url::parse(url).map_err(|_| BlobError::UnsupportedUrl(url.to_owned()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BlobError::UnsupportedUrl(url.to_owned()));
        }

        warn!(url, "fetching model from a foreign URL");
        let too_large = || BlobError::TooLarge { url: url.to_owned(), limit: self.fetch_limit };
        let mut response = self.http.get(parsed).send().await?.error_for_status()?;
        if response.content_length().is_some_and(|len| len > self.fetch_limit as u64) {
            return Err(too_large());
        }
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.fetch_limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::loader::fixtures::{BOX_OBJ, TRIANGLE_GLTF};
    use super::*;
    use crate::blob::LocalBlobStore;
    use cadvault_types::{params, Category, GeometryType, Material, ParamValue, Parameters, RecordStatus};
    use chrono::Utc;
    use proptest::prelude::*;

    fn record(file_type: Option<&str>, file_url: &str) -> GeometryRecord {
        let mut parameters = Parameters::new();
        if let Some(ft) = file_type {
            parameters.insert(params::FILE_TYPE.to_owned(), ParamValue::from(ft));
        }
        let now = Utc::now();
        GeometryRecord {
            id: "g1".into(),
            name: "part".into(),
            description: String::new(),
            category: Category::Imported,
            geometry_type: GeometryType::Custom,
            parameters,
            material: Material::default(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            created_by: None,
            is_public: true,
            download_count: 0,
            rating: 0.0,
            file_url: file_url.to_owned(),
            thumbnail_url: None,
            status: RecordStatus::Ready,
        }
    }

    async fn viewer(dir: &tempfile::TempDir) -> Viewer<LocalBlobStore> {
        let blobs = LocalBlobStore::open(dir.path(), "http://localhost:3000").await.unwrap();
        Viewer::new(Arc::new(blobs), reqwest::Client::new())
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{a} != {b}");
    }

    #[tokio::test]
    async fn obj_model_is_scaled_to_target_and_centred() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = viewer(&dir).await;
        let url = viewer
            .blobs
            .upload("g1", "box.obj", Bytes::from_static(BOX_OBJ.as_bytes()))
            .await
            .unwrap();

        let scene = viewer
            .describe(&record(Some(".obj"), &url), ViewerSettings::default(), true)
            .await
            .unwrap();
        let SceneContent::Model { transform, source_bounds, bounds, mesh, .. } = scene.content else {
            panic!("expected a model, got {:?}", scene.content);
        };
        assert_eq!(source_bounds.size(), [2.0, 1.0, 4.0]);
        assert_close(transform.scale, 2.0);
        assert_close(bounds.largest_dimension(), TARGET_SIZE);
        for c in bounds.center() {
            assert_close(c, 0.0);
        }
        let mesh = mesh.unwrap();
        assert_eq!(mesh.indices.len(), 24);
        assert_eq!(scene.rig, SceneRig::default());
    }

    #[tokio::test]
    async fn gltf_model_uses_node_transform_before_normalising() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = viewer(&dir).await;
        let url = viewer
            .blobs
            .upload("g1", "tri.gltf", Bytes::from_static(TRIANGLE_GLTF.as_bytes()))
            .await
            .unwrap();

        let scene = viewer
            .describe(&record(Some(".gltf"), &url), ViewerSettings::default(), false)
            .await
            .unwrap();
        let SceneContent::Model { source_bounds, bounds, vertex_count, mesh, .. } = scene.content else {
            panic!("expected a model");
        };
        assert_eq!(source_bounds.size(), [2.0, 4.0, 0.0]);
        assert_eq!(vertex_count, 3);
        assert_close(bounds.largest_dimension(), TARGET_SIZE);
        assert!(mesh.is_none());
    }

    #[tokio::test]
    async fn unrenderable_types_become_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = viewer(&dir).await;
        for ft in [".fbx", ".stp", ".step", ".stl"] {
            let scene = viewer
                .describe(
                    &record(Some(ft), "http://localhost:3000/files/geometries/g1/x"),
                    ViewerSettings::default(),
                    true,
                )
                .await
                .unwrap();
            assert!(
                matches!(scene.content, SceneContent::Placeholder { ref file_type, .. } if file_type.as_deref() == Some(ft))
            );
        }
    }

    #[tokio::test]
    async fn records_without_file_describe_a_primitive() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = viewer(&dir).await;
        let mut rec = record(None, "");
        rec.geometry_type = GeometryType::Torus;
        let settings = ViewerSettings { auto_rotate: true, ..Default::default() };
        let scene = viewer.describe(&rec, settings.clone(), false).await.unwrap();
        assert_eq!(scene.settings, settings);
        assert!(matches!(
            scene.content,
            SceneContent::Primitive { geometry_type: GeometryType::Torus, .. }
        ));
    }

    #[tokio::test]
    async fn file_type_is_matched_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = viewer(&dir).await;
        let url = viewer
            .blobs
            .upload("g1", "BOX.OBJ", Bytes::from_static(BOX_OBJ.as_bytes()))
            .await
            .unwrap();
        let scene = viewer
            .describe(&record(Some(".OBJ"), &url), ViewerSettings::default(), false)
            .await
            .unwrap();
        assert!(matches!(scene.content, SceneContent::Model { ref file_type, .. } if file_type == ".obj"));
    }

    /// Answer one HTTP request on a loopback port with `head` and `body`.
    async fn serve_once(head: String, body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/model.obj")
    }

    async fn remote_viewer(dir: &tempfile::TempDir, limit: usize) -> Viewer<LocalBlobStore> {
        let blobs = LocalBlobStore::open(dir.path(), "http://localhost:3000").await.unwrap();
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        Viewer::new(Arc::new(blobs), http).with_fetch_limit(limit)
    }

    #[tokio::test]
    async fn remote_model_within_limit_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = remote_viewer(&dir, 64 * 1024).await;
        let body = BOX_OBJ.as_bytes().to_vec();
        let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n", body.len());
        let url = serve_once(head, body).await;

        let scene = viewer
            .describe(&record(Some(".obj"), &url), ViewerSettings::default(), false)
            .await
            .unwrap();
        assert!(matches!(scene.content, SceneContent::Model { .. }));
    }

    #[tokio::test]
    async fn oversized_remote_model_is_refused_by_declared_length() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = remote_viewer(&dir, 1024).await;
        let body = vec![b'#'; 4096];
        let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n", body.len());
        let url = serve_once(head, body).await;

        let err = viewer
            .describe(&record(Some(".obj"), &url), ViewerSettings::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::Fetch(BlobError::TooLarge { limit: 1024, .. })), "{err}");
    }

    #[tokio::test]
    async fn oversized_remote_model_is_refused_while_streaming() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = remote_viewer(&dir, 1024).await;
        // No length header: the body runs until the connection closes.
        let head = "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_owned();
        let url = serve_once(head, vec![b'#'; 64 * 1024]).await;

        let err = viewer
            .describe(&record(Some(".obj"), &url), ViewerSettings::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::Fetch(BlobError::TooLarge { .. })), "{err}");
    }

    #[tokio::test]
    async fn non_http_and_disabled_remote_urls_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = remote_viewer(&dir, 1024).await;
        let err = viewer
            .describe(&record(Some(".obj"), "file:///etc/passwd"), ViewerSettings::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::Fetch(BlobError::UnsupportedUrl(_))));

        let viewer = viewer.with_remote_fetch(false);
        let err = viewer
            .describe(&record(Some(".obj"), "http://127.0.0.1:9/a.obj"), ViewerSettings::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::Fetch(BlobError::RemoteFetchDisabled(_))));
    }

    #[tokio::test]
    async fn missing_model_file_is_a_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let viewer = viewer(&dir).await;
        let rec = record(Some(".obj"), "http://localhost:3000/files/geometries/g1/gone.obj");
        let err = viewer.describe(&rec, ViewerSettings::default(), false).await.unwrap_err();
        assert!(matches!(err, ViewerError::Fetch(BlobError::Missing(_))));
    }

    #[test]
    fn flat_or_empty_meshes_are_rejected() {
        assert!(matches!(normalize(&RawMesh::default(), TARGET_SIZE), Err(ViewerError::Empty)));
        let point = RawMesh { positions: vec![Vec3::ONE; 3], indices: vec![0, 1, 2] };
        assert!(matches!(normalize(&point, TARGET_SIZE), Err(ViewerError::Empty)));
    }

    proptest! {
        #[test]
        fn normalised_meshes_fit_the_target_box(
            points in prop::collection::vec(
                (-1000.0f32..1000.0, -1000.0f32..1000.0, -1000.0f32..1000.0),
                2..40,
            )
        ) {
            let mesh = RawMesh {
                positions: points.iter().map(|&(x, y, z)| Vec3::new(x, y, z)).collect(),
                indices: Vec::new(),
            };
            prop_assume!(bounds_of(&mesh.positions).unwrap().largest_dimension() > 1e-3);

            let n = normalize(&mesh, TARGET_SIZE).unwrap();
            let tol = 1e-3 * TARGET_SIZE;
            prop_assert!((n.bounds.largest_dimension() - TARGET_SIZE).abs() < tol);
            for c in n.bounds.center() {
                prop_assert!(c.abs() < tol);
            }
            for p in &n.positions {
                for axis in 0..3 {
                    prop_assert!(p[axis] >= n.bounds.min[axis] - tol);
                    prop_assert!(p[axis] <= n.bounds.max[axis] + tol);
                }
            }
        }
    }
}
