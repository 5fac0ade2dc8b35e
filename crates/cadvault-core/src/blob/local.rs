//! Filesystem-backed [`BlobStore`].
//!
//! Objects are written under `root/{path}` and published as
//! `{public_base}/files/{path}`; the server mounts that prefix over the same
//! root directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, info};

use super::{is_safe_path, object_path, BlobStore, OBJECT_PREFIX};
use crate::error::BlobError;

/// URL path under which stored objects are served.
pub const FILES_ROUTE: &str = "/files";

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base: String,
}

impl LocalBlobStore {
    /// Open the store rooted at `root`, creating the directory if needed.
    ///
    /// `public_base` is the externally visible origin of the server, e.g.
    /// `http://localhost:3000`.
    pub async fn open(root: impl Into<PathBuf>, public_base: &str) -> std::io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join(OBJECT_PREFIX)).await?;
        info!(root = %root.display(), public_base, "blob store ready");
        Ok(Self {
            root,
            public_base: public_base.trim_end_matches('/').to_owned(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{FILES_ROUTE}/{path}", self.public_base)
    }

    fn disk_path(&self, path: &str) -> PathBuf {
        path.split('/').fold(self.root.clone(), |acc, seg| acc.join(seg))
    }
}

impl BlobStore for LocalBlobStore {
    async fn upload(&self, geometry_id: &str, file_name: &str, bytes: Bytes) -> Result<String, BlobError> {
        let path = object_path(geometry_id, file_name)?;
        let target = self.disk_path(&path);
        let upload_err = |source| BlobError::Upload { path: path.clone(), source };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(upload_err)?;
        }
        // Write beside the target and rename so readers never see a partial file.
        let mut staging = target.clone().into_os_string();
        staging.push(".part");
        let staging = PathBuf::from(staging);
        let written = match tokio::fs::write(&staging, &bytes).await {
            Ok(()) => tokio::fs::rename(&staging, &target).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(upload_err(e));
        }

        debug!(path = %path, size_bytes = bytes.len(), "blob stored");
        Ok(self.url_for(&path))
    }

    async fn delete(&self, url: &str) -> Result<(), BlobError> {
        let path = self
            .path_for_url(url)
            .ok_or_else(|| BlobError::ForeignUrl(url.to_owned()))?;
        let target = self.disk_path(&path);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path, "blob already absent");
            }
            Err(source) => {
                return Err(BlobError::Delete { url: url.to_owned(), source });
            }
        }
        // Drop the per-geometry directory once it is empty; failure just
        // means something else still lives there.
        if let Some(parent) = target.parent() {
            let _ = tokio::fs::remove_dir(parent).await;
        }
        Ok(())
    }

    async fn delete_all(&self, geometry_id: &str) -> Result<(), BlobError> {
        let dir = format!("{OBJECT_PREFIX}/{geometry_id}");
        if !is_safe_path(&dir) || geometry_id.contains('/') {
            return Err(BlobError::InvalidName(geometry_id.to_owned()));
        }
        match tokio::fs::remove_dir_all(self.disk_path(&dir)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BlobError::Delete { url: self.url_for(&dir), source }),
        }
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, BlobError> {
        let path = self
            .path_for_url(url)
            .ok_or_else(|| BlobError::ForeignUrl(url.to_owned()))?;
        match tokio::fs::read(self.disk_path(&path)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::Missing(path)),
            Err(source) => Err(BlobError::Fetch { url: url.to_owned(), source }),
        }
    }

    async fn download_url(&self, path: &str) -> Result<String, BlobError> {
        if !is_safe_path(path) {
            return Err(BlobError::InvalidName(path.to_owned()));
        }
        match tokio::fs::metadata(self.disk_path(path)).await {
            Ok(meta) if meta.is_file() => Ok(self.url_for(path)),
            _ => Err(BlobError::Missing(path.to_owned())),
        }
    }

    fn path_for_url(&self, url: &str) -> Option<String> {
        let path = url
            .strip_prefix(self.public_base.as_str())?
            .strip_prefix(FILES_ROUTE)?
            .strip_prefix('/')?;
        // Drop any query string or fragment a client may have appended.
        let path = path.split(['?', '#']).next().unwrap_or(path);
        is_safe_path(path).then(|| path.to_owned())
    }
}
