//! Object storage for uploaded model files.
//!
//! Objects live at `geometries/{geometryId}/{fileName}` and are addressed by
//! the public URL returned from [`BlobStore::upload`]. The shipped
//! implementation is [`local::LocalBlobStore`].

pub mod local;

use std::future::Future;

use bytes::Bytes;

use crate::error::BlobError;

pub use local::LocalBlobStore;

/// Top-level prefix for every model object.
pub const OBJECT_PREFIX: &str = "geometries";

/// Binary upload/download/delete against an object store.
pub trait BlobStore: Send + Sync + 'static {
    /// Store `bytes` for `geometry_id` and return a publicly resolvable URL.
    fn upload(
        &self,
        geometry_id: &str,
        file_name: &str,
        bytes: Bytes,
    ) -> impl Future<Output = Result<String, BlobError>> + Send;

    /// Remove the object behind `url`.
    fn delete(&self, url: &str) -> impl Future<Output = Result<(), BlobError>> + Send;

    /// Remove every object stored for `geometry_id`.
    fn delete_all(&self, geometry_id: &str) -> impl Future<Output = Result<(), BlobError>> + Send;

    /// Read the object behind one of this store's URLs.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Bytes, BlobError>> + Send;

    /// Public URL for an existing storage path.
    fn download_url(&self, path: &str) -> impl Future<Output = Result<String, BlobError>> + Send;

    /// Storage path behind one of this store's URLs, or `None` for a URL it
    /// did not issue.
    fn path_for_url(&self, url: &str) -> Option<String>;

    /// Whether `url` was issued by this store.
    fn owns(&self, url: &str) -> bool {
        self.path_for_url(url).is_some()
    }
}

/// Storage prefix holding every object of `geometry_id`, with trailing slash.
pub fn geometry_prefix(geometry_id: &str) -> String {
    format!("{OBJECT_PREFIX}/{geometry_id}/")
}

/// Storage path for a model file: `geometries/{geometryId}/{fileName}`.
///
/// Only the final component of `file_name` is kept, and characters outside
/// `[A-Za-z0-9._-]` become `_` so the path is safe both on disk and in a URL.
pub fn object_path(geometry_id: &str, file_name: &str) -> Result<String, BlobError> {
    if geometry_id.is_empty()
        || !geometry_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(BlobError::InvalidName(geometry_id.to_owned()));
    }
    let name = sanitize_file_name(file_name);
    if name.is_empty() || name.chars().all(|c| c == '.') {
        return Err(BlobError::InvalidName(file_name.to_owned()));
    }
    Ok(format!("{OBJECT_PREFIX}/{geometry_id}/{name}"))
}

fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// Reject storage paths that could escape the store root.
pub(crate) fn is_safe_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && path
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != ".." && !seg.contains('\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_keys_by_geometry_and_file() {
        assert_eq!(
            object_path("abc-123", "bracket.obj").unwrap(),
            "geometries/abc-123/bracket.obj"
        );
    }

    #[test]
    fn object_path_strips_directories_and_odd_characters() {
        assert_eq!(
            object_path("g1", "C:\\models\\Pump Housing (rev 2).STEP").unwrap(),
            "geometries/g1/Pump_Housing__rev_2_.STEP"
        );
        assert_eq!(object_path("g1", "../../etc/passwd").unwrap(), "geometries/g1/passwd");
    }

    #[test]
    fn object_path_rejects_unusable_names() {
        assert!(object_path("g1", "..").is_err());
        assert!(object_path("g1", "dir/").is_err());
        assert!(object_path("", "a.obj").is_err());
        assert!(object_path("../g1", "a.obj").is_err());
    }

    #[test]
    fn safe_paths() {
        assert!(is_safe_path("geometries/g1/a.obj"));
        assert!(!is_safe_path("/etc/passwd"));
        assert!(!is_safe_path("geometries/../secret"));
        assert!(!is_safe_path("geometries//a"));
        assert!(!is_safe_path(""));
    }
}
