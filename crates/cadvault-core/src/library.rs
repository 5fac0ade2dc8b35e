//! Library operations on top of the record and blob stores.

use std::sync::Arc;

use cadvault_types::{Direction, GeometryPatch, GeometryRecord, ListFilter, NewGeometry, OrderBy, Validate};
use chrono::{Duration, Utc};
use tracing::{debug, info, instrument, warn};

use crate::blob::{geometry_prefix, BlobStore};
use crate::error::{BlobError, LibraryError, StoreError, ValidationError};
use crate::store::GeometryStore;

/// Default cap for [`Library::popular`] and [`Library::recent`].
pub const DEFAULT_FEATURED_LIMIT: u32 = 10;

pub struct Library<S, B> {
    store: Arc<S>,
    blobs: Arc<B>,
}

impl<S, B> Clone for Library<S, B> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), blobs: Arc::clone(&self.blobs) }
    }
}

impl<S: GeometryStore, B: BlobStore> Library<S, B> {
    pub fn new(store: Arc<S>, blobs: Arc<B>) -> Self {
        Self { store, blobs }
    }

    /// Validate and insert a record, returning it as stored.
    #[instrument(skip_all, fields(name = %geometry.name))]
    pub async fn create(&self, geometry: NewGeometry) -> Result<GeometryRecord, LibraryError> {
        geometry.validate().map_err(ValidationError::from)?;
        let id = self.store.create(geometry).await?;
        info!(geometry_id = %id, "geometry created");
        self.fetch(&id).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<GeometryRecord>, LibraryError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn list(&self, filter: &ListFilter) -> Result<Vec<GeometryRecord>, LibraryError> {
        Ok(self.store.list(filter).await?)
    }

    /// Validate and apply `patch`, returning the updated record.
    pub async fn update(&self, id: &str, patch: GeometryPatch) -> Result<GeometryRecord, LibraryError> {
        patch.validate().map_err(ValidationError::from)?;
        self.store.update(id, patch).await?;
        self.fetch(id).await
    }

    /// Delete the record, then its model file.
    ///
    /// The file is removed best-effort: a failure is logged and the call
    /// still succeeds. Unknown ids are not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), LibraryError> {
        let Some(record) = self.store.get(id).await? else {
            debug!("nothing to delete");
            return Ok(());
        };
        self.store.delete(id).await?;
        info!("geometry deleted");

        if record.file_url.is_empty() {
            return Ok(());
        }
        match self.blobs.path_for_url(&record.file_url) {
            None => {
                debug!(file_url = %record.file_url, "model file not held by this store, leaving it");
            }
            // Only files stored under this record's own prefix are its to remove.
            Some(path) if !path.starts_with(&geometry_prefix(id)) => {
                warn!(file_url = %record.file_url, "model file belongs to another record, leaving it");
            }
            Some(_) => {
                if let Err(e) = self.blobs.delete(&record.file_url).await {
                    warn!(file_url = %record.file_url, error = %e, "failed to delete model file");
                }
            }
        }
        Ok(())
    }

    /// Resolved download URL of the record's model file.
    ///
    /// Files held by this store are checked for existence; a URL hosted
    /// elsewhere is returned as recorded. `None` when the record does not
    /// exist or has no file.
    pub async fn file_url(&self, id: &str) -> Result<Option<String>, LibraryError> {
        let Some(record) = self.store.get(id).await? else {
            return Ok(None);
        };
        if record.file_url.is_empty() {
            return Ok(None);
        }
        let Some(path) = self.blobs.path_for_url(&record.file_url) else {
            return Ok(Some(record.file_url));
        };
        match self.blobs.download_url(&path).await {
            Ok(url) => Ok(Some(url)),
            Err(BlobError::Missing(_)) => {
                warn!(geometry_id = %id, %path, "record points at a missing model file");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Case-insensitive substring search over name, description and tags.
    ///
    /// Loads the whole collection and filters in memory, so cost grows with
    /// the number of records. An empty term matches everything.
    pub async fn search(&self, term: &str) -> Result<Vec<GeometryRecord>, LibraryError> {
        let all = self.store.list(&ListFilter::default()).await?;
        if term.is_empty() {
            return Ok(all);
        }
        let needle = term.to_lowercase();
        Ok(all.into_iter().filter(|r| r.matches_term(&needle)).collect())
    }

    /// Most downloaded first.
    pub async fn popular(&self, limit: Option<u32>) -> Result<Vec<GeometryRecord>, LibraryError> {
        self.featured(OrderBy::DownloadCount, limit).await
    }

    /// Newest first.
    pub async fn recent(&self, limit: Option<u32>) -> Result<Vec<GeometryRecord>, LibraryError> {
        self.featured(OrderBy::CreatedAt, limit).await
    }

    async fn featured(&self, order_by: OrderBy, limit: Option<u32>) -> Result<Vec<GeometryRecord>, LibraryError> {
        let filter = ListFilter::default()
            .order(order_by, Direction::Desc)
            .limit(limit.unwrap_or(DEFAULT_FEATURED_LIMIT));
        self.list(&filter).await
    }

    pub async fn record_download(&self, id: &str) -> Result<(), LibraryError> {
        self.store.increment_download_count(id).await?;
        debug!(geometry_id = %id, "download recorded");
        Ok(())
    }

    /// Fold a user rating into the record's running average.
    pub async fn rate(&self, id: &str, rating: f64) -> Result<GeometryRecord, LibraryError> {
        if !rating.is_finite() || rating < 0.0 {
            return Err(ValidationError::InvalidRating(rating).into());
        }
        self.store.update_rating(id, rating).await?;
        self.fetch(id).await
    }

    /// Remove `pending` records older than `older_than` along with any files
    /// uploaded for them. Returns the ids that were purged.
    #[instrument(skip(self))]
    pub async fn purge_pending(&self, older_than: Duration) -> Result<Vec<String>, LibraryError> {
        let cutoff = Utc::now() - older_than;
        let ids = self.store.purge_pending(cutoff).await?;
        for id in &ids {
            if let Err(e) = self.blobs.delete_all(id).await {
                warn!(geometry_id = %id, error = %e, "failed to remove files of purged record");
            }
        }
        info!(purged = ids.len(), "pending records purged");
        Ok(ids)
    }

    async fn fetch(&self, id: &str) -> Result<GeometryRecord, LibraryError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_owned()).into())
    }
}
