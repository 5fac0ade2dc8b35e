//! Geometry record store.
//!
//! [`GeometryStore`] defines the document-collection contract. The default
//! implementation is [`sqlite::SqliteStore`]; to move the collection to
//! another database, implement [`GeometryStore`] for the new type and change
//! the concrete type held by the server state.
//!
//! All trait methods use `impl Future` in their signatures so no extra
//! `async-trait` crate is required.

pub mod sqlite;

use std::future::Future;

use cadvault_types::{GeometryPatch, GeometryRecord, ListFilter, NewGeometry};
use chrono::{DateTime, Utc};

use crate::error::StoreError;

pub use sqlite::SqliteStore;

/// CRUD and query access to the `geometries` collection.
pub trait GeometryStore: Send + Sync + 'static {
    /// Insert a record and return its generated id.
    ///
    /// `createdAt` and `updatedAt` are set to the same instant; the download
    /// count and rating always start at zero.
    fn create(&self, geometry: NewGeometry) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Fetch a record. An unknown id is `Ok(None)`, not an error.
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<GeometryRecord>, StoreError>> + Send;

    /// Filtered, ordered, capped listing. All three are applied by the store.
    fn list(
        &self,
        filter: &ListFilter,
    ) -> impl Future<Output = Result<Vec<GeometryRecord>, StoreError>> + Send;

    /// Merge the present fields of `patch` and stamp `updatedAt`.
    ///
    /// Fails with [`StoreError::NotFound`] for an unknown id.
    fn update(
        &self,
        id: &str,
        patch: GeometryPatch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove a record. Deleting an unknown id succeeds.
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Add one to the download counter in a single atomic update.
    fn increment_download_count(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fold `rating` into the running average in a single atomic update.
    ///
    /// The average is weighted by the current download count:
    /// `(rating * downloadCount + new) / (downloadCount + 1)`.
    fn update_rating(
        &self,
        id: &str,
        rating: f64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete `pending` records created before `cutoff`; returns their ids.
    fn purge_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}
