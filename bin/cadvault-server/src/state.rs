//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use cadvault_core::{Importer, Library, LocalBlobStore, SqliteStore, Viewer};

use crate::config::Config;

/// State shared across all HTTP handlers.
///
/// The store and blob clients are built once in `main` and shared through
/// the services below.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<SqliteStore>,
    pub blobs: Arc<LocalBlobStore>,
    pub library: Library<SqliteStore, LocalBlobStore>,
    pub importer: Importer<SqliteStore, LocalBlobStore>,
    pub viewer: Viewer<LocalBlobStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: SqliteStore,
        blobs: LocalBlobStore,
        http: reqwest::Client,
    ) -> Self {
        let store = Arc::new(store);
        let blobs = Arc::new(blobs);
        let viewer = Viewer::new(Arc::clone(&blobs), http)
            .with_fetch_limit(config.max_upload_bytes())
            .with_remote_fetch(config.remote_fetch);
        Self {
            config: Arc::new(config),
            library: Library::new(Arc::clone(&store), Arc::clone(&blobs)),
            importer: Importer::new(Arc::clone(&store), Arc::clone(&blobs)),
            viewer,
            store,
            blobs,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("storage_root", &self.blobs.root())
            .finish_non_exhaustive()
    }
}
