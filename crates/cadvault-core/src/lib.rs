//! Data access and model handling for cadvault.
//!
//! - [`store`]: the geometry record collection ([`GeometryStore`], SQLite).
//! - [`blob`]: model file storage ([`BlobStore`], local filesystem).
//! - [`import`]: the validate / create / upload / finalise sequence.
//! - [`library`]: search, featured listings, counters and deletion.
//! - [`viewer`]: turns a record into a renderable [`cadvault_types::Scene`].

pub mod blob;
pub mod error;
pub mod import;
pub mod library;
pub mod store;
pub mod viewer;

pub use blob::{BlobStore, LocalBlobStore};
pub use error::{BlobError, ImportError, LibraryError, StoreError, ValidationError, ViewerError};
pub use import::{validate_file_name, ImportRequest, Importer};
pub use library::Library;
pub use store::{GeometryStore, SqliteStore};
pub use viewer::Viewer;
