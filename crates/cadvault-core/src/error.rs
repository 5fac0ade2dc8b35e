use thiserror::Error;

use cadvault_types::ValidationErrors;

/// Input rejected before any store or blob call was made.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The file extension is not on the import allow-list.
    #[error("unsupported file type `{extension}` for `{file_name}` (accepted: .stp, .step, .obj, .fbx, .stl)")]
    UnsupportedFileType { file_name: String, extension: String },

    /// The file name is empty or cannot be turned into a storage key.
    #[error("invalid file name: `{0}`")]
    InvalidFileName(String),

    /// An uploaded file carried no bytes.
    #[error("file `{0}` is empty")]
    EmptyFile(String),

    /// One or more fields failed their declared constraints.
    #[error("invalid fields: {}", missing_or_invalid(.0).join(", "))]
    Fields(#[from] ValidationErrors),

    /// A rating was negative, NaN or infinite.
    #[error("rating must be a finite, non-negative number (got {0})")]
    InvalidRating(f64),
}

impl ValidationError {
    /// Names of the offending fields, sorted.
    pub fn fields(&self) -> Vec<String> {
        match self {
            ValidationError::Fields(errors) => missing_or_invalid(errors),
            _ => Vec::new(),
        }
    }
}

fn missing_or_invalid(errors: &ValidationErrors) -> Vec<String> {
    let mut names: Vec<String> = errors
        .errors()
        .keys()
        .map(|k| k.to_string())
        .collect();
    names.sort();
    names
}

/// Document store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced record does not exist.
    #[error("geometry `{0}` not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A JSON column could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored column holds a value the model does not accept.
    #[error("corrupt record `{id}`: field `{field}`: {reason}")]
    Corrupt {
        id: String,
        field: &'static str,
        reason: String,
    },
}

/// Object storage failures.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("failed to upload `{path}`: {source}")]
    Upload {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete `{url}`: {source}")]
    Delete {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read `{url}`: {source}")]
    Fetch {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// The URL does not point into this store.
    #[error("`{0}` is not a URL issued by this store")]
    ForeignUrl(String),

    /// No object exists at the given storage path.
    #[error("no object at `{0}`")]
    Missing(String),

    #[error("invalid object name `{0}`")]
    InvalidName(String),

    /// A remote download failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote model file is larger than the fetch limit.
    #[error("`{url}` exceeds the {limit} byte fetch limit")]
    TooLarge { url: String, limit: usize },

    /// Only `http` and `https` URLs are fetched remotely.
    #[error("`{0}` is not an http(s) URL")]
    UnsupportedUrl(String),

    /// Remote fetching is switched off and the URL is not ours.
    #[error("fetching `{0}` from another host is disabled")]
    RemoteFetchDisabled(String),
}

/// Failures of the multi-step import sequence.
///
/// Once the record exists, later failures carry its id: the record is left
/// behind as `pending` and can be reclaimed with a pending purge.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to create record: {0}")]
    Create(#[source] StoreError),

    #[error("upload failed; record `{geometry_id}` left pending: {source}")]
    Upload {
        geometry_id: String,
        #[source]
        source: BlobError,
    },

    #[error("failed to finalise record `{geometry_id}`: {source}")]
    Finalize {
        geometry_id: String,
        #[source]
        source: StoreError,
    },
}

impl ImportError {
    /// Id of the record this failure left behind, if one was created.
    pub fn orphaned_record(&self) -> Option<&str> {
        match self {
            ImportError::Upload { geometry_id, .. } | ImportError::Finalize { geometry_id, .. } => {
                Some(geometry_id)
            }
            _ => None,
        }
    }
}

/// Failures of library operations (create, update, rate, ...).
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Blob(#[from] BlobError),
}

/// Failures while building a scene for the viewer.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("failed to fetch model: {0}")]
    Fetch(#[from] BlobError),

    #[error("failed to parse {file_type} model: {message}")]
    Parse { file_type: String, message: String },

    /// The model has no vertices or zero extent.
    #[error("model contains no measurable geometry")]
    Empty,
}
