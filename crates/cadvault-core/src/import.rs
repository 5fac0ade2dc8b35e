//! Model file import: validate, create a pending record, upload, finalise.
//!
//! There is no rollback. If the upload or the final patch fails, the record
//! stays `pending` (hidden from listings) and its id is reported through
//! [`ImportError::orphaned_record`] so it can be purged later.

use std::sync::Arc;

use bytes::Bytes;
use cadvault_types::{
    file_extension, is_accepted, is_renderable, params, Category, GeometryPatch, GeometryType,
    ImportOutcome, InspectionMetadata, Material, NewGeometry, ParamValue, Parameters, RecordStatus,
    Validate,
};
use tracing::{info, instrument, warn};

use crate::blob::BlobStore;
use crate::error::{ImportError, StoreError, ValidationError};
use crate::store::GeometryStore;

/// Tags every imported record carries ahead of any caller tags.
pub const IMPORT_TAGS: [&str; 2] = ["imported", "3d-model"];

/// Check `file_name` against the import allow-list and return its
/// lower-cased extension.
pub fn validate_file_name(file_name: &str) -> Result<String, ValidationError> {
    let trimmed = file_name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidFileName(file_name.to_owned()));
    }
    let extension = file_extension(trimmed).unwrap_or_default();
    if !is_accepted(&extension) {
        return Err(ValidationError::UnsupportedFileType {
            file_name: trimmed.to_owned(),
            extension,
        });
    }
    Ok(extension)
}

/// Final path component of `file_name` with its extension removed.
fn display_name(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(0) | None => base,
        Some(i) => &base[..i],
    }
}

/// One uploaded file plus what the user typed alongside it.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub file_name: String,
    pub bytes: Bytes,
    pub metadata: InspectionMetadata,
    /// Extra tags, appended after [`IMPORT_TAGS`].
    pub tags: Vec<String>,
    /// Replaces the generated `Imported 3D model: ...` description.
    pub description: Option<String>,
    pub created_by: Option<String>,
}

impl ImportRequest {
    pub fn new(file_name: impl Into<String>, bytes: Bytes, metadata: InspectionMetadata) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            metadata,
            tags: Vec::new(),
            description: None,
            created_by: None,
        }
    }

    /// Record skeleton for this import, still `pending` and without a URL.
    fn to_new_geometry(&self, extension: &str) -> NewGeometry {
        let file_name = self.file_name.trim();
        let mut parameters = Parameters::new();
        parameters.insert(params::FILE_NAME.to_owned(), ParamValue::from(file_name));
        parameters.insert(params::FILE_SIZE.to_owned(), ParamValue::from(self.bytes.len() as u64));
        parameters.insert(params::FILE_TYPE.to_owned(), ParamValue::from(extension));
        self.metadata.write_into(&mut parameters);

        let mut tags: Vec<String> = IMPORT_TAGS.iter().map(|t| (*t).to_owned()).collect();
        tags.extend(self.tags.iter().cloned());

        NewGeometry {
            name: display_name(file_name).to_owned(),
            description: self
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| format!("Imported 3D model: {file_name}")),
            category: Category::Imported,
            geometry_type: GeometryType::Custom,
            parameters,
            material: Material::default(),
            tags,
            created_by: self.created_by.clone(),
            is_public: true,
            file_url: String::new(),
            thumbnail_url: None,
            status: RecordStatus::Pending,
        }
    }
}

/// Runs the import sequence against a record store and a blob store.
pub struct Importer<S, B> {
    store: Arc<S>,
    blobs: Arc<B>,
}

impl<S, B> Clone for Importer<S, B> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), blobs: Arc::clone(&self.blobs) }
    }
}

impl<S: GeometryStore, B: BlobStore> Importer<S, B> {
    pub fn new(store: Arc<S>, blobs: Arc<B>) -> Self {
        Self { store, blobs }
    }

    /// Import one file. Nothing is written until both the file name and the
    /// metadata have been validated.
    #[instrument(skip_all, fields(file_name = %request.file_name, size_bytes = request.bytes.len()))]
    pub async fn import(&self, request: ImportRequest) -> Result<ImportOutcome, ImportError> {
        let extension = validate_file_name(&request.file_name)?;
        request.metadata.validate().map_err(ValidationError::from)?;
        if request.bytes.is_empty() {
            return Err(ValidationError::EmptyFile(request.file_name.trim().to_owned()).into());
        }

        let renderable = is_renderable(&extension);
        if !renderable {
            warn!(%extension, "accepted file type has no viewer loader");
        }

        let geometry_id = self
            .store
            .create(request.to_new_geometry(&extension))
            .await
            .map_err(ImportError::Create)?;
        info!(%geometry_id, "pending record created");

        let file_url = self
            .blobs
            .upload(&geometry_id, request.file_name.trim(), request.bytes.clone())
            .await
            .map_err(|source| ImportError::Upload { geometry_id: geometry_id.clone(), source })?;
        info!(%geometry_id, %file_url, "model file uploaded");

        let finalize_err = |source: StoreError| ImportError::Finalize { geometry_id: geometry_id.clone(), source };
        let patch = GeometryPatch {
            file_url: Some(file_url),
            status: Some(RecordStatus::Ready),
            ..Default::default()
        };
        self.store.update(&geometry_id, patch).await.map_err(finalize_err)?;
        let record = self
            .store
            .get(&geometry_id)
            .await
            .map_err(finalize_err)?
            .ok_or_else(|| finalize_err(StoreError::NotFound(geometry_id.clone())))?;

        info!(%geometry_id, renderable, "import complete");
        Ok(ImportOutcome { record, renderable })
    }
}
