//! Shared types for cadvault: the geometry record, listing filters, import
//! metadata and viewer scene descriptions.

pub mod geometry;
pub mod import;
pub mod params;
pub mod query;
pub mod scene;
mod validate;

pub use geometry::{
    normalize_tags, Category, GeometryPatch, GeometryRecord, GeometryType, Material, NewGeometry,
    ParamValue, Parameters, RecordStatus,
};
pub use import::{
    file_extension, is_accepted, is_renderable, ImportOutcome, InspectionMetadata,
    ACCEPTED_EXTENSIONS, RENDERABLE_EXTENSIONS,
};
pub use query::{Direction, ListFilter, OrderBy};
pub use scene::{
    Bounds, MeshData, ModelTransform, Scene, SceneContent, SceneRig, ViewerSettings, TARGET_SIZE,
};

pub use validator::{Validate, ValidationErrors};
