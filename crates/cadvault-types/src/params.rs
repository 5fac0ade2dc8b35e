//! Well-known keys in [`crate::Parameters`].
//!
//! The first three are written by the importer for every uploaded file; the
//! rest carry the inspection metadata collected alongside it.

pub const FILE_NAME: &str = "fileName";
pub const FILE_SIZE: &str = "fileSize";
pub const FILE_TYPE: &str = "fileType";

pub const PROJECT_NAME: &str = "projectName";
pub const ASSET_NAME: &str = "assetName";
pub const ASSET_TYPE: &str = "assetType";
pub const INSPECTION_TYPE: &str = "inspectionType";
pub const LAST_INSPECTED: &str = "lastInspected";
pub const ENGINEER_IN_CHARGE: &str = "engineerInCharge";
