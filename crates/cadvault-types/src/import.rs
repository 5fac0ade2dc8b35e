//! Import-time metadata and the file-type tables.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::geometry::{GeometryRecord, ParamValue, Parameters};
use crate::params;
use crate::validate::validate_not_blank;

/// Extensions the importer accepts.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[".stp", ".step", ".obj", ".fbx", ".stl"];

/// Extensions the viewer can turn into geometry.
pub const RENDERABLE_EXTENSIONS: &[&str] = &[".obj", ".gltf", ".glb"];

/// Lower-cased extension of `file_name`, including the leading dot.
///
/// Returns `None` when there is no dot in the final path component.
pub fn file_extension(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.rfind('.').map(|i| base[i..].to_ascii_lowercase())
}

pub fn is_accepted(extension: &str) -> bool {
    ACCEPTED_EXTENSIONS.contains(&extension)
}

pub fn is_renderable(extension: &str) -> bool {
    RENDERABLE_EXTENSIONS.contains(&extension)
}

/// Inspection metadata collected with every upload. All fields are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InspectionMetadata {
    #[validate(custom(function = "validate_not_blank"))]
    pub project_name: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub asset_name: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub asset_type: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub inspection_type: String,
    /// Free-form date as entered, e.g. `2025-03-14`.
    #[validate(custom(function = "validate_not_blank"))]
    pub last_inspected: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub engineer_in_charge: String,
}

impl InspectionMetadata {
    /// Write the metadata into a parameter map under its well-known keys.
    pub fn write_into(&self, parameters: &mut Parameters) {
        let fields = [
            (params::PROJECT_NAME, &self.project_name),
            (params::ASSET_NAME, &self.asset_name),
            (params::ASSET_TYPE, &self.asset_type),
            (params::INSPECTION_TYPE, &self.inspection_type),
            (params::LAST_INSPECTED, &self.last_inspected),
            (params::ENGINEER_IN_CHARGE, &self.engineer_in_charge),
        ];
        for (key, value) in fields {
            parameters.insert(key.to_owned(), ParamValue::Text(value.trim().to_owned()));
        }
    }
}

/// Result of a completed import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub record: GeometryRecord,
    /// `false` when the viewer has no loader for this file type.
    pub renderable: bool,
}
