//! The geometry record: the one durable entity in cadvault.
//!
//! Field names serialize in camelCase so documents look the same on the wire
//! as they do in storage.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use validator::Validate;

use crate::validate::{validate_hex_color, validate_not_blank};

/// Library category of a record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Primitive,
    Custom,
    Imported,
    Parametric,
}

/// Shape family. Imported files are always [`GeometryType::Custom`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeometryType {
    Cube,
    Sphere,
    Torus,
    Cylinder,
    Cone,
    Custom,
}

/// Visibility of a record in normal listings.
///
/// Imports create their record as `Pending` and flip it to `Ready` once the
/// file URL has been patched in, so half-finished imports never show up in the
/// library.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    #[default]
    Ready,
}

/// A scalar parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Number(value as f64)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Open parameter map. Sorted keys keep documents stable across round trips.
pub type Parameters = BTreeMap<String, ParamValue>;

/// Surface material used when rendering the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    /// `#rrggbb`
    #[validate(custom(function = "validate_hex_color"))]
    pub color: String,
    #[validate(range(min = 0.0, max = 1.0))]
    pub metalness: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub roughness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub opacity: Option<f64>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: "#DC2626".to_owned(),
            metalness: 0.1,
            roughness: 0.2,
            opacity: None,
        }
    }
}

/// A stored geometry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeometryRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub geometry_type: GeometryType,
    #[schema(value_type = Object)]
    pub parameters: Parameters,
    pub material: Material,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub is_public: bool,
    pub download_count: i64,
    pub rating: f64,
    #[serde(default)]
    pub file_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
}

impl GeometryRecord {
    /// Extension (with the dot) recorded at import time, as stored. Callers
    /// compare it case-insensitively.
    pub fn file_type(&self) -> Option<&str> {
        self.parameters
            .get(crate::params::FILE_TYPE)
            .and_then(ParamValue::as_str)
    }

    /// Case-insensitive substring match against name, description and tags.
    ///
    /// `needle` must already be lower-cased.
    pub fn matches_term(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// Input for creating a record.
///
/// There is no id, timestamp, download count or rating here: the store
/// assigns those. Unknown JSON fields (including `downloadCount` and `rating`)
/// are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewGeometry {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub geometry_type: GeometryType,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub parameters: Parameters,
    #[serde(default)]
    #[validate(nested)]
    pub material: Material,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
}

fn default_public() -> bool {
    true
}

impl NewGeometry {
    pub fn new(name: impl Into<String>, category: Category, geometry_type: GeometryType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category,
            geometry_type,
            parameters: Parameters::new(),
            material: Material::default(),
            tags: Vec::new(),
            created_by: None,
            is_public: true,
            file_url: String::new(),
            thumbnail_url: None,
            status: RecordStatus::Ready,
        }
    }
}

/// Partial update. Absent fields are left untouched.
///
/// Counters are not patchable: they move only through the dedicated
/// download-count and rating operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeometryPatch {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub geometry_type: Option<GeometryType>,
    #[schema(value_type = Option<Object>)]
    pub parameters: Option<Parameters>,
    #[validate(nested)]
    pub material: Option<Material>,
    pub tags: Option<Vec<String>>,
    pub created_by: Option<String>,
    pub is_public: Option<bool>,
    pub file_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: Option<RecordStatus>,
}

/// Trim tags, drop empty ones and duplicates, keep first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_owned());
        }
    }
    out
}
