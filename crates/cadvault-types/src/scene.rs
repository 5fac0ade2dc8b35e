//! Scene descriptions produced by the viewer and consumed by the renderer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geometry::{GeometryType, Material, Parameters};

/// Largest bounding-box dimension of a normalised model, in scene units.
pub const TARGET_SIZE: f32 = 8.0;

/// User-adjustable scene settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerSettings {
    pub background_color: String,
    pub show_grid: bool,
    pub show_axes: bool,
    pub auto_rotate: bool,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            background_color: "#ffffff".to_owned(),
            show_grid: true,
            show_axes: true,
            auto_rotate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Light {
    pub intensity: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    pub size: f32,
    pub cell_size: f32,
    pub section_size: f32,
    pub fade_distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrbitSpec {
    pub target: [f32; 3],
    pub min_distance: f32,
    pub max_distance: f32,
    pub auto_rotate_speed: f32,
}

/// Fixed lighting, helpers and camera controls shared by every scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneRig {
    pub ambient: Light,
    pub directional: Light,
    pub point: Light,
    pub grid: GridSpec,
    pub axes_length: f32,
    pub orbit: OrbitSpec,
}

impl Default for SceneRig {
    fn default() -> Self {
        Self {
            ambient: Light { intensity: 0.4, position: None },
            directional: Light { intensity: 1.0, position: Some([10.0, 10.0, 5.0]) },
            point: Light { intensity: 0.5, position: Some([-10.0, -10.0, -5.0]) },
            grid: GridSpec { size: 20.0, cell_size: 1.0, section_size: 5.0, fade_distance: 25.0 },
            axes_length: 5.0,
            orbit: OrbitSpec {
                target: [0.0, 0.0, 0.0],
                min_distance: 2.0,
                max_distance: 20.0,
                auto_rotate_speed: 1.0,
            },
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn largest_dimension(&self) -> f32 {
        let [x, y, z] = self.size();
        x.max(y).max(z)
    }

    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }
}

/// Uniform scale followed by a translation: `p' = p * scale + translation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModelTransform {
    pub scale: f32,
    pub translation: [f32; 3],
}

/// Normalised vertex data, already transformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

/// What the renderer should draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SceneContent {
    /// A loaded, centred and scaled model.
    #[serde(rename_all = "camelCase")]
    Model {
        file_type: String,
        transform: ModelTransform,
        /// Bounds as loaded, before normalisation.
        source_bounds: Bounds,
        /// Bounds after normalisation; centred on the origin.
        bounds: Bounds,
        vertex_count: usize,
        material: Material,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mesh: Option<MeshData>,
    },
    /// A parametric/primitive shape described by its record.
    #[serde(rename_all = "camelCase")]
    Primitive {
        geometry_type: GeometryType,
        #[schema(value_type = Object)]
        parameters: Parameters,
        material: Material,
    },
    /// No loader exists for the file type.
    #[serde(rename_all = "camelCase")]
    Placeholder {
        file_type: Option<String>,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub geometry_id: String,
    pub settings: ViewerSettings,
    pub rig: SceneRig,
    pub content: SceneContent,
}
