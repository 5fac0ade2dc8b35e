use cadvault_types::{Category, Direction, ListFilter, OrderBy, ViewerSettings};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query string of `GET /v1/geometries`.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ListQuery {
    pub category: Option<Category>,
    /// Comma-separated; matches records carrying any of them.
    pub tags: Option<String>,
    pub order_by: Option<OrderBy>,
    pub direction: Option<Direction>,
    pub limit: Option<u32>,
    pub include_pending: Option<bool>,
}

impl ListQuery {
    pub fn into_filter(self) -> ListFilter {
        ListFilter {
            category: self.category,
            tags: self
                .tags
                .map(|t| t.split(',').map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()).collect())
                .unwrap_or_default(),
            order_by: self.order_by,
            direction: self.direction.unwrap_or_default(),
            limit: self.limit,
            include_pending: self.include_pending.unwrap_or(false),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring; empty returns everything.
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeaturedQuery {
    /// Defaults to 10.
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RatingRequest {
    pub rating: f64,
}

/// Query string of `GET /v1/geometries/{id}/scene`.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct SceneQuery {
    pub background_color: Option<String>,
    pub show_grid: Option<bool>,
    pub show_axes: Option<bool>,
    pub auto_rotate: Option<bool>,
    /// Embed normalised vertex and index buffers.
    pub include_mesh: Option<bool>,
}

impl SceneQuery {
    pub fn settings(&self) -> ViewerSettings {
        let defaults = ViewerSettings::default();
        ViewerSettings {
            background_color: self.background_color.clone().unwrap_or(defaults.background_color),
            show_grid: self.show_grid.unwrap_or(defaults.show_grid),
            show_axes: self.show_axes.unwrap_or(defaults.show_axes),
            auto_rotate: self.auto_rotate.unwrap_or(defaults.auto_rotate),
        }
    }
}
