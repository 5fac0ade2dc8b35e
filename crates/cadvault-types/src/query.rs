//! Listing filters for the record store.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::geometry::Category;

/// Sort key for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum OrderBy {
    CreatedAt,
    DownloadCount,
    Rating,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

/// Filter, order and cap for a store listing.
///
/// `tags` matches records carrying *any* of the given tags. There is no
/// cursor: callers needing more rows re-query with a larger `limit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    pub category: Option<Category>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub order_by: Option<OrderBy>,
    #[serde(default)]
    pub direction: Direction,
    pub limit: Option<u32>,
    /// Include records whose import has not finished.
    #[serde(default)]
    pub include_pending: bool,
}

impl ListFilter {
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn any_tag<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn order(mut self, order_by: OrderBy, direction: Direction) -> Self {
        self.order_by = Some(order_by);
        self.direction = direction;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_pending(mut self) -> Self {
        self.include_pending = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn order_keys_parse_from_camel_case() {
        assert_eq!(OrderBy::from_str("downloadCount").unwrap(), OrderBy::DownloadCount);
        assert_eq!(OrderBy::CreatedAt.to_string(), "createdAt");
        assert_eq!(Direction::from_str("asc").unwrap(), Direction::Asc);
        assert_eq!(Direction::default(), Direction::Desc);
    }

    #[test]
    fn builder_composes() {
        let filter = ListFilter::default()
            .category(Category::Imported)
            .any_tag(["bolt", "nut"])
            .order(OrderBy::Rating, Direction::Asc)
            .limit(5);
        assert_eq!(filter.category, Some(Category::Imported));
        assert_eq!(filter.tags, vec!["bolt".to_owned(), "nut".to_owned()]);
        assert_eq!(filter.limit, Some(5));
        assert!(!filter.include_pending);
    }
}
