//! SQLite implementation of [`GeometryStore`].
//!
//! Uses [`sqlx`] with the `sqlite` feature. Migrations are run automatically
//! on startup via [`SqliteStore::connect`].
//!
//! # Documents
//!
//! `parameters`, `material` and `tags` are stored as JSON text; tag filters go
//! through SQLite's `json_each`. Timestamps are integer microseconds so that
//! ordering is numeric and `updatedAt` can be forced strictly forward with
//! `MAX(now, updated_at + 1)`.
//!
//! # Queries
//!
//! The `sqlx::query` (runtime-verified) form is used so that no
//! `DATABASE_URL` environment variable is needed at compile time.

use std::str::FromStr;
use std::time::Duration;

use cadvault_types::{
    normalize_tags, Category, Direction, GeometryPatch, GeometryRecord, GeometryType, ListFilter,
    NewGeometry, OrderBy, RecordStatus,
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};
use uuid::Uuid;

use super::GeometryStore;
use crate::error::StoreError;

const SELECT_GEOMETRIES: &str = "SELECT id, name, description, category, geometry_type, parameters, \
     material, tags, created_at, updated_at, created_by, is_public, download_count, rating, \
     file_url, thumbnail_url, status FROM geometries";

/// SQLite-backed geometry collection.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g.
    /// `"sqlite://cadvault.db"` or `"sqlite::memory:"` for tests.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let mut pool_options = SqlitePoolOptions::new();
        if in_memory {
            // Every connection to `:memory:` opens its own empty database.
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(in_memory, "geometry store ready");
        Ok(Self { pool })
    }

    /// Round-trip a trivial query; used by the health endpoint.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GeometryRow {
    id: String,
    name: String,
    description: String,
    category: String,
    geometry_type: String,
    parameters: String,
    material: String,
    tags: String,
    created_at: i64,
    updated_at: i64,
    created_by: Option<String>,
    is_public: bool,
    download_count: i64,
    rating: f64,
    file_url: String,
    thumbnail_url: Option<String>,
    status: String,
}

impl GeometryRow {
    fn into_record(self) -> Result<GeometryRecord, StoreError> {
        let corrupt = |field: &'static str, reason: String| StoreError::Corrupt {
            id: self.id.clone(),
            field,
            reason,
        };
        let category = self
            .category
            .parse::<Category>()
            .map_err(|_| corrupt("category", format!("unknown category `{}`", self.category)))?;
        let geometry_type = self
            .geometry_type
            .parse::<GeometryType>()
            .map_err(|_| corrupt("geometry_type", format!("unknown type `{}`", self.geometry_type)))?;
        let status = self
            .status
            .parse::<RecordStatus>()
            .map_err(|_| corrupt("status", format!("unknown status `{}`", self.status)))?;
        let created_at = from_micros(self.created_at)
            .ok_or_else(|| corrupt("created_at", format!("out of range: {}", self.created_at)))?;
        let updated_at = from_micros(self.updated_at)
            .ok_or_else(|| corrupt("updated_at", format!("out of range: {}", self.updated_at)))?;

        Ok(GeometryRecord {
            parameters: serde_json::from_str(&self.parameters)?,
            material: serde_json::from_str(&self.material)?,
            tags: serde_json::from_str(&self.tags)?,
            id: self.id,
            name: self.name,
            description: self.description,
            category,
            geometry_type,
            created_at,
            updated_at,
            created_by: self.created_by,
            is_public: self.is_public,
            download_count: self.download_count,
            rating: self.rating,
            file_url: self.file_url,
            thumbnail_url: self.thumbnail_url,
            status,
        })
    }
}

fn from_micros(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
}

fn order_column(order_by: OrderBy) -> &'static str {
    match order_by {
        OrderBy::CreatedAt => "created_at",
        OrderBy::DownloadCount => "download_count",
        OrderBy::Rating => "rating",
    }
}

impl GeometryStore for SqliteStore {
    async fn create(&self, geometry: NewGeometry) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp_micros();
        let parameters = serde_json::to_string(&geometry.parameters)?;
        let material = serde_json::to_string(&geometry.material)?;
        let tags = serde_json::to_string(&normalize_tags(&geometry.tags))?;

        sqlx::query(
            "INSERT INTO geometries \
             (id, name, description, category, geometry_type, parameters, material, tags, \
              created_at, updated_at, created_by, is_public, download_count, rating, \
              file_url, thumbnail_url, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10, ?11, 0, 0, ?12, ?13, ?14)",
        )
        .bind(&id)
        .bind(&geometry.name)
        .bind(&geometry.description)
        .bind(geometry.category.to_string())
        .bind(geometry.geometry_type.to_string())
        .bind(&parameters)
        .bind(&material)
        .bind(&tags)
        .bind(now)
        .bind(&geometry.created_by)
        .bind(geometry.is_public)
        .bind(&geometry.file_url)
        .bind(&geometry.thumbnail_url)
        .bind(geometry.status.to_string())
        .execute(&self.pool)
        .await?;

        debug!(geometry_id = %id, category = %geometry.category, "geometry created");
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<GeometryRecord>, StoreError> {
        let sql = format!("{SELECT_GEOMETRIES} WHERE id = ?1");
        let row: Option<GeometryRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(GeometryRow::into_record).transpose()
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<GeometryRecord>, StoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_GEOMETRIES);
        qb.push(" WHERE 1 = 1");

        if !filter.include_pending {
            qb.push(" AND status = ").push_bind(RecordStatus::Ready.to_string());
        }
        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category.to_string());
        }

        let tags = normalize_tags(&filter.tags);
        if !tags.is_empty() {
            qb.push(" AND EXISTS (SELECT 1 FROM json_each(geometries.tags) WHERE json_each.value IN (");
            let mut values = qb.separated(", ");
            for tag in tags {
                values.push_bind(tag);
            }
            values.push_unseparated("))");
        }

        match filter.order_by {
            Some(order_by) => {
                let direction = match filter.direction {
                    Direction::Asc => " ASC",
                    Direction::Desc => " DESC",
                };
                // Insertion order breaks ties, in the same direction.
                qb.push(" ORDER BY ")
                    .push(order_column(order_by))
                    .push(direction)
                    .push(", rowid")
                    .push(direction);
            }
            None => {
                qb.push(" ORDER BY rowid ASC");
            }
        }

        // A zero limit means "no cap".
        if let Some(limit) = filter.limit.filter(|l| *l > 0) {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows: Vec<GeometryRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(GeometryRow::into_record).collect()
    }

    async fn update(&self, id: &str, patch: GeometryPatch) -> Result<(), StoreError> {
        let now = Utc::now().timestamp_micros();
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE geometries SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(v) = patch.name {
                set.push("name = ").push_bind_unseparated(v);
            }
            if let Some(v) = patch.description {
                set.push("description = ").push_bind_unseparated(v);
            }
            if let Some(v) = patch.category {
                set.push("category = ").push_bind_unseparated(v.to_string());
            }
            if let Some(v) = patch.geometry_type {
                set.push("geometry_type = ").push_bind_unseparated(v.to_string());
            }
            if let Some(v) = patch.parameters {
                set.push("parameters = ").push_bind_unseparated(serde_json::to_string(&v)?);
            }
            if let Some(v) = patch.material {
                set.push("material = ").push_bind_unseparated(serde_json::to_string(&v)?);
            }
            if let Some(v) = patch.tags {
                set.push("tags = ")
                    .push_bind_unseparated(serde_json::to_string(&normalize_tags(&v))?);
            }
            if let Some(v) = patch.created_by {
                set.push("created_by = ").push_bind_unseparated(v);
            }
            if let Some(v) = patch.is_public {
                set.push("is_public = ").push_bind_unseparated(v);
            }
            if let Some(v) = patch.file_url {
                set.push("file_url = ").push_bind_unseparated(v);
            }
            if let Some(v) = patch.thumbnail_url {
                set.push("thumbnail_url = ").push_bind_unseparated(v);
            }
            if let Some(v) = patch.status {
                set.push("status = ").push_bind_unseparated(v.to_string());
            }
            set.push("updated_at = MAX(")
                .push_bind_unseparated(now)
                .push_unseparated(", updated_at + 1)");
        }
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_owned()));
        }
        debug!(geometry_id = %id, "geometry updated");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM geometries WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        debug!(geometry_id = %id, deleted = result.rows_affected(), "geometry delete");
        Ok(())
    }

    async fn increment_download_count(&self, id: &str) -> Result<(), StoreError> {
        let now = Utc::now().timestamp_micros();
        let result = sqlx::query(
            "UPDATE geometries \
             SET download_count = download_count + 1, updated_at = MAX(?1, updated_at + 1) \
             WHERE id = ?2",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_owned()));
        }
        Ok(())
    }

    async fn update_rating(&self, id: &str, rating: f64) -> Result<(), StoreError> {
        let now = Utc::now().timestamp_micros();
        let result = sqlx::query(
            "UPDATE geometries \
             SET rating = ((rating * download_count) + ?1) / (download_count + 1), \
                 updated_at = MAX(?2, updated_at + 1) \
             WHERE id = ?3",
        )
        .bind(rating)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_owned()));
        }
        Ok(())
    }

    async fn purge_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "DELETE FROM geometries WHERE status = ?1 AND created_at < ?2 RETURNING id",
        )
        .bind(RecordStatus::Pending.to_string())
        .bind(cutoff.timestamp_micros())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
