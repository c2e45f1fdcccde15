//! SQLite record store
//!
//! All record persistence goes through this module.

use axum::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use thiserror::Error;

use super::models::*;
use crate::config::DatabaseConfig;

/// Record store failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record does not satisfy the schema
    #[error("validation failed: {0}")]
    Validation(String),

    /// Connectivity or query failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Persistence for uploaded media URLs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append a record for `url`
    ///
    /// # Errors
    /// `StoreError::Validation` for an empty URL, `StoreError::Database` otherwise
    async fn save(&self, url: &str) -> Result<RecordId, StoreError>;
}

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to the database and run migrations
    ///
    /// Creates the database file (and its directory) if missing.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let filename = options.clone().get_filename();
        if let Some(parent) = filename.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            tracing::error!("Migration failed: {}", e);
            e
        })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Number of stored records
    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_records")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// All records, oldest first
    pub async fn list(&self) -> Result<Vec<MediaRecord>, StoreError> {
        let records =
            sqlx::query_as::<_, MediaRecord>("SELECT id, url FROM media_records ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(records)
    }

    /// Records pointing at `url`
    pub async fn find_by_url(&self, url: &str) -> Result<Vec<MediaRecord>, StoreError> {
        let records = sqlx::query_as::<_, MediaRecord>(
            "SELECT id, url FROM media_records WHERE url = ? ORDER BY id",
        )
        .bind(url)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[async_trait]
impl RecordStore for Database {
    async fn save(&self, url: &str) -> Result<RecordId, StoreError> {
        if url.trim().is_empty() {
            return Err(StoreError::Validation("url is required".to_string()));
        }

        let id = RecordId::new();

        sqlx::query("INSERT INTO media_records (id, url) VALUES (?, ?)")
            .bind(&id.0)
            .bind(url)
            .execute(&self.pool)
            .await?;

        tracing::debug!(record_id = %id, "Media record saved");
        Ok(id)
    }
}
