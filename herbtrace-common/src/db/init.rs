//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and brings the schema up
//! to date. Safe to call on every startup: all DDL is idempotent.

use crate::config::DatabaseConfig;
use crate::text::fold_case;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 2;

/// Case-folded copies of the text columns matched by list filters
pub const FOLDED_COLUMNS: &[&str] = &["farmer_name_folded", "herb_name_folded", "geo_state_folded"];

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path, config: &DatabaseConfig) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL allows concurrent readers alongside the single writer
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_collection_events_table(pool).await?;
    add_folded_columns(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the collection_events table
///
/// `batch_id` carries the UNIQUE constraint that arbitrates id collisions
/// between concurrent writers.
async fn create_collection_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collection_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL UNIQUE,
            farmer_name TEXT NOT NULL,
            herb_name TEXT NOT NULL,
            quantity REAL NOT NULL CHECK (quantity > 0),
            latitude REAL NOT NULL CHECK (latitude BETWEEN -90 AND 90),
            longitude REAL NOT NULL CHECK (longitude BETWEEN -180 AND 180),
            image_url TEXT NOT NULL,
            timestamp_ms INTEGER NOT NULL,
            ai_confidence INTEGER NOT NULL CHECK (ai_confidence BETWEEN 0 AND 100),
            ai_verified_herb TEXT NOT NULL,
            geo_country TEXT NOT NULL,
            geo_state TEXT NOT NULL,
            geo_within_india INTEGER NOT NULL DEFAULT 0,
            farmer_name_folded TEXT NOT NULL DEFAULT '',
            herb_name_folded TEXT NOT NULL DEFAULT '',
            geo_state_folded TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    for ddl in [
        "CREATE INDEX IF NOT EXISTS idx_collection_events_farmer ON collection_events(farmer_name)",
        "CREATE INDEX IF NOT EXISTS idx_collection_events_herb ON collection_events(herb_name)",
        "CREATE INDEX IF NOT EXISTS idx_collection_events_timestamp ON collection_events(timestamp_ms DESC)",
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }

    Ok(())
}

/// Bring version 1 tables up to date: add the folded columns and fill them
async fn add_folded_columns(pool: &SqlitePool) -> Result<()> {
    let existing: Vec<String> =
        sqlx::query_scalar("SELECT name FROM pragma_table_info('collection_events')")
            .fetch_all(pool)
            .await?;

    let mut added = false;
    for folded in FOLDED_COLUMNS {
        if !existing.iter().any(|c| c == *folded) {
            sqlx::query(&format!(
                "ALTER TABLE collection_events ADD COLUMN {} TEXT NOT NULL DEFAULT ''",
                folded
            ))
            .execute(pool)
            .await?;
            added = true;
        }
    }
    if !added {
        return Ok(());
    }

    let rows: Vec<(i64, String, String, String)> =
        sqlx::query_as("SELECT id, farmer_name, herb_name, geo_state FROM collection_events")
            .fetch_all(pool)
            .await?;

    let mut tx = pool.begin().await?;
    for (id, farmer_name, herb_name, geo_state) in &rows {
        sqlx::query(
            "UPDATE collection_events
             SET farmer_name_folded = ?, herb_name_folded = ?, geo_state_folded = ?
             WHERE id = ?",
        )
        .bind(fold_case(farmer_name))
        .bind(fold_case(herb_name))
        .bind(fold_case(geo_state))
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(rows = rows.len(), "Backfilled case-folded filter columns");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_creation_when_missing() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("herbtrace.db");

        let pool = init_database(&db_path, &DatabaseConfig::default())
            .await
            .expect("Database initialization failed");

        assert!(db_path.exists(), "Database file was not created");
        pool.close().await;
    }

    #[tokio::test]
    async fn test_database_opens_existing() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("herbtrace.db");

        let pool1 = init_database(&db_path, &DatabaseConfig::default()).await.unwrap();
        pool1.close().await;

        let pool2 = init_database(&db_path, &DatabaseConfig::default()).await;
        assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
    }

    #[tokio::test]
    async fn test_batch_id_unique_constraint() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db"), &DatabaseConfig::default())
            .await
            .unwrap();

        let insert = "INSERT INTO collection_events (
                batch_id, farmer_name, herb_name, quantity, latitude, longitude, image_url,
                timestamp_ms, ai_confidence, ai_verified_herb, geo_country, geo_state, geo_within_india
            ) VALUES ('BATCH-1', 'a', 'b', 1.0, 19.0, 75.0, 'u', 1, 95, 'b', 'India', 'Maharashtra', 1)";

        sqlx::query(insert).execute(&pool).await.unwrap();
        let err: crate::Error = sqlx::query(insert).execute(&pool).await.unwrap_err().into();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_version_one_table_gains_folded_columns() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("herbtrace.db");
        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new().filename(&db_path).create_if_missing(true),
        )
        .await
        .unwrap();

        sqlx::query(
            "CREATE TABLE collection_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batch_id TEXT NOT NULL UNIQUE,
                farmer_name TEXT NOT NULL,
                herb_name TEXT NOT NULL,
                quantity REAL NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                image_url TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                ai_confidence INTEGER NOT NULL,
                ai_verified_herb TEXT NOT NULL,
                geo_country TEXT NOT NULL,
                geo_state TEXT NOT NULL,
                geo_within_india INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO collection_events (
                batch_id, farmer_name, herb_name, quantity, latitude, longitude, image_url,
                timestamp_ms, ai_confidence, ai_verified_herb, geo_country, geo_state, geo_within_india
            ) VALUES ('BATCH-1', 'ÉMILE', 'Tulsi', 1.0, 19.0, 75.0, 'u', 1, 95, 'Tulsi', 'India', 'Maharashtra', 1)",
        )
        .execute(&pool)
        .await
        .unwrap();

        create_schema(&pool).await.unwrap();
        // Second run finds the columns and leaves data alone
        create_schema(&pool).await.unwrap();

        let folded: (String, String, String) = sqlx::query_as(
            "SELECT farmer_name_folded, herb_name_folded, geo_state_folded
             FROM collection_events WHERE batch_id = 'BATCH-1'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(
            folded,
            ("émile".to_string(), "tulsi".to_string(), "maharashtra".to_string())
        );
    }

    #[tokio::test]
    async fn test_schema_version_recorded_once() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("herbtrace.db");
        let pool = init_database(&db_path, &DatabaseConfig::default()).await.unwrap();
        create_schema(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
