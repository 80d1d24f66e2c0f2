//! Database access for umr-ri

pub mod customers;
pub mod readings;
pub mod settings;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Initialize umr-ri tables
///
/// The UNIQUE constraint on (customer_guid, measure_type, month_bucket) is
/// the atomic form of the one-reading-per-customer-per-kind-per-month rule;
/// the pre-insert window check only exists to fail cheaply before the
/// recognition call.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS readings (
            guid TEXT PRIMARY KEY,
            customer_guid TEXT NOT NULL REFERENCES customers(guid),
            measure_type TEXT NOT NULL,
            measure_datetime TEXT NOT NULL,
            month_bucket TEXT NOT NULL,
            image_url TEXT NOT NULL,
            measure_value REAL NOT NULL,
            confirmed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            UNIQUE(customer_guid, measure_type, month_bucket)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Settings table for configuration persistence (API key tier 1)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (customers, readings, settings)");

    Ok(())
}
