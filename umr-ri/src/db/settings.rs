//! Settings persistence
//!
//! Key/value settings storage. The database is the authoritative tier for
//! the Gemini API key; ENV and TOML are fallbacks resolved at startup.

use sqlx::SqlitePool;
use umr_common::Result;

/// Get a setting value by key
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(value)
}

/// Set a setting value by key
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Get Gemini API key from database
pub async fn get_gemini_api_key(pool: &SqlitePool) -> Result<Option<String>> {
    get_setting(pool, "gemini_api_key").await
}

/// Set Gemini API key in database
pub async fn set_gemini_api_key(pool: &SqlitePool, key: &str) -> Result<()> {
    set_setting(pool, "gemini_api_key", key).await
}
