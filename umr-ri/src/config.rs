//! Configuration resolution for umr-ri
//!
//! Provides multi-tier resolution of the Gemini API key with
//! Database → ENV → TOML priority. The database tier is authoritative so a
//! key configured at runtime survives restarts without editing files.

use sqlx::SqlitePool;
use tracing::{info, warn};
use umr_common::config::TomlConfig;
use umr_common::{Error, Result};

/// Environment variable naming the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "UMR_GEMINI_API_KEY";

/// Resolve the Gemini API key from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML
pub async fn resolve_gemini_api_key(
    db: &SqlitePool,
    toml_config: &TomlConfig,
) -> Result<String> {
    let db_key = crate::db::settings::get_gemini_api_key(db).await?;
    let env_key = std::env::var(GEMINI_API_KEY_ENV).ok();
    let toml_key = toml_config.gemini_api_key.clone();

    // Warn if multiple sources (potential misconfiguration)
    let mut sources = Vec::new();
    if db_key.as_deref().is_some_and(is_valid_key) {
        sources.push("database");
    }
    if env_key.as_deref().is_some_and(is_valid_key) {
        sources.push("environment");
    }
    if toml_key.as_deref().is_some_and(is_valid_key) {
        sources.push("TOML");
    }
    if sources.len() > 1 {
        warn!(
            "Gemini API key found in multiple sources: {}. Using database (highest priority).",
            sources.join(", ")
        );
    }

    if let Some(key) = db_key.filter(|k| is_valid_key(k)) {
        info!("Gemini API key loaded from database");
        return Ok(key);
    }

    if let Some(key) = env_key.filter(|k| is_valid_key(k)) {
        info!("Gemini API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key.filter(|k| is_valid_key(k)) {
        info!("Gemini API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "Gemini API key not configured. Please configure using one of:\n\
         1. Settings table: INSERT INTO settings (key, value) VALUES ('gemini_api_key', 'your-key')\n\
         2. Environment: {}=your-key-here\n\
         3. TOML config: ~/.config/umr/config.toml (gemini_api_key = \"your-key\")",
        GEMINI_API_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
