//! Configuration loading and root folder resolution
//!
//! Each UMR service keeps its working data (database, staged images) under a
//! single root folder, resolved in priority order:
//! 1. Environment variable (`UMR_ROOT_FOLDER`)
//! 2. TOML config file (`~/.config/umr/config.toml`)
//! 3. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "UMR_ROOT_FOLDER";

/// TOML configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder override
    pub root_folder: Option<String>,
    /// Gemini API key (lowest-priority tier; database and ENV win)
    pub gemini_api_key: Option<String>,
}

/// Locate the platform config file, if present
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("umr").join("config.toml"));
    if let Some(path) = &user_config {
        if path.exists() {
            return user_config;
        }
    }
    // System-wide fallback on Unix-likes
    let system_config = PathBuf::from("/etc/umr/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }
    None
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read config failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse config failed ({}): {}", path.display(), e)))
}

/// Load the config file from the default location, or defaults if absent
pub fn load_default_config() -> TomlConfig {
    match default_config_path() {
        Some(path) => match load_toml_config(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring unreadable config file: {}", e);
                TomlConfig::default()
            }
        },
        None => TomlConfig::default(),
    }
}

/// Resolve the root folder following the ENV → TOML → default priority order
pub fn resolve_root_folder(config: &TomlConfig) -> PathBuf {
    // Priority 1: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 2: TOML config file
    if let Some(path) = &config.root_folder {
        return PathBuf::from(path);
    }

    // Priority 3: OS-dependent compiled default
    dirs::data_local_dir()
        .map(|d| d.join("umr"))
        .unwrap_or_else(|| PathBuf::from("./umr_data"))
}

/// Root folder handle: knows where the database and staging area live and can
/// create the directory layout on first start
#[derive(Debug, Clone)]
pub struct RootFolder {
    path: PathBuf,
}

impl RootFolder {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the root folder and staging subdirectory if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.path)?;
        std::fs::create_dir_all(self.staging_dir())?;
        Ok(())
    }

    /// Service database file
    pub fn database_path(&self) -> PathBuf {
        self.path.join("umr.db")
    }

    /// Scratch directory for images staged during ingestion
    pub fn staging_dir(&self) -> PathBuf {
        self.path.join("staging")
    }
}
