//! TOML configuration file.

use std::path::{Path, PathBuf};

use hosting_core::error::{CoreError, CoreResult};
use hosting_core::types::CoreConfig;
use serde::{Deserialize, Serialize};

/// Default database file, relative to the working directory.
pub const DEFAULT_DATABASE_PATH: &str = "hosting.db";

/// Application configuration.
///
/// ```toml
/// database_path = "/var/lib/hosting/hosting.db"
///
/// [core]
/// hard_mail_suspension = false
///
/// [core.daemon]
/// port = 9876
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub core: CoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            core: CoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`. A missing file (or no path at all) yields defaults.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ValidationError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| CoreError::ValidationError(format!("Invalid {}: {e}", path.display())))
    }

    /// Parse TOML text.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
