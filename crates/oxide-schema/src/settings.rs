//! Persistent user settings.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use oxide_schema_core::csv::CsvOptions;

use crate::database::DatabaseOptions;
use crate::error::Result;

/// Settings remembered between runs, stored as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Enforce foreign keys on opened databases.
    pub foreign_keys: bool,
    /// Format used for the last export.
    pub export_csv: CsvOptions,
    /// Format used for the last import.
    pub import_csv: CsvOptions,
}

impl Settings {
    /// Loads settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes settings to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Settings saved");
        Ok(())
    }

    /// Returns the options for opening a database.
    #[must_use]
    pub fn database_options(&self) -> DatabaseOptions {
        DatabaseOptions::default().foreign_keys(self.foreign_keys)
    }
}
