//! Settings file (`settings.yaml`)
//!
//! Created with defaults the first time it is read.

use std::fs;

use tracing::{debug, warn};

use super::atomic::write_atomic;
use super::store::Store;
use crate::domain::Settings;
use crate::error::{IoContext, LibraryError, Result};

pub const SETTINGS_FILE: &str = "settings.yaml";

impl Store {
    /// Reads settings, writing the defaults first if the file is missing
    pub fn read_settings(&self) -> Result<Settings> {
        let path = self.path_of(SETTINGS_FILE);

        if !path.exists() {
            let settings = Settings::default();
            self.write_settings(&settings)?;
            debug!(path = %path.display(), "created default settings");
            return Ok(settings);
        }

        let content = fs::read_to_string(&path)
            .io_context(|| format!("Failed to read settings: {}", path.display()))?;

        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        let settings: Settings = serde_yaml::from_str(&content)
            .map_err(|e| LibraryError::malformed(&path, format!("invalid settings: {}", e)))?;

        let missing = settings.missing_kinds();
        if !missing.is_empty() {
            warn!(?missing, "settings sections omit some kinds; using default headings for them");
        }

        Ok(settings)
    }

    /// Validates and writes settings
    pub fn write_settings(&self, settings: &Settings) -> Result<()> {
        settings.validate()?;
        let yaml =
            serde_yaml::to_string(settings).map_err(|e| LibraryError::Invalid(e.to_string()))?;
        write_atomic(&self.path_of(SETTINGS_FILE), yaml.as_bytes())
    }
}
