//! Configuration handling for Pluqqy
//!
//! Library settings live in `.pluqqy/settings.yaml` (see `settings.rs`).
//! User preferences that are not tied to a library are stored in
//! `~/.config/pluqqy/config.toml` (platform config dir).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directory holding a library inside a project
pub const LIBRARY_DIR: &str = ".pluqqy";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("No editor configured. Set $EDITOR or `editor` in {0}")]
    EditorUnset(String),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Editor command for editing fragments externally
    pub editor: Option<String>,
}

/// Combined configuration (global + located library)
#[derive(Debug, Clone)]
pub struct Config {
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration, locating the project from the current directory
    pub fn load() -> Result<Self> {
        Ok(Self {
            global: Self::load_global()?,
            project_root: Self::find_project_root(),
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        Ok(Self {
            global: Self::load_global()?,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "pluqqy", "pluqqy").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_path = match Self::global_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(GlobalConfig::default()),
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        Self::parse_global(&content).context("Failed to parse global config")
    }

    fn parse_global(content: &str) -> Result<GlobalConfig> {
        toml::from_str(content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .map_err(Into::into)
    }

    /// Finds the project root by looking for a `.pluqqy/` directory in the
    /// current directory or any parent
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(&current)
    }

    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(LIBRARY_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// The external editor command: `editor` from config, then `$EDITOR`
    pub fn editor_command(&self) -> Result<String, ConfigError> {
        self.global
            .editor
            .clone()
            .filter(|e| !e.trim().is_empty())
            .or_else(|| std::env::var("EDITOR").ok().filter(|e| !e.trim().is_empty()))
            .ok_or_else(|| {
                let location = Self::global_config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "the global config".to_string());
                ConfigError::EditorUnset(location)
            })
    }
}
