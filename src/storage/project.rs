//! Project management
//!
//! A project is any directory containing a `.pluqqy/` library. This module
//! initializes the library layout and hands out the store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::LIBRARY_DIR;
use super::{Config, Store};
use crate::domain::{FragmentKind, ARCHIVE_DIR, COMPONENTS_DIR, PIPELINES_DIR};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a pluqqy project. Run 'pluqqy init' first.")]
    NotInProject,

    #[error("No pluqqy library at {0}")]
    NoLibrary(PathBuf),
}

/// A Pluqqy project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let library_dir = root.join(LIBRARY_DIR);

        if !library_dir.is_dir() {
            return Err(ProjectError::NoLibrary(root).into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Opens `root` when given, otherwise discovers the current project
    pub fn discover(root: Option<&Path>) -> Result<Self> {
        match root {
            Some(root) => Self::open(root),
            None => Self::open_current(),
        }
    }

    /// Initializes a new project at the given path. Idempotent.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let library_dir = root.join(LIBRARY_DIR);

        let mut dirs: Vec<PathBuf> = FragmentKind::all()
            .iter()
            .map(|k| library_dir.join(COMPONENTS_DIR).join(k.dir_name()))
            .collect();
        dirs.push(library_dir.join(PIPELINES_DIR));
        dirs.push(library_dir.join(ARCHIVE_DIR));

        for dir in &dirs {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        // Creates settings.yaml with defaults when missing
        Store::new(&library_dir)
            .read_settings()
            .context("Failed to initialize settings")?;

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the `.pluqqy` directory path
    pub fn library_dir(&self) -> PathBuf {
        self.root.join(LIBRARY_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the library store
    pub fn store(&self) -> Store {
        Store::new(self.library_dir())
    }
}
