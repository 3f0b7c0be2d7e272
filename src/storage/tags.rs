//! Tag registry file (`tags.yaml`)
//!
//! Keeps the set of known tags with optional display colors, independent
//! of which items currently carry them.

use std::fs;

use serde::{Deserialize, Serialize};

use super::atomic::write_atomic;
use super::store::Store;
use crate::error::{IoContext, LibraryError, Result};

pub const TAGS_FILE: &str = "tags.yaml";

/// A registered tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl TagEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TagRegistryDocument {
    #[serde(default)]
    tags: Vec<TagEntry>,
}

impl Store {
    /// Reads the registry; a missing file is an empty registry
    pub fn read_tag_registry(&self) -> Result<Vec<TagEntry>> {
        let path = self.path_of(TAGS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .io_context(|| format!("Failed to read tag registry: {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let doc: TagRegistryDocument = serde_yaml::from_str(&content)
            .map_err(|e| LibraryError::malformed(&path, format!("invalid tag registry: {}", e)))?;
        Ok(doc.tags)
    }

    pub fn write_tag_registry(&self, tags: &[TagEntry]) -> Result<()> {
        let doc = TagRegistryDocument {
            tags: tags.to_vec(),
        };
        let yaml = serde_yaml::to_string(&doc).map_err(|e| LibraryError::Invalid(e.to_string()))?;
        write_atomic(&self.path_of(TAGS_FILE), yaml.as_bytes())
    }
}
