//! YAML storage for pipelines
//!
//! Pipelines live in `pipelines/<slug>.yaml` (or under `archive/`). The
//! stored `order` of each component is honoured on load; the file is always
//! written with positional order `1..N`.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::atomic::write_atomic;
use super::store::{modified_at, Store};
use crate::domain::{ItemPath, Pipeline, PipelineDocument};
use crate::error::{IoContext, LibraryError, Result};

/// Parses a pipeline file's content
pub fn parse_pipeline(content: &str, slug: &str, file: &Path) -> Result<Pipeline> {
    if content.trim().is_empty() {
        return Err(LibraryError::malformed(file, "empty pipeline file"));
    }

    let doc: PipelineDocument = serde_yaml::from_str(content)
        .map_err(|e| LibraryError::malformed(file, format!("invalid pipeline: {}", e)))?;

    Ok(Pipeline::from_document(slug, doc))
}

/// Renders a pipeline to YAML
pub fn render_pipeline(pipeline: &Pipeline) -> Result<String> {
    serde_yaml::to_string(&pipeline.to_document()).map_err(|e| LibraryError::Invalid(e.to_string()))
}

impl Store {
    pub(crate) fn read_pipeline_in(&self, item: &ItemPath, archived: bool) -> Result<Pipeline> {
        let found = self.require_in(item, archived)?;
        self.read_pipeline_file(&found.item, archived, &found.file)
    }

    fn read_pipeline_file(&self, item: &ItemPath, archived: bool, file: &Path) -> Result<Pipeline> {
        let content = fs::read_to_string(file)
            .io_context(|| format!("Failed to read pipeline: {}", file.display()))?;

        let mut pipeline = parse_pipeline(&content, item.slug(), file)?;
        pipeline.is_archived = archived;
        pipeline.last_modified = modified_at(file);
        Ok(pipeline)
    }

    /// Reads a pipeline from whichever root holds it (active first)
    pub fn read_pipeline(&self, item: &ItemPath) -> Result<Pipeline> {
        let found = self.require(item)?;
        self.read_pipeline_file(&found.item, found.archived, &found.file)
    }

    /// Writes a pipeline atomically, replacing an existing file of the same
    /// name in its root (including a `.yml` spelling)
    pub fn write_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        let content = render_pipeline(pipeline)?;
        let item = pipeline.item_path();

        let path = match self.locate(&item)? {
            Some(found) if found.archived == pipeline.is_archived => found.file,
            _ => self.path_of(&pipeline.location()),
        };

        write_atomic(&path, content.as_bytes())?;
        debug!(location = %pipeline.location(), "wrote pipeline");
        Ok(())
    }
}
