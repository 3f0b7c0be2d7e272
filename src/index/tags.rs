//! Tag index and registry maintenance
//!
//! [`TagIndex`] is derived from the library: the tags carried by
//! non-archived fragments and pipelines. The registry in `tags.yaml` is kept
//! in step with it by [`register_tags`] on ingest and [`cleanup_orphans`]
//! after items leave the active library.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{Fragment, Pipeline};
use crate::error::Result;
use crate::storage::{Store, TagEntry};

#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    counts: BTreeMap<String, usize>,
}

impl TagIndex {
    pub fn build<'a>(
        fragments: impl IntoIterator<Item = &'a Fragment>,
        pipelines: impl IntoIterator<Item = &'a Pipeline>,
    ) -> Self {
        let mut counts = BTreeMap::new();

        let fragment_tags = fragments
            .into_iter()
            .filter(|f| !f.is_archived)
            .map(|f| &f.tags);
        let pipeline_tags = pipelines
            .into_iter()
            .filter(|p| !p.is_archived)
            .map(|p| &p.tags);

        for tags in fragment_tags.chain(pipeline_tags) {
            for tag in tags {
                *counts.entry(tag.to_lowercase()).or_insert(0) += 1;
            }
        }

        Self { counts }
    }

    /// Every tag in use, sorted
    pub fn all_tags(&self) -> Vec<String> {
        self.counts.keys().cloned().collect()
    }

    /// Tags with the number of active items carrying each
    pub fn counts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(t, n)| (t.as_str(), *n))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.counts.contains_key(&tag.to_lowercase())
    }
}

/// Adds unknown tags to the registry. Returns the tags that were added.
pub fn register_tags(store: &Store, tags: &[String]) -> Result<Vec<String>> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }

    let mut registry = store.read_tag_registry()?;
    let mut added = Vec::new();

    for tag in tags {
        let tag = tag.to_lowercase();
        if !registry.iter().any(|e| e.name.eq_ignore_ascii_case(&tag)) {
            registry.push(TagEntry::new(tag.clone()));
            added.push(tag);
        }
    }

    if !added.is_empty() {
        store.write_tag_registry(&registry)?;
        debug!(?added, "registered tags");
    }
    Ok(added)
}

/// Removes each candidate tag that no active item carries any more.
/// Returns the removed tags.
pub fn cleanup_orphans(store: &Store, candidates: &[String], index: &TagIndex) -> Result<Vec<String>> {
    let orphans: Vec<String> = candidates
        .iter()
        .map(|t| t.to_lowercase())
        .filter(|t| !index.contains(t))
        .collect();
    if orphans.is_empty() {
        return Ok(Vec::new());
    }

    let mut registry = store.read_tag_registry()?;
    let before = registry.len();
    registry.retain(|e| !orphans.iter().any(|o| e.name.eq_ignore_ascii_case(o)));

    if registry.len() == before {
        return Ok(Vec::new());
    }

    store.write_tag_registry(&registry)?;
    debug!(removed = ?orphans, "cleaned up orphan tags");
    Ok(orphans)
}
