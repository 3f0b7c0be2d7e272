//! Pipeline domain model
//!
//! A pipeline is an ordered list of references to fragments plus metadata.
//! On disk it is a YAML document (`pipelines/<slug>.yaml`); component
//! `order` values are authoritative when loading and renumbered `1..N` when
//! saving.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fragment::normalize_tags;
use super::kind::FragmentKind;
use super::path::ItemPath;

/// A reference from a pipeline to a fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    #[serde(rename = "type")]
    pub kind: FragmentKind,

    /// Pipeline-relative path (`../components/<kind>/<slug>.md`)
    pub path: String,

    /// 1-based position within the pipeline
    #[serde(default)]
    pub order: u32,
}

impl ComponentRef {
    pub fn new(item: &ItemPath) -> Option<Self> {
        Some(Self {
            kind: item.kind()?,
            path: item.reference(),
            order: 0,
        })
    }

    /// The fragment this reference points at, if the path is well formed
    pub fn target(&self) -> Option<ItemPath> {
        ItemPath::parse(&self.path)
            .map(|p| p.item)
            .filter(|item| !item.is_pipeline())
    }

    /// Case-insensitive identity of the referenced fragment
    pub fn key(&self) -> String {
        self.target()
            .map(|item| item.key())
            .unwrap_or_else(|| self.path.to_lowercase())
    }
}

/// On-disk pipeline document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDocument {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    #[serde(default)]
    pub components: Vec<ComponentRef>,
}

/// A pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Logical library-relative path (`pipelines/<slug>.yaml`)
    pub path: String,

    pub slug: String,

    pub name: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    #[serde(default)]
    pub components: Vec<ComponentRef>,

    #[serde(default)]
    pub is_archived: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl Pipeline {
    /// Creates an empty pipeline stored under `slug`
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            path: ItemPath::pipeline(slug.clone()).logical(),
            name: name.into(),
            slug,
            tags: Vec::new(),
            output_path: None,
            components: Vec::new(),
            is_archived: false,
            last_modified: None,
        }
    }

    /// Builds a pipeline from its file contents.
    ///
    /// Components are sorted by their stored `order` (stable for ties) and
    /// renumbered densely. A reference's kind follows its directory.
    pub fn from_document(slug: impl Into<String>, doc: PipelineDocument) -> Self {
        let slug = slug.into();
        let name = if doc.name.trim().is_empty() {
            slug.clone()
        } else {
            doc.name
        };

        let mut pipeline = Pipeline::new(slug, name);
        pipeline.tags = normalize_tags(doc.tags);
        pipeline.output_path = doc.output_path.filter(|p| !p.trim().is_empty());

        let mut components = doc.components;
        components.sort_by_key(|c| c.order);
        for component in &mut components {
            if let Some(kind) = component.target().and_then(|t| t.kind()) {
                component.kind = kind;
            }
        }
        pipeline.components = components;
        pipeline.renumber();
        pipeline
    }

    /// Produces the on-disk document with positional order
    pub fn to_document(&self) -> PipelineDocument {
        let mut components = self.components.clone();
        for (i, c) in components.iter_mut().enumerate() {
            c.order = (i + 1) as u32;
        }

        PipelineDocument {
            name: self.name.clone(),
            tags: self.tags.clone(),
            output_path: self.output_path.clone(),
            components,
        }
    }

    pub fn item_path(&self) -> ItemPath {
        ItemPath::pipeline(self.slug.clone())
    }

    pub fn location(&self) -> String {
        self.item_path().location(self.is_archived)
    }

    /// Reassigns `order` as `1..N` by position
    pub fn renumber(&mut self) {
        for (i, c) in self.components.iter_mut().enumerate() {
            c.order = (i + 1) as u32;
        }
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = normalize_tags(tags);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| *t == tag)
    }

    /// True when any component references the fragment with this key
    pub fn references(&self, key: &str) -> bool {
        self.components.iter().any(|c| c.key() == key)
    }
}
