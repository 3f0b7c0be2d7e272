//! Fragment domain model
//!
//! Fragments are the reusable text units of the library: contexts, prompts
//! and rules. They are stored as markdown files with optional YAML
//! frontmatter carrying a display name and tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::FragmentKind;
use super::path::ItemPath;
use super::tokens::estimate_tokens;

/// A library fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Logical library-relative path (`components/<kind>/<slug>.md`)
    pub path: String,

    pub kind: FragmentKind,

    /// Filename stem
    pub slug: String,

    /// Frontmatter `name`, else the filename stem
    pub display_name: String,

    /// Normalized (lowercase, deduplicated) tags
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub body: String,

    #[serde(default)]
    pub is_archived: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,

    #[serde(default)]
    pub token_count: usize,

    /// Filled in from the usage index; zero when read straight from disk
    #[serde(default)]
    pub usage_count: usize,
}

impl Fragment {
    /// Builds a fragment for `kind`/`slug`, deriving the display name and
    /// token estimate.
    pub fn new(
        kind: FragmentKind,
        slug: impl Into<String>,
        name: Option<String>,
        tags: Vec<String>,
        body: impl Into<String>,
    ) -> Self {
        let slug = slug.into();
        let body = body.into();
        let item = ItemPath::fragment(kind, slug.clone());
        let display_name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| slug.clone());

        Self {
            path: item.logical(),
            kind,
            token_count: estimate_tokens(&body),
            slug,
            display_name,
            tags: normalize_tags(tags),
            body,
            is_archived: false,
            last_modified: None,
            usage_count: 0,
        }
    }

    pub fn item_path(&self) -> ItemPath {
        ItemPath::fragment(self.kind, self.slug.clone())
    }

    /// Where the file lives relative to the library root
    pub fn location(&self) -> String {
        self.item_path().location(self.is_archived)
    }

    /// Replaces the body and refreshes the token estimate
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
        self.token_count = estimate_tokens(&self.body);
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = normalize_tags(tags);
    }

    /// True when the display name only repeats the filename
    pub fn has_default_name(&self) -> bool {
        self.display_name == self.slug
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| *t == tag)
    }
}

/// YAML frontmatter of a fragment file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentFrontmatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl FragmentFrontmatter {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.tags.is_empty()
    }
}

impl From<&Fragment> for FragmentFrontmatter {
    fn from(fragment: &Fragment) -> Self {
        Self {
            name: (!fragment.has_default_name()).then(|| fragment.display_name.clone()),
            tags: fragment.tags.clone(),
        }
    }
}

/// Lowercases, trims and deduplicates tags, keeping first-seen order
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
