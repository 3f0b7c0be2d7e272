//! Library-relative item paths
//!
//! Items are identified by their *logical* path, which never includes the
//! `archive/` prefix:
//! - Fragments: `components/<kind-dir>/<slug>.md`
//! - Pipelines: `pipelines/<slug>.yaml`
//!
//! Pipelines refer to fragments as `../components/<kind-dir>/<slug>.md`.
//! Parsing accepts any of these spellings plus an `archive/` or `.pluqqy/`
//! prefix.

use std::fmt;

use super::kind::FragmentKind;

pub const COMPONENTS_DIR: &str = "components";
pub const PIPELINES_DIR: &str = "pipelines";
pub const ARCHIVE_DIR: &str = "archive";

/// A parsed library item path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemPath {
    Fragment { kind: FragmentKind, slug: String },
    Pipeline { slug: String },
}

/// Result of parsing a user or file supplied path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub item: ItemPath,
    /// True when the input explicitly named the archive root
    pub archived: bool,
}

impl ItemPath {
    pub fn fragment(kind: FragmentKind, slug: impl Into<String>) -> Self {
        ItemPath::Fragment {
            kind,
            slug: slug.into(),
        }
    }

    pub fn pipeline(slug: impl Into<String>) -> Self {
        ItemPath::Pipeline { slug: slug.into() }
    }

    /// Parses any accepted spelling of an item path
    pub fn parse(input: &str) -> Option<ParsedPath> {
        let mut rest = input.trim().replace('\\', "/");

        loop {
            if let Some(r) = rest.strip_prefix("./") {
                rest = r.to_string();
            } else if let Some(r) = rest.strip_prefix("../") {
                rest = r.to_string();
            } else if let Some(r) = rest.strip_prefix(".pluqqy/") {
                rest = r.to_string();
            } else {
                break;
            }
        }

        let (archived, rest) = match rest.strip_prefix("archive/") {
            Some(r) => (true, r),
            None => (false, rest.as_str()),
        };

        let parts: Vec<&str> = rest.split('/').collect();
        let item = match parts.as_slice() {
            [COMPONENTS_DIR, dir, file] => {
                let kind = FragmentKind::from_dir_name(dir)?;
                let slug = file.strip_suffix(".md")?;
                if slug.is_empty() {
                    return None;
                }
                ItemPath::fragment(kind, slug)
            }
            [PIPELINES_DIR, file] => {
                let slug = file
                    .strip_suffix(".yaml")
                    .or_else(|| file.strip_suffix(".yml"))?;
                if slug.is_empty() {
                    return None;
                }
                ItemPath::pipeline(slug)
            }
            _ => return None,
        };

        Some(ParsedPath { item, archived })
    }

    pub fn slug(&self) -> &str {
        match self {
            ItemPath::Fragment { slug, .. } | ItemPath::Pipeline { slug } => slug,
        }
    }

    pub fn kind(&self) -> Option<FragmentKind> {
        match self {
            ItemPath::Fragment { kind, .. } => Some(*kind),
            ItemPath::Pipeline { .. } => None,
        }
    }

    pub fn is_pipeline(&self) -> bool {
        matches!(self, ItemPath::Pipeline { .. })
    }

    /// Directory of this item relative to a library root
    pub fn parent_dir(&self) -> String {
        match self {
            ItemPath::Fragment { kind, .. } => format!("{}/{}", COMPONENTS_DIR, kind.dir_name()),
            ItemPath::Pipeline { .. } => PIPELINES_DIR.to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        match self {
            ItemPath::Fragment { slug, .. } => format!("{}.md", slug),
            ItemPath::Pipeline { slug } => format!("{}.yaml", slug),
        }
    }

    /// Path without the archive prefix; the item's primary key
    pub fn logical(&self) -> String {
        format!("{}/{}", self.parent_dir(), self.file_name())
    }

    /// Where the item lives relative to the library root
    pub fn location(&self, archived: bool) -> String {
        if archived {
            format!("{}/{}", ARCHIVE_DIR, self.logical())
        } else {
            self.logical()
        }
    }

    /// Lowercased logical path, for case-insensitive comparisons
    pub fn key(&self) -> String {
        self.logical().to_lowercase()
    }

    /// Pipeline-relative reference (`../components/...`)
    pub fn reference(&self) -> String {
        format!("../{}", self.logical())
    }

    /// Same item with a different slug
    pub fn with_slug(&self, slug: impl Into<String>) -> Self {
        match self {
            ItemPath::Fragment { kind, .. } => ItemPath::fragment(*kind, slug),
            ItemPath::Pipeline { .. } => ItemPath::pipeline(slug),
        }
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.logical())
    }
}

/// Lowercased logical key of any accepted path spelling
pub fn canonical_key(input: &str) -> Option<String> {
    ItemPath::parse(input).map(|p| p.item.key())
}
