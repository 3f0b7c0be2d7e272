//! Markdown storage for fragments
//!
//! Fragments are stored as markdown files under `components/<kind>/`.
//! A file may open with YAML frontmatter between `---` lines carrying
//! `name` and `tags`; without it the whole file is the body and the display
//! name falls back to the filename.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::atomic::write_atomic;
use super::store::{modified_at, Store};
use crate::domain::{Fragment, FragmentFrontmatter, FragmentKind, ItemPath};
use crate::error::{IoContext, LibraryError, Result};

const DELIMITER: &str = "---";

/// Splits `content` into (frontmatter yaml, body).
///
/// Returns `Ok(None)` when the file has no frontmatter.
fn split_frontmatter(content: &str) -> std::result::Result<Option<(&str, &str)>, &'static str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let Some((first, rest)) = split_line(content) else {
        return Ok(None);
    };
    if first.trim_end() != DELIMITER {
        return Ok(None);
    }

    let mut offset = 0;
    let mut remaining = rest;
    while let Some((line, after)) = split_line(remaining) {
        let trimmed = line.trim_end();
        if trimmed == DELIMITER || trimmed == "..." {
            let yaml = &rest[..offset];
            let body = after
                .strip_prefix("\r\n")
                .or_else(|| after.strip_prefix('\n'))
                .unwrap_or(after);
            return Ok(Some((yaml, body)));
        }
        offset += remaining.len() - after.len();
        remaining = after;
    }

    Err("missing closing --- delimiter")
}

/// Returns the first line (without its newline) and the text after it.
/// `None` for empty input.
fn split_line(text: &str) -> Option<(&str, &str)> {
    if text.is_empty() {
        return None;
    }
    match text.find('\n') {
        Some(i) => Some((&text[..i], &text[i + 1..])),
        None => Some((text, "")),
    }
}

/// Parses a fragment file's content
pub fn parse_fragment(
    content: &str,
    kind: FragmentKind,
    slug: &str,
    file: &Path,
) -> Result<Fragment> {
    let (frontmatter, body) = match split_frontmatter(content)
        .map_err(|msg| LibraryError::malformed(file, msg))?
    {
        None => (FragmentFrontmatter::default(), content),
        Some((yaml, body)) if yaml.trim().is_empty() => (FragmentFrontmatter::default(), body),
        Some((yaml, body)) => {
            let fm: FragmentFrontmatter = serde_yaml::from_str(yaml)
                .map_err(|e| LibraryError::malformed(file, format!("invalid frontmatter: {}", e)))?;
            (fm, body)
        }
    };

    Ok(Fragment::new(
        kind,
        slug,
        frontmatter.name,
        frontmatter.tags,
        body,
    ))
}

/// Renders a fragment to file content
pub fn render_fragment(fragment: &Fragment) -> Result<String> {
    let frontmatter = FragmentFrontmatter::from(fragment);
    let body_looks_like_frontmatter = fragment
        .body
        .lines()
        .next()
        .is_some_and(|l| l.trim_end() == DELIMITER);

    if frontmatter.is_empty() && !body_looks_like_frontmatter {
        return Ok(fragment.body.clone());
    }

    let yaml = if frontmatter.is_empty() {
        String::new()
    } else {
        serde_yaml::to_string(&frontmatter).map_err(|e| LibraryError::Invalid(e.to_string()))?
    };

    let mut content = String::with_capacity(yaml.len() + fragment.body.len() + 10);
    content.push_str("---\n");
    content.push_str(&yaml);
    content.push_str("---\n\n");
    content.push_str(&fragment.body);
    Ok(content)
}

impl Store {
    /// Reads a fragment from a specific root
    pub(crate) fn read_fragment_in(&self, item: &ItemPath, archived: bool) -> Result<Fragment> {
        let found = self.require_in(item, archived)?;
        self.read_fragment_file(&found.item, archived, &found.file)
    }

    fn read_fragment_file(&self, item: &ItemPath, archived: bool, file: &Path) -> Result<Fragment> {
        let kind = item
            .kind()
            .ok_or_else(|| LibraryError::Invalid(format!("{} is not a fragment", item)))?;

        let content = fs::read_to_string(file)
            .io_context(|| format!("Failed to read fragment: {}", file.display()))?;

        let mut fragment = parse_fragment(&content, kind, item.slug(), file)?;
        fragment.is_archived = archived;
        fragment.last_modified = modified_at(file);
        Ok(fragment)
    }

    /// Reads a fragment from whichever root holds it (active first)
    pub fn read_fragment(&self, item: &ItemPath) -> Result<Fragment> {
        let found = self.require(item)?;
        self.read_fragment_file(&found.item, found.archived, &found.file)
    }

    /// Writes a fragment atomically to its location (`is_archived` selects
    /// the root)
    pub fn write_fragment(&self, fragment: &Fragment) -> Result<()> {
        let content = render_fragment(fragment)?;
        let path = self.path_of(&fragment.location());
        write_atomic(&path, content.as_bytes())?;
        debug!(location = %fragment.location(), "wrote fragment");
        Ok(())
    }
}
