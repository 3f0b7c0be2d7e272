//! Slug sanitization
//!
//! Display names supplied by the user are turned into filename-safe slugs.
//! `sanitize_slug` is total and idempotent; `validate_name` is the stricter
//! gate used when a name is about to become a file.

use crate::error::{LibraryError, Result};

/// Slug used when a name sanitizes to nothing
pub const UNTITLED: &str = "untitled";

/// Lowercases, replaces runs of characters outside `[a-z0-9-]` with `-`,
/// trims and collapses dashes. Never returns an empty string.
pub fn sanitize_slug(name: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        UNTITLED.to_string()
    } else {
        slug
    }
}

/// Validates a user-facing name and returns its slug.
///
/// Rejects names that sanitize to nothing and names carrying a `.md` suffix
/// (users type names, not filenames).
pub fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.to_lowercase().ends_with(".md") {
        return Err(LibraryError::Invalid(format!(
            "'{}' must not include the .md extension",
            trimmed
        )));
    }

    let slug = slugify(trimmed);
    if slug.is_empty() {
        return Err(LibraryError::Invalid(format!(
            "'{}' has no usable characters",
            trimmed
        )));
    }

    Ok(slug)
}

fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            // '-' and anything unsupported both collapse into one separator
            pending_dash = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn basic_sanitization() {
        assert_eq!(sanitize_slug("My Prompt"), "my-prompt");
        assert_eq!(sanitize_slug("  API -- Rules!! "), "api-rules");
        assert_eq!(sanitize_slug("already-a-slug"), "already-a-slug");
        assert_eq!(sanitize_slug("Ünïcode Name"), "n-code-name");
    }

    #[test]
    fn empty_becomes_untitled() {
        assert_eq!(sanitize_slug(""), "untitled");
        assert_eq!(sanitize_slug("---"), "untitled");
        assert_eq!(sanitize_slug("!!!"), "untitled");
    }

    #[test]
    fn validate_rejects_md_suffix() {
        let err = validate_name("notes.md").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Invalid);
    }

    #[test]
    fn validate_rejects_unusable_names() {
        assert!(validate_name("   ").is_err());
        assert!(validate_name("???").is_err());
        assert_eq!(validate_name("Code Review").unwrap(), "code-review");
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(name in ".*") {
            let once = sanitize_slug(&name);
            prop_assert_eq!(sanitize_slug(&once), once.clone());
        }

        #[test]
        fn sanitize_output_is_filename_safe(name in ".*") {
            let slug = sanitize_slug(&name);
            prop_assert!(!slug.is_empty());
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }
    }
}
