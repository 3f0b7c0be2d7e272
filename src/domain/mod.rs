//! Domain models for Pluqqy
//!
//! Contains the library model and the algorithms over it (composition,
//! query parsing, pipeline editing) without any I/O concerns.

mod kind;
mod slug;
mod tokens;
mod path;
mod fragment;
mod pipeline;
mod settings;
mod query;
mod compose;
mod editor;

pub use kind::FragmentKind;
pub use slug::{sanitize_slug, validate_name, UNTITLED};
pub use tokens::{estimate_tokens, TokenBucket, GOOD_LIMIT, WARNING_LIMIT};
pub use path::{canonical_key, ItemPath, ParsedPath, ARCHIVE_DIR, COMPONENTS_DIR, PIPELINES_DIR};
pub use fragment::{normalize_tags, Fragment, FragmentFrontmatter};
pub use pipeline::{ComponentRef, Pipeline, PipelineDocument};
pub use settings::{Formatting, Section, Settings};
pub use query::{cycle_type, toggle_archived, CycleDomain, Filter, ItemType, StatusFilter};
pub use compose::{compose, FragmentSource};
pub use editor::{PipelineEditor, Toggle};
