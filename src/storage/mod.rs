//! # Storage Layer
//!
//! Persistence for the library with git-friendly file formats.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Fragments | Markdown + optional YAML frontmatter | `.pluqqy/components/<kind>/<slug>.md` |
//! | Pipelines | YAML | `.pluqqy/pipelines/<slug>.yaml` |
//! | Archived items | Same formats | `.pluqqy/archive/...` |
//! | Settings | YAML | `.pluqqy/settings.yaml` |
//! | Tag registry | YAML | `.pluqqy/tags.yaml` |
//! | User config | TOML | `<config dir>/pluqqy/config.toml` |
//!
//! ## Write Safety
//!
//! All writes are atomic (temp file + rename). Archiving moves files between
//! roots without rewriting them.
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for a directory containing `.pluqqy/`
//! - [`Store`] - Reads and writes library items
//! - [`Config`] - User configuration

mod atomic;
mod store;
mod markdown;
mod pipelines;
mod settings;
mod tags;
mod config;
mod project;

pub use atomic::write_atomic;
pub use store::{Located, LoadIssue, Scan, Store};
pub use markdown::{parse_fragment, render_fragment};
pub use pipelines::{parse_pipeline, render_pipeline};
pub use settings::SETTINGS_FILE;
pub use tags::{TagEntry, TAGS_FILE};
pub use config::{Config, ConfigError, OutputFormat, LIBRARY_DIR};
pub use project::{Project, ProjectError};
