//! Pluqqy - compose AI prompts from a library of reusable fragments
//!
//! A library lives in `.pluqqy/` and holds markdown fragments (contexts,
//! prompts, rules) plus YAML pipelines that reference them. Composing a
//! pipeline produces a single markdown artifact with one section per
//! fragment kind.

pub mod domain;
pub mod error;
pub mod storage;
pub mod index;
pub mod service;
pub mod cli;

pub use domain::{Fragment, FragmentKind, ItemPath, Pipeline, PipelineEditor, Settings};
pub use error::{ErrorKind, LibraryError, Result};
pub use service::LibraryService;
