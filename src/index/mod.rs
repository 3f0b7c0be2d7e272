//! # Derived Indices
//!
//! Read-only views computed from a library scan. They are rebuilt whenever
//! the library changes and never written to disk (except the tag registry,
//! which [`tags`] keeps in step).
//!
//! - [`UsageIndex`] - Which pipelines reference each fragment
//! - [`TagIndex`] - Tags carried by active items
//! - [`SearchIndex`] - Query evaluation over the scan

mod search;
mod tags;
mod usage;

pub use search::{SearchIndex, SearchResults};
pub use tags::{cleanup_orphans, register_tags, TagIndex};
pub use usage::{PipelineSummary, UsageIndex};
