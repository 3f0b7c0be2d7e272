//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Library setup and browsing | `init`, `list`, `show`, `search`, `tags` |
//! | Items | Fragment and pipeline lifecycle | `new`, `rename`, `archive`, `delete` |
//! | Pipeline | Building pipelines | `pipeline new`, `pipeline toggle` |
//! | Compose | Producing the artifact | `compose`, `set` |
//! | Query | Query string helpers | `query cycle-type` |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output and `debug` level logs:
//! ```bash
//! pluqqy --verbose list
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod library;
mod fragment;
mod compose;
mod pipeline;
mod query;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
