//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::output::{Output, OutputFormat};
use super::{compose, fragment, library, pipeline, query};
use crate::domain::FragmentKind;
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "pluqqy")]
#[command(author, version, about = "Compose AI prompts from reusable fragments")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to `default_format` from the user config)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root containing .pluqqy/ (skips discovery)
    #[arg(long, global = true, env = "PLUQQY_ROOT")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a pluqqy library
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// List library items, optionally filtered by a query
    ///
    /// Examples:
    ///   pluqqy list
    ///   pluqqy list type:prompts tag:api
    ///   pluqqy list status:archived
    List {
        /// Query tokens (type:, status:, tag:, free text)
        query: Vec<String>,
    },

    /// Show a fragment or pipeline
    Show {
        /// Item path or bare name
        path: String,
    },

    /// Search the library
    Search {
        /// Query tokens (type:, status:, tag:, free text)
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Compose a pipeline and print it (or write it with --out)
    Compose {
        /// Pipeline path or name
        pipeline: String,

        /// Write to PATH instead of stdout; without a value, writes
        /// `<output_path>/<pipeline>.md` from settings
        #[arg(long, short, num_args = 0..=1, default_missing_value = "")]
        out: Option<String>,
    },

    /// Compose a pipeline and write it as the active artifact
    Set {
        /// Pipeline path or name
        pipeline: String,
    },

    /// Create a fragment
    New {
        /// Fragment kind (context, prompt, rules)
        kind: FragmentKind,

        /// Display name; the file name is derived from it
        name: String,

        /// Tag to attach (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Body text (`-` reads stdin)
        #[arg(long, short)]
        body: Option<String>,
    },

    /// Update a fragment's body, tags or name
    Update {
        /// Fragment path or name
        path: String,

        /// New body text (`-` reads stdin)
        #[arg(long, short)]
        body: Option<String>,

        /// Replace tags with these (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Remove all tags
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,

        /// New display name (file name unchanged)
        #[arg(long, short)]
        name: Option<String>,
    },

    /// Rename an item; pipeline references follow fragment renames
    Rename {
        /// Item path or name
        path: String,

        /// New display name
        name: String,
    },

    /// Copy an item under a new name
    Clone {
        /// Item path or name
        path: String,

        /// Name of the copy
        name: String,

        /// Place the copy in the archive
        #[arg(long)]
        archive: bool,
    },

    /// Move an item to the archive
    Archive {
        /// Item path or name
        path: String,
    },

    /// Restore an archived item
    Unarchive {
        /// Item path or name
        path: String,
    },

    /// Delete an item
    Delete {
        /// Item path or name
        path: String,
    },

    /// List tags in use
    Tags,

    /// Show which pipelines use a fragment
    Usage {
        /// Fragment path or name
        fragment: String,
    },

    /// Open a fragment in the external editor
    Edit {
        /// Fragment path or name
        path: String,
    },

    /// Show library settings
    Settings,

    /// Build and edit pipelines
    #[command(subcommand)]
    Pipeline(pipeline::PipelineCommands),

    /// Query string helpers
    #[command(subcommand)]
    Query(query::QueryCommands),
}

/// Installs the stderr tracing subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "pluqqy=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => Config::load()?.global.default_format.into(),
    };
    let output = Output::new(format, cli.verbose);
    let root = cli.root.as_deref();

    output.verbose("pluqqy starting");

    match cli.command {
        Commands::Init { path } => {
            let path = cli.root.clone().unwrap_or_else(|| PathBuf::from(&path));
            output.verbose_ctx("init", &format!("Initializing library at: {}", path.display()));
            let project = Project::init(&path)?;
            output.verbose_ctx(
                "init",
                &format!("Library directory: {}", project.library_dir().display()),
            );
            output.success(&format!(
                "Initialized pluqqy library at {}",
                project.root().display()
            ));
        }

        Commands::List { query } => library::list(&output, root, &query.join(" "))?,
        Commands::Show { path } => library::show(&output, root, &path)?,
        Commands::Search { query } => library::search(&output, root, &query.join(" "))?,
        Commands::Tags => library::tags(&output, root)?,
        Commands::Usage { fragment } => library::usage(&output, root, &fragment)?,
        Commands::Settings => library::settings(&output, root)?,

        Commands::Compose { pipeline, out } => {
            compose::compose(&output, root, &pipeline, out.as_deref())?
        }
        Commands::Set { pipeline } => compose::set(&output, root, &pipeline)?,

        Commands::New {
            kind,
            name,
            tags,
            body,
        } => fragment::create(&output, root, kind, &name, tags, body)?,
        Commands::Update {
            path,
            body,
            tags,
            clear_tags,
            name,
        } => {
            let tags = if clear_tags {
                Some(Vec::new())
            } else if tags.is_empty() {
                None
            } else {
                Some(tags)
            };
            fragment::update(&output, root, &path, body, tags, name)?
        }
        Commands::Rename { path, name } => fragment::rename(&output, root, &path, &name)?,
        Commands::Clone {
            path,
            name,
            archive,
        } => fragment::clone(&output, root, &path, &name, archive)?,
        Commands::Archive { path } => fragment::archive(&output, root, &path)?,
        Commands::Unarchive { path } => fragment::unarchive(&output, root, &path)?,
        Commands::Delete { path } => fragment::delete(&output, root, &path)?,
        Commands::Edit { path } => fragment::edit(&output, root, &path)?,

        Commands::Pipeline(cmd) => pipeline::run(cmd, &output, root)?,
        Commands::Query(cmd) => query::run(cmd, &output),
    }

    output.verbose("Command completed successfully");
    Ok(())
}
