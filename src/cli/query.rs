//! Query string helpers
//!
//! The single-key affordances of the library browser, exposed so scripts and
//! editor integrations can drive the same query language.

use clap::Subcommand;

use super::output::Output;
use crate::domain::{cycle_type, toggle_archived, CycleDomain, Filter};

#[derive(Subcommand)]
pub enum QueryCommands {
    /// Add or remove `status:archived`
    ToggleArchived {
        /// Current query tokens
        query: Vec<String>,
    },

    /// Advance the `type:` filter to the next item type
    CycleType {
        /// Current query tokens
        query: Vec<String>,

        /// Cycle through component types only (skip pipelines)
        #[arg(long)]
        components: bool,
    },

    /// Show how a query is interpreted
    Parse {
        /// Query tokens
        query: Vec<String>,
    },
}

pub fn run(cmd: QueryCommands, output: &Output) {
    match cmd {
        QueryCommands::ToggleArchived { query } => {
            print_query(output, &toggle_archived(&query.join(" ")))
        }
        QueryCommands::CycleType { query, components } => {
            let domain = if components {
                CycleDomain::Components
            } else {
                CycleDomain::All
            };
            print_query(output, &cycle_type(&query.join(" "), domain))
        }
        QueryCommands::Parse { query } => {
            let filter = Filter::parse(&query.join(" "));
            if output.is_json() {
                output.data(&filter);
            } else {
                print_filter(&filter);
            }
        }
    }
}

fn print_query(output: &Output, query: &str) {
    if output.is_json() {
        output.data(&serde_json::json!({ "query": query }));
    } else {
        println!("{}", query);
    }
}

fn print_filter(filter: &Filter) {
    let types: Vec<&str> = filter.types.iter().map(|t| t.as_str()).collect();
    let tags: Vec<&str> = filter.tags.iter().map(String::as_str).collect();

    println!("types:  {}", if types.is_empty() { "(all)".to_string() } else { types.join(", ") });
    println!("status: {:?}", filter.status);
    println!("tags:   {}", tags.join(", "));
    println!("terms:  {}", filter.terms.join(", "));
}
