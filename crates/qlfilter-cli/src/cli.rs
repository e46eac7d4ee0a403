use clap::{Parser, Subcommand};
use std::path::PathBuf;

///
/// Cli
///

#[derive(Debug, Parser)]
#[command(
    name = "qlfilter",
    version,
    about = "Inspect, compile and evaluate qlfilter expressions"
)]
pub struct Cli {
    /// Schema and options configuration (TOML).
    #[arg(short, long, env = "QLFILTER_CONFIG", value_name = "FILE")]
    pub config: PathBuf,

    /// Log compiler decisions at debug level (overridden by QLFILTER_LOG / RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

///
/// Command
///

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the selectors accepted for an entity kind, or for every kind.
    Fields {
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Parse a filter and print the tree after virtual property expansion.
    Parse { filter: String },

    /// Compile a filter and print its joins and predicate.
    Compile {
        #[arg(short, long)]
        kind: String,
        filter: String,
    },

    /// Render a filter as a JPQL query.
    Jpql {
        #[arg(short, long)]
        kind: String,
        filter: String,

        /// Print query text and parameters as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a filter against entities from a JSON array file.
    Match {
        #[arg(short, long)]
        kind: String,
        filter: String,

        #[arg(short, long, value_name = "FILE")]
        entities: PathBuf,

        /// Evaluate the tree directly instead of the compiled predicate.
        #[arg(long)]
        direct: bool,
    },
}
