//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate class diagrams from Python codebases
#[derive(Parser, Debug)]
#[command(name = "classmap")]
#[command(about = "Generate class diagrams from Python codebases")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a codebase and print a class diagram
    Analyze {
        /// Path to the codebase to analyze
        path: PathBuf,

        /// Diagram format (plantuml, mermaid)
        #[arg(short, long)]
        format: Option<String>,

        /// Maximum number of classes in the diagram, 0 for all
        #[arg(long, allow_negative_numbers = true)]
        max_classes: Option<i64>,

        /// Group classes into one package per module
        #[arg(long, conflicts_with = "flat")]
        group_by_module: bool,

        /// Render all classes in a single flat list
        #[arg(long)]
        flat: bool,

        /// Hide members whose name starts with an underscore
        #[arg(long)]
        public_only: bool,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Glob patterns to exclude (can be repeated)
        #[arg(long)]
        exclude: Vec<String>,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit the full JSON report instead of the diagram
        #[arg(long)]
        json: bool,

        /// Log level (trace, debug, info, warn, error, off)
        #[arg(long)]
        log_level: Option<String>,

        /// Log format (compact, pretty, json)
        #[arg(long)]
        log_format: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show version information
    Version,
}

impl Command {
    /// Grouping override from `--group-by-module` / `--flat`
    pub fn grouping(group_by_module: bool, flat: bool) -> Option<bool> {
        match (group_by_module, flat) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
