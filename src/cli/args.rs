//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    cache::CacheCommands, completions::CompletionsArgs, compute::ComputeArgs,
    config::ConfigCommands, init::InitArgs, results::ResultsCommands, status::StatusArgs,
    update::UpdateArgs, validate::ValidateArgs,
};

#[derive(Parser)]
#[command(name = "elca")]
#[command(author, version, about = "Life cycle assessment of building models")]
#[command(long_about = "Computes LCA results of building variants described in YAML model files and keeps them in a local result cache that is updated incrementally.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Workspace root (default: auto-detect by finding .elca/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new workspace
    Init(InitArgs),

    /// Check model files for errors
    Validate(ValidateArgs),

    /// Compute variants into the result cache
    Compute(ComputeArgs),

    /// Aggregate outdated cache items
    Update(UpdateArgs),

    /// Show cached results
    #[command(subcommand)]
    Results(ResultsCommands),

    /// Show which variants are cached and up to date
    Status(StatusArgs),

    /// Result cache maintenance
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table on a terminal, tsv otherwise
    #[default]
    Auto,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// YAML format
    Yaml,
    /// Markdown tables
    Md,
}
