//! CLI module - argument parsing and command dispatch

pub mod args;
pub mod commands;
pub mod helpers;
pub mod output;

pub use args::{Cli, Commands, GlobalOpts, OutputFormat};

use miette::Result;

/// Run a parsed command line
pub fn dispatch(cli: Cli) -> Result<()> {
    let global = cli.global;

    match cli.command {
        Commands::Init(args) => commands::init::run(args, &global),
        Commands::Validate(args) => commands::validate::run(args, &global),
        Commands::Compute(args) => commands::compute::run(args, &global),
        Commands::Update(args) => commands::update::run(args, &global),
        Commands::Results(cmd) => commands::results::run(cmd, &global),
        Commands::Status(args) => commands::status::run(args, &global),
        Commands::Cache(cmd) => commands::cache::run(cmd, &global),
        Commands::Config(cmd) => commands::config::run(cmd, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
