//! `elca config` command - Show configuration

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::discover_project;
use crate::cli::GlobalOpts;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the merged configuration
    Show,

    /// Show paths to configuration files
    Path,
}

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show => run_show(global),
        ConfigCommands::Path => run_path(global),
    }
}

fn run_show(global: &GlobalOpts) -> Result<()> {
    // Outside a workspace only the global and environment layers apply
    let project = discover_project(global).ok();
    let config = Config::load_for(project.as_ref());

    let yaml = serde_yml::to_string(&config).into_diagnostic()?;
    if yaml.trim() == "{}" {
        if !global.quiet {
            println!("{}", style("No configuration set, using defaults").dim());
        }
    } else {
        print!("{}", yaml);
    }

    if !global.quiet {
        println!();
        println!("  auto_update:     {}", config.auto_update());
        println!("  busy_timeout_ms: {}", config.busy_timeout().as_millis());
    }
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    match Config::global_config_path() {
        Some(path) => println!("global:  {}", path.display()),
        None => println!("global:  {}", style("unavailable").dim()),
    }

    match discover_project(global) {
        Ok(project) => println!("project: {}", project.config_path().display()),
        Err(_) => println!("project: {}", style("not in a workspace").dim()),
    }
    Ok(())
}
