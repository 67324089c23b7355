//! `elca init` command - Initialize a new workspace

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::core::example::write_example;
use crate::core::project::{Project, ProjectError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Force initialization even if .elca/ already exists
    #[arg(long)]
    pub force: bool,

    /// Add an example library and variant
    #[arg(long)]
    pub example: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    let project = match project {
        Ok(project) => project,
        Err(ProjectError::AlreadyExists(root)) => {
            return Err(miette::miette!(
                help = "use 'elca init --force' to reinitialize",
                "workspace already exists at {}",
                root.display()
            ));
        }
        Err(e) => return Err(miette::miette!("{}", e)),
    };

    if !global.quiet {
        println!(
            "{} Initialized workspace at {}",
            style("✓").green(),
            style(project.root().display()).cyan()
        );
    }

    if args.example {
        let written = write_example(&project)?;
        if !global.quiet {
            for file in &written {
                println!("  {} {}", style("+").green(), file.display());
            }
        }
    }

    if !global.quiet {
        println!();
        println!("Next steps:");
        println!("  {} Check the model files", style("elca validate").yellow());
        println!("  {} Compute all variants", style("elca compute").yellow());
        println!("  {} Show variant totals", style("elca results total").yellow());
    }

    Ok(())
}
