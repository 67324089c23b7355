//! `elca validate` command - Check model files

use console::style;
use miette::Result;

use crate::cli::helpers::Workspace;
use crate::cli::output::{emit, ReportTable};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::model::{validate, IssueSeverity};

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let format = workspace.format(global);
    let model = workspace.load_model()?;
    let issues = validate(&model);

    let errors = issues
        .iter()
        .filter(|i| i.severity == IssueSeverity::Error)
        .count();
    let warnings = issues.len() - errors;

    match format {
        OutputFormat::Auto => {
            for issue in &issues {
                let marker = match issue.severity {
                    IssueSeverity::Error => style("✗").red(),
                    IssueSeverity::Warning => style("!").yellow(),
                };
                println!("{} {}: {}", marker, style(&issue.location).cyan(), issue.message);
            }

            if !global.quiet {
                if !issues.is_empty() {
                    println!();
                }
                println!(
                    "{} files, {} variants, {} error(s), {} warning(s)",
                    style(model.file_count()).cyan(),
                    style(model.variants().count()).cyan(),
                    style(errors).red(),
                    style(warnings).yellow()
                );
                if errors == 0 && (warnings == 0 || !args.strict) {
                    println!("{} Model is valid", style("✓").green().bold());
                }
            }
        }
        other => emit(other, &issues, || {
            let mut table = ReportTable::new(["severity", "location", "message"]);
            for issue in &issues {
                table.push_row([
                    issue.severity.to_string(),
                    issue.location.clone(),
                    issue.message.clone(),
                ]);
            }
            table
        })?,
    }

    if errors > 0 {
        return Err(miette::miette!("validation failed with {} error(s)", errors));
    }
    if args.strict && warnings > 0 {
        return Err(miette::miette!("validation failed with {} warning(s) in strict mode", warnings));
    }
    Ok(())
}
