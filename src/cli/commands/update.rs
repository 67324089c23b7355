//! `elca update` command - Aggregate outdated cache items

use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::Workspace;
use crate::cli::output::{emit, ReportTable};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Only update this project (default: every cached project)
    #[arg(long = "project-id", value_name = "ID")]
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProjectUpdate {
    project: String,
    outdated_items: usize,
    items_updated: usize,
    duration_ms: u64,
}

pub fn run(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let format = workspace.format(global);
    let cache = workspace.open_cache()?;

    let projects = match args.project_id {
        Some(id) => vec![id],
        None => cache.cached_projects()?,
    };

    let mut rows = Vec::with_capacity(projects.len());
    for project in projects {
        let outdated = cache.count_outdated(&project)?;
        let (items_updated, duration_ms) = if outdated == 0 {
            (0, 0)
        } else {
            let stats = cache.update(&project)?;
            (stats.items_updated, stats.duration.as_millis() as u64)
        };
        rows.push(ProjectUpdate {
            project,
            outdated_items: outdated,
            items_updated,
            duration_ms,
        });
    }

    if format != OutputFormat::Auto {
        return emit(format, &rows, || update_table(&rows));
    }

    if global.quiet {
        return Ok(());
    }
    for row in &rows {
        if row.outdated_items == 0 {
            println!("{} {} is up to date", style("✓").green(), style(&row.project).cyan());
        } else {
            println!(
                "{} {} updated {} item(s) in {}ms",
                style("✓").green(),
                style(&row.project).cyan(),
                row.items_updated,
                row.duration_ms
            );
        }
    }
    Ok(())
}

fn update_table(rows: &[ProjectUpdate]) -> ReportTable {
    let mut table = ReportTable::new(["project", "outdated_items", "items_updated", "duration_ms"]);
    for row in rows {
        table.push_row([
            row.project.clone(),
            row.outdated_items.to_string(),
            row.items_updated.to_string(),
            row.duration_ms.to_string(),
        ]);
    }
    table
}
