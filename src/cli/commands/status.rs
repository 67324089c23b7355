//! `elca status` command - Cache state of every variant

use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::Workspace;
use crate::cli::output::{emit, ReportTable};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::processing::LcaProcessor;

#[derive(clap::Args, Debug)]
pub struct StatusArgs {}

#[derive(Debug, Serialize)]
struct VariantRow {
    variant: String,
    project: String,
    cached: bool,
    items: usize,
    outdated_items: usize,
    /// Model files changed since the last computation
    stale: bool,
    /// Cached but no longer part of the model
    orphaned: bool,
    computed_at: Option<String>,
}

pub fn run(_args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let format = workspace.format(global);
    let model = workspace.load_model()?;
    let cache = workspace.open_cache()?;
    let processor = LcaProcessor::new(&cache, &model);

    let mut rows = Vec::new();
    for variant in model.variants() {
        let status = cache.variant_status(&variant.id)?;
        rows.push(VariantRow {
            variant: variant.id.clone(),
            project: variant.project.clone(),
            cached: status.is_some(),
            items: status.as_ref().map_or(0, |s| s.items),
            outdated_items: status.as_ref().map_or(0, |s| s.outdated_items),
            stale: processor.needs_recompute(&variant.id)?,
            orphaned: false,
            computed_at: status.and_then(|s| s.computed_at),
        });
    }

    for status in cache.variant_statuses()? {
        if model.variant(&status.variant_id).is_ok() {
            continue;
        }
        rows.push(VariantRow {
            variant: status.variant_id,
            project: status.project_id,
            cached: true,
            items: status.items,
            outdated_items: status.outdated_items,
            stale: true,
            orphaned: true,
            computed_at: status.computed_at,
        });
    }

    if format != OutputFormat::Auto {
        return emit(format, &rows, || status_table(&rows));
    }

    if rows.is_empty() {
        println!("No variants defined");
        return Ok(());
    }

    for row in &rows {
        let state = if row.orphaned {
            style("orphaned, run 'elca compute'".to_string()).red()
        } else if !row.cached {
            style("not computed".to_string()).yellow()
        } else if row.stale {
            style("stale".to_string()).yellow()
        } else if row.outdated_items > 0 {
            style(format!("{} outdated item(s)", row.outdated_items)).yellow()
        } else {
            style("up to date".to_string()).green()
        };
        println!(
            "{:<20} {:<16} {}",
            style(&row.variant).cyan(),
            row.project,
            state
        );
    }

    Ok(())
}

fn status_table(rows: &[VariantRow]) -> ReportTable {
    let mut table = ReportTable::new([
        "variant", "project", "cached", "items", "outdated", "stale", "orphaned",
    ]);
    for row in rows {
        table.push_row([
            row.variant.clone(),
            row.project.clone(),
            row.cached.to_string(),
            row.items.to_string(),
            row.outdated_items.to_string(),
            row.stale.to_string(),
            row.orphaned.to_string(),
        ]);
    }
    table
}
