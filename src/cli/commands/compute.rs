//! `elca compute` command - Compute variants into the result cache

use std::collections::BTreeSet;

use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::Workspace;
use crate::cli::output::{emit, ReportTable};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::model::{validate, IssueSeverity};
use crate::processing::{ComputeStats, LcaProcessor, TracingObserver};

#[derive(clap::Args, Debug)]
pub struct ComputeArgs {
    /// Variant to compute (repeatable; default: all)
    #[arg(long = "variant", value_name = "ID")]
    pub variants: Vec<String>,

    /// Only compute variants whose model files changed since the last run
    #[arg(long)]
    pub changed: bool,
}

#[derive(Debug, Serialize)]
struct ComputedVariant {
    variant: String,
    project: String,
    #[serde(flatten)]
    stats: ComputeStats,
}

pub fn run(args: ComputeArgs, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let format = workspace.format(global);
    let model = workspace.load_model()?;

    let errors = validate(&model)
        .into_iter()
        .filter(|i| i.severity == IssueSeverity::Error)
        .count();
    if errors > 0 {
        return Err(miette::miette!(
            help = "run 'elca validate' for details",
            "model has {} error(s)",
            errors
        ));
    }

    let cache = workspace.open_cache()?;
    let mut processor = LcaProcessor::new(&cache, &model).with_observer(TracingObserver);

    let requested: Vec<String> = if args.variants.is_empty() {
        model.variants().map(|v| v.id.clone()).collect()
    } else {
        args.variants.clone()
    };

    let mut computed = Vec::new();
    let mut projects = BTreeSet::new();

    for variant_id in &requested {
        let variant = model.variant(variant_id)?;
        if args.changed && !processor.needs_recompute(variant_id)? {
            tracing::debug!(variant = %variant_id, "unchanged, skipped");
            continue;
        }

        let stats = processor.compute_project_variant(variant_id)?;
        projects.insert(variant.project.clone());
        computed.push(ComputedVariant {
            variant: variant_id.clone(),
            project: variant.project.clone(),
            stats,
        });
    }

    let mut removed = Vec::new();
    if args.variants.is_empty() {
        for cached in cache.cached_variants()? {
            if model.variant(&cached).is_err() && cache.remove_variant(&cached)? {
                removed.push(cached);
            }
        }
    }

    for project in &projects {
        processor.update_cache(project, None)?;
    }

    match format {
        OutputFormat::Auto => {
            if global.quiet {
                return Ok(());
            }
            for c in &computed {
                println!(
                    "{} {} {} element(s), {} component(s){}",
                    style("✓").green(),
                    style(&c.variant).cyan(),
                    c.stats.elements,
                    c.stats.components,
                    if c.stats.components_failed > 0 {
                        format!(", {} failed", style(c.stats.components_failed).red())
                    } else {
                        String::new()
                    }
                );
            }
            for variant in &removed {
                println!("{} {} removed from cache", style("-").red(), style(variant).cyan());
            }
            if computed.is_empty() && removed.is_empty() {
                println!("{} Nothing to compute", style("✓").green());
            }
        }
        other => emit(other, &computed, || {
            let mut table = ReportTable::new([
                "variant",
                "project",
                "elements",
                "components",
                "failed",
                "demands",
                "supplies",
                "transports",
            ]);
            for c in &computed {
                table.push_row([
                    c.variant.clone(),
                    c.project.clone(),
                    c.stats.elements.to_string(),
                    c.stats.components.to_string(),
                    c.stats.components_failed.to_string(),
                    c.stats.demands.to_string(),
                    c.stats.supplies.to_string(),
                    c.stats.transport_means.to_string(),
                ]);
            }
            table
        })?,
    }

    Ok(())
}
