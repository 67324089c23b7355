//! `elca results` command - Show cached results
//!
//! Reads only from the result cache. Outdated totals are aggregated first
//! unless `auto_update` is switched off.

use clap::Subcommand;
use console::style;
use miette::{miette, Result};
use serde::Serialize;

use crate::cli::helpers::{format_value, truncate_str, Workspace};
use crate::cli::output::{emit, ReportTable};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cache::{CachedIndicator, LeafEffect, LifeCycleEffect};
use crate::core::ResultCache;
use crate::processing::LcaProcessor;

#[derive(clap::Args, Debug, Clone)]
pub struct VariantArg {
    /// Variant to report (default: the only cached variant)
    #[arg(long)]
    pub variant: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct IndicatorFilter {
    /// Only show this indicator
    #[arg(long, short = 'i')]
    pub indicator: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ResultsCommands {
    /// Variant totals per indicator
    Total {
        #[command(flatten)]
        variant: VariantArg,
    },

    /// Variant totals per life cycle module and phase
    Phases {
        #[command(flatten)]
        variant: VariantArg,

        #[command(flatten)]
        filter: IndicatorFilter,
    },

    /// Totals per element type
    ElementTypes {
        #[command(flatten)]
        variant: VariantArg,

        /// Deepest element type level to show
        #[arg(long, default_value_t = 3)]
        level: u8,

        /// Indicator to report
        #[arg(long, short = 'i', default_value = "gwp")]
        indicator: String,
    },

    /// Results and components of one element
    Element {
        /// Element id
        element: String,

        #[command(flatten)]
        variant: VariantArg,
    },

    /// Final energy demands, supplies and reference models
    Energy {
        #[command(flatten)]
        variant: VariantArg,

        #[command(flatten)]
        filter: IndicatorFilter,
    },

    /// Transport results
    Transports {
        #[command(flatten)]
        variant: VariantArg,

        #[command(flatten)]
        filter: IndicatorFilter,
    },

    /// Elements with the largest totals
    Top {
        #[command(flatten)]
        variant: VariantArg,

        /// Indicator to rank by
        #[arg(long, short = 'i', default_value = "gwp")]
        indicator: String,

        /// Number of elements to show
        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,
    },

    /// Totals of two variants side by side
    Compare {
        /// Base variant, then the variant compared against it
        #[arg(long = "variant", value_name = "ID", required = true)]
        variants: Vec<String>,
    },

    /// Production impact avoided by reusing extant components
    Savings {
        #[command(flatten)]
        variant: VariantArg,
    },
}

#[derive(Debug, Serialize)]
struct Comparison {
    indicator: String,
    name: String,
    unit: String,
    base: f64,
    other: f64,
    difference: f64,
    /// Relative change against the base, absent when the base is 0
    change_percent: Option<f64>,
}

pub fn run(cmd: ResultsCommands, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let format = workspace.format(global);
    let cache = workspace.open_cache()?;

    match cmd {
        ResultsCommands::Total { variant } => {
            let variant = prepare(&workspace, &cache, variant)?;
            run_total(&cache, &variant, format)
        }
        ResultsCommands::Phases { variant, filter } => {
            let variant = prepare(&workspace, &cache, variant)?;
            run_phases(&cache, &variant, filter, format)
        }
        ResultsCommands::ElementTypes {
            variant,
            level,
            indicator,
        } => {
            let variant = prepare(&workspace, &cache, variant)?;
            run_element_types(&workspace, &cache, &variant, level, &indicator, format)
        }
        ResultsCommands::Element { element, variant } => {
            let variant = prepare(&workspace, &cache, variant)?;
            run_element(&cache, &variant, &element, format)
        }
        ResultsCommands::Energy { variant, filter } => {
            let variant = prepare(&workspace, &cache, variant)?;
            let effects = cache.final_energy_effects(&variant)?;
            print_leaf_effects(filter_leaves(effects, &filter), format)
        }
        ResultsCommands::Transports { variant, filter } => {
            let variant = prepare(&workspace, &cache, variant)?;
            let effects = cache.transport_effects(&variant)?;
            print_leaf_effects(filter_leaves(effects, &filter), format)
        }
        ResultsCommands::Top {
            variant,
            indicator,
            limit,
        } => {
            let variant = prepare(&workspace, &cache, variant)?;
            run_top(&cache, &variant, &indicator, limit, format)
        }
        ResultsCommands::Compare { variants } => {
            let [base, other] = variants.as_slice() else {
                return Err(miette!(
                    help = "pass --variant twice: the base first, then the one to compare",
                    "compare needs exactly two variants, got {}",
                    variants.len()
                ));
            };
            let base = prepare(&workspace, &cache, VariantArg { variant: Some(base.clone()) })?;
            let other = prepare(&workspace, &cache, VariantArg { variant: Some(other.clone()) })?;
            run_compare(&cache, &base, &other, format)
        }
        ResultsCommands::Savings { variant } => run_savings(&workspace, &cache, variant, global, format),
    }
}

/// Pick the variant and bring its project's totals up to date
fn prepare(workspace: &Workspace, cache: &ResultCache, arg: VariantArg) -> Result<String> {
    let variant = match arg.variant {
        Some(variant) => variant,
        None => {
            let cached = cache.cached_variants()?;
            match cached.as_slice() {
                [only] => only.clone(),
                [] => {
                    return Err(miette::miette!(
                        help = "run 'elca compute' first",
                        "no cached results"
                    ))
                }
                many => {
                    return Err(miette::miette!(
                        help = format!("pass --variant with one of: {}", many.join(", ")),
                        "{} variants are cached",
                        many.len()
                    ))
                }
            }
        }
    };

    if workspace.config.auto_update() {
        if let Some(status) = cache.variant_status(&variant)? {
            cache.ensure_current(&status.project_id)?;
        }
    }

    Ok(variant)
}

fn run_total(cache: &ResultCache, variant: &str, format: OutputFormat) -> Result<()> {
    let totals = cache.total_effects(variant)?;

    emit(format, &totals, || {
        let mut table = ReportTable::new(["indicator", "name", "unit", "value"]);
        for total in &totals {
            table.push_row([
                total.indicator.clone(),
                total.name.clone(),
                total.unit.clone(),
                format_value(total.value),
            ]);
        }
        table
    })
}

fn run_phases(
    cache: &ResultCache,
    variant: &str,
    filter: IndicatorFilter,
    format: OutputFormat,
) -> Result<()> {
    let effects: Vec<LifeCycleEffect> = cache
        .effects_per_life_cycle(variant)?
        .into_iter()
        .filter(|e| filter.indicator.as_ref().map_or(true, |i| *i == e.indicator))
        .collect();
    let indicators = selected_indicators(cache, &filter)?;

    emit(format, &effects, || effects_matrix(&effects, &indicators))
}

fn run_element_types(
    workspace: &Workspace,
    cache: &ResultCache,
    variant: &str,
    level: u8,
    indicator: &str,
    format: OutputFormat,
) -> Result<()> {
    let effects = cache.effects_per_element_type(variant, level, indicator)?;

    // Names are optional; results stay readable when the model is broken
    let model = match workspace.load_model() {
        Ok(model) => Some(model),
        Err(e) => {
            tracing::debug!("element type names unavailable: {}", e);
            None
        }
    };

    emit(format, &effects, || {
        let mut table = ReportTable::new(["code", "name", "mass", indicator]);
        for effect in &effects {
            let name = model
                .as_ref()
                .and_then(|m| m.element_type_name(&effect.code))
                .unwrap_or_default();
            let indent = "  ".repeat(usize::from(effect.level.saturating_sub(1)));
            table.push_row([
                format!("{}{}", indent, effect.code),
                truncate_str(name, 40),
                format_value(effect.mass),
                format_value(effect.value),
            ]);
        }
        table
    })
}

fn run_element(cache: &ResultCache, variant: &str, element: &str, format: OutputFormat) -> Result<()> {
    let effects = cache.element_effects(variant, element)?;
    let indicators = cache.indicators()?;

    if format != OutputFormat::Auto {
        return emit(format, &effects, || effects_matrix(&effects.effects, &indicators));
    }

    println!("{} {}", style("Element").bold(), style(&effects.element_id).cyan());
    println!("  Element type: {}", effects.element_type);
    println!("  Quantity:     {} {}", format_value(effects.quantity), effects.ref_unit);
    println!("  Mass:         {} kg", format_value(effects.mass));
    if let Some(composite) = &effects.composite {
        println!("  Part of:      {}", composite);
    }
    if effects.is_virtual {
        println!("  {}", style("virtual: not counted in its element type").dim());
    }
    if effects.is_outdated {
        println!("  {}", style("outdated: run 'elca update'").yellow());
    }
    println!();
    print!("{}", effects_matrix(&effects.effects, &indicators).render(format)?);

    if !effects.components.is_empty() {
        println!();
        let mut table = ReportTable::new(["component", "quantity", "unit", "mass", "replacements"]);
        for component in &effects.components {
            table.push_row([
                component.component_id.clone(),
                format_value(component.quantity),
                component.ref_unit.clone(),
                format_value(component.mass),
                component.num_replacements.to_string(),
            ]);
        }
        print!("{}", table.render(format)?);
    }

    Ok(())
}

fn run_top(
    cache: &ResultCache,
    variant: &str,
    indicator: &str,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let ranking = cache.top_elements(variant, indicator, limit)?;

    emit(format, &ranking, || {
        let mut table = ReportTable::new(["rank", "element", "element_type", "mass", indicator]);
        for (rank, row) in ranking.iter().enumerate() {
            table.push_row([
                (rank + 1).to_string(),
                row.element_id.clone(),
                row.element_type.clone(),
                format_value(row.mass),
                format_value(row.value),
            ]);
        }
        table
    })
}

fn run_compare(cache: &ResultCache, base: &str, other: &str, format: OutputFormat) -> Result<()> {
    let other_totals = cache.total_effects(other)?;
    let rows: Vec<Comparison> = cache
        .total_effects(base)?
        .into_iter()
        .map(|total| {
            let other_value = other_totals
                .iter()
                .find(|t| t.indicator == total.indicator)
                .map_or(0.0, |t| t.value);
            let difference = other_value - total.value;
            Comparison {
                change_percent: (total.value != 0.0).then(|| difference / total.value.abs() * 100.0),
                indicator: total.indicator,
                name: total.name,
                unit: total.unit,
                base: total.value,
                other: other_value,
                difference,
            }
        })
        .collect();

    emit(format, &rows, || {
        let mut table = ReportTable::new(["indicator", "unit", base, other, "difference", "change_%"]);
        for row in &rows {
            table.push_row([
                row.indicator.clone(),
                row.unit.clone(),
                format_value(row.base),
                format_value(row.other),
                format_value(row.difference),
                row.change_percent.map(|p| format!("{:.2}", p)).unwrap_or_default(),
            ]);
        }
        table
    })
}

fn run_savings(
    workspace: &Workspace,
    cache: &ResultCache,
    arg: VariantArg,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<()> {
    let model = workspace.load_model()?;
    let variant = match arg.variant {
        Some(variant) => variant,
        None => {
            let ids: Vec<&str> = model.variants().map(|v| v.id.as_str()).collect();
            match ids.as_slice() {
                [only] => only.to_string(),
                _ => {
                    return Err(miette!(
                        help = "pass --variant with the variant to report",
                        "{} variants are defined",
                        ids.len()
                    ))
                }
            }
        }
    };

    let savings = LcaProcessor::new(cache, &model).extant_savings(&variant)?;

    if format == OutputFormat::Auto && !global.quiet {
        println!(
            "{} extant component(s) of {} save in {}:",
            savings.components,
            style(&savings.variant).cyan(),
            savings.module
        );
    }

    emit(format, &savings, || {
        let mut table = ReportTable::new(["indicator", "name", "unit", "value", "per_m2a"]);
        for saving in &savings.savings {
            table.push_row([
                saving.indicator.clone(),
                saving.name.clone(),
                saving.unit.clone(),
                format_value(saving.value),
                format_value(saving.per_m2a),
            ]);
        }
        table
    })
}

fn filter_leaves(effects: Vec<LeafEffect>, filter: &IndicatorFilter) -> Vec<LeafEffect> {
    effects
        .into_iter()
        .filter(|e| filter.indicator.as_ref().map_or(true, |i| *i == e.indicator))
        .collect()
}

fn print_leaf_effects(effects: Vec<LeafEffect>, format: OutputFormat) -> Result<()> {
    emit(format, &effects, || {
        let mut table = ReportTable::new([
            "type",
            "id",
            "quantity",
            "unit",
            "life_cycle",
            "indicator",
            "value",
            "counted",
        ]);
        for effect in &effects {
            table.push_row([
                effect.item_type.to_string(),
                effect.id.clone(),
                format_value(effect.quantity),
                effect.ref_unit.clone(),
                effect.life_cycle.clone(),
                effect.indicator.clone(),
                format_value(effect.value),
                if effect.is_virtual { "no" } else { "yes" }.to_string(),
            ]);
        }
        table
    })
}

fn selected_indicators(cache: &ResultCache, filter: &IndicatorFilter) -> Result<Vec<CachedIndicator>> {
    Ok(cache
        .indicators()?
        .into_iter()
        .filter(|i| filter.indicator.as_ref().map_or(true, |f| *f == i.ident))
        .collect())
}

/// One row per life cycle, one column per indicator
fn effects_matrix(effects: &[LifeCycleEffect], indicators: &[CachedIndicator]) -> ReportTable {
    let mut headers = vec!["life_cycle".to_string(), "kind".to_string()];
    headers.extend(indicators.iter().map(|i| i.ident.clone()));
    let mut table = ReportTable::new(headers);

    let mut life_cycles: Vec<(&str, &str)> = Vec::new();
    for effect in effects {
        if !life_cycles.iter().any(|(lc, _)| *lc == effect.life_cycle) {
            life_cycles.push((effect.life_cycle.as_str(), effect.kind.as_str()));
        }
    }

    for (life_cycle, kind) in life_cycles {
        let mut row = vec![life_cycle.to_string(), kind.to_string()];
        for indicator in indicators {
            let value = effects
                .iter()
                .find(|e| e.life_cycle == life_cycle && e.indicator == indicator.ident)
                .map(|e| format_value(e.value))
                .unwrap_or_default();
            row.push(value);
        }
        table.push_row(row);
    }
    table
}
