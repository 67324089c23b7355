//! `elca cache` command - Result cache maintenance
//!
//! The cache is a local SQLite database under `.elca/`. It is user-local
//! (gitignored) and can always be rebuilt with `elca compute`.

use clap::Subcommand;
use console::style;
use dialoguer::Confirm;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::Workspace;
use crate::cli::output::{emit, ReportTable};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cache::CACHE_FILE;

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache statistics
    Status,

    /// Execute a read-only SQL query against the cache
    Query {
        /// SQL query to execute
        sql: String,
    },

    /// Check cached results for inconsistencies
    Check,

    /// Remove all cached results
    Clear {
        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

pub fn run(cmd: CacheCommands, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    match cmd {
        CacheCommands::Status => run_status(&workspace, global),
        CacheCommands::Query { sql } => run_query(&workspace, global, &sql),
        CacheCommands::Check => run_check(&workspace, global),
        CacheCommands::Clear { yes } => run_clear(&workspace, global, yes),
    }
}

fn run_status(workspace: &Workspace, global: &GlobalOpts) -> Result<()> {
    let cache = workspace.open_cache()?;
    let stats = cache.statistics()?;

    let format = workspace.format(global);
    if format != OutputFormat::Auto {
        return emit(format, &stats, || {
            let mut table = ReportTable::new(["key", "value"]);
            table.push_row(["total_items".to_string(), stats.total_items.to_string()]);
            table.push_row(["outdated_items".to_string(), stats.outdated_items.to_string()]);
            table.push_row(["indicator_values".to_string(), stats.indicator_values.to_string()]);
            table.push_row(["variants".to_string(), stats.variants.to_string()]);
            table.push_row(["db_size_bytes".to_string(), stats.db_size_bytes.to_string()]);
            table
        });
    }

    println!("{}", style("Cache Status").bold());
    println!("{}", style("─".repeat(40)).dim());
    println!(
        "  Location:         {}",
        workspace.project.root().join(CACHE_FILE).display()
    );
    println!("  Variants:         {}", style(stats.variants).cyan());
    println!("  Items:            {}", style(stats.total_items).cyan());
    println!("  Outdated items:   {}", style(stats.outdated_items).yellow());
    println!("  Indicator values: {}", style(stats.indicator_values).cyan());
    println!(
        "  Database size:    {} KB",
        style(stats.db_size_bytes / 1024).cyan()
    );

    if !stats.by_type.is_empty() {
        println!();
        println!("  {}", style("By Type:").bold());
        for (item_type, count) in &stats.by_type {
            println!("    {:<24} {}", item_type, count);
        }
    }

    Ok(())
}

fn run_query(workspace: &Workspace, global: &GlobalOpts, sql: &str) -> Result<()> {
    let cache = workspace.open_cache()?;
    let columns = cache.query_columns(sql)?;
    let rows = cache.query_raw(sql)?;

    let mut table = ReportTable::new(columns);
    for row in rows {
        table.push_row(row);
    }

    // Column values are untyped; every format goes through the table
    let format = match workspace.format(global) {
        OutputFormat::Auto => OutputFormat::Tsv,
        other => other,
    };
    print!("{}", table.render(format)?);
    Ok(())
}

fn run_check(workspace: &Workspace, global: &GlobalOpts) -> Result<()> {
    let cache = workspace.open_cache()?;
    let issues = cache.check()?;

    let format = workspace.format(global);
    if format != OutputFormat::Auto {
        emit(format, &issues, || {
            let mut table = ReportTable::new(["item_id", "item_type", "message"]);
            for issue in &issues {
                table.push_row([
                    issue.item_id.to_string(),
                    issue.item_type.clone(),
                    issue.message.clone(),
                ]);
            }
            table
        })?;
    } else if issues.is_empty() {
        if !global.quiet {
            println!("{} No issues found", style("✓").green());
        }
    } else {
        for issue in &issues {
            println!(
                "{} item {} ({}): {}",
                style("✗").red(),
                issue.item_id,
                issue.item_type,
                issue.message
            );
        }
    }

    if !issues.is_empty() {
        return Err(miette::miette!(
            help = "run 'elca cache clear' and 'elca compute' to rebuild",
            "cache check found {} issue(s)",
            issues.len()
        ));
    }
    Ok(())
}

fn run_clear(workspace: &Workspace, global: &GlobalOpts, yes: bool) -> Result<()> {
    if !yes && console::user_attended() {
        let confirmed = Confirm::new()
            .with_prompt("Remove all cached results?")
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            return Ok(());
        }
    }

    let cache = workspace.open_cache()?;
    cache.clear()?;

    if !global.quiet {
        println!("{} Cache cleared", style("✓").green());
    }
    Ok(())
}
