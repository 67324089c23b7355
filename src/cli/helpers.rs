//! Shared helper functions for CLI commands

use clap::ValueEnum;
use miette::{miette, Result};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::project::{Project, ProjectError};
use crate::core::{load_model, Config, ResultCache};
use crate::model::Model;

/// An opened workspace with its merged configuration
pub struct Workspace {
    pub project: Project,
    pub config: Config,
}

impl Workspace {
    /// Find the workspace from `--project` or the current directory
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = discover_project(global)?;
        let config = Config::load_for(Some(&project));
        Ok(Self { project, config })
    }

    pub fn load_model(&self) -> Result<Model> {
        load_model(&self.project)
    }

    pub fn open_cache(&self) -> Result<ResultCache> {
        ResultCache::open(&self.project, &self.config)
    }

    /// `--format`, falling back to the configured default
    pub fn format(&self, global: &GlobalOpts) -> OutputFormat {
        resolve_format(global.format, &self.config)
    }
}

pub fn discover_project(global: &GlobalOpts) -> Result<Project> {
    let found = match &global.project {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    };

    found.map_err(|e| match e {
        ProjectError::NotFound { .. } => miette!(
            help = "run 'elca init' to create a workspace",
            "{}",
            e
        ),
        other => miette!("{}", other),
    })
}

pub fn resolve_format(requested: OutputFormat, config: &Config) -> OutputFormat {
    if requested != OutputFormat::Auto {
        return requested;
    }

    config
        .default_format
        .as_deref()
        .and_then(|f| OutputFormat::from_str(f, true).ok())
        .unwrap_or(OutputFormat::Auto)
}

/// Format an indicator value for display
///
/// Values down to 0.01 get two decimals, smaller ones scientific notation.
pub fn format_value(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else if value.abs() >= 0.01 {
        format!("{:.2}", value)
    } else {
        format!("{:.3e}", value)
    }
}

/// Truncate a string to max_len, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(70140.0), "70140.00");
        assert_eq!(format_value(-25000.0), "-25000.00");
        assert_eq!(format_value(0.01), "0.01");
        assert_eq!(format_value(0.000123), "1.230e-4");
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("Außenwände", 7), "Auße...");
    }

    #[test]
    fn test_resolve_format_uses_config_default() {
        let config = Config {
            default_format: Some("json".to_string()),
            ..Config::default()
        };
        assert_eq!(resolve_format(OutputFormat::Auto, &config), OutputFormat::Json);
        assert_eq!(resolve_format(OutputFormat::Csv, &config), OutputFormat::Csv);
        assert_eq!(resolve_format(OutputFormat::Auto, &Config::default()), OutputFormat::Auto);
    }
}
