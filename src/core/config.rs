//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::Project;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Workspace configuration
///
/// Layers, lowest priority first: built-in defaults, the global user config,
/// `.elca/config.yaml`, then `ELCA_*` environment variables.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,

    /// Log filter used when ELCA_LOG is unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Recompute outdated totals before reading results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<bool>,

    /// Milliseconds to wait for a locked cache database
    #[serde(skip_serializing_if = "Option::is_none")]
    pub busy_timeout_ms: Option<u64>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read(&global_path) {
                config.merge(global);
            }
        }

        if let Some(project) = project {
            if let Some(local) = Self::read(&project.config_path()) {
                config.merge(local);
            }
        }

        config.merge(Self::from_env());
        config
    }

    fn read(path: &std::path::Path) -> Option<Config> {
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Option<Config>>(&contents) {
            Ok(config) => Some(config.unwrap_or_default()),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    fn from_env() -> Config {
        Config {
            default_format: std::env::var("ELCA_FORMAT").ok(),
            log_level: None,
            auto_update: std::env::var("ELCA_AUTO_UPDATE")
                .ok()
                .and_then(|v| parse_bool(&v)),
            busy_timeout_ms: None,
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "elca")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.auto_update.is_some() {
            self.auto_update = other.auto_update;
        }
        if other.busy_timeout_ms.is_some() {
            self.busy_timeout_ms = other.busy_timeout_ms;
        }
    }

    pub fn auto_update(&self) -> bool {
        self.auto_update.unwrap_or(true)
    }

    pub fn busy_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Config {
            default_format: Some("tsv".into()),
            auto_update: Some(true),
            ..Config::default()
        };
        base.merge(Config {
            auto_update: Some(false),
            busy_timeout_ms: Some(100),
            ..Config::default()
        });

        assert_eq!(base.default_format.as_deref(), Some("tsv"));
        assert!(!base.auto_update());
        assert_eq!(base.busy_timeout().as_millis(), 100);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.auto_update());
        assert_eq!(config.busy_timeout().as_millis(), 5000);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_empty_config_file_reads_as_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "# only comments\n").unwrap();
        let config = Config::read(&path).unwrap();
        assert!(config.default_format.is_none());

        std::fs::write(&path, "log_level: debug\nauto_update: false\n").unwrap();
        let config = Config::read(&path).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(!config.auto_update());
    }
}
