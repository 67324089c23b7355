//! Workspace discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Marker directory that identifies a workspace root
pub const MARKER_DIR: &str = ".elca";

/// Suffix of model files picked up by the loader
pub const MODEL_SUFFIX: &str = ".elca.yaml";

/// Represents an eLCA workspace
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the workspace (parent of .elca/)
    root: PathBuf,
}

impl Project {
    /// Find workspace root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find workspace root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(MARKER_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new workspace at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(MARKER_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::create_layout(&root)?;
        Ok(Self { root })
    }

    /// Initialize even if .elca/ exists; rewrites the default config
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::create_layout(&root)?;
        Ok(Self { root })
    }

    fn create_layout(root: &Path) -> Result<(), ProjectError> {
        for dir in [MARKER_DIR, "library", "variants"] {
            std::fs::create_dir_all(root.join(dir))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        std::fs::write(root.join(MARKER_DIR).join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(root.join(MARKER_DIR).join(".gitignore"), "cache.db*\n")
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(())
    }

    fn default_config() -> &'static str {
        r#"# eLCA workspace configuration

# Default output format (auto, tsv, json, csv, yaml, md)
# default_format: auto

# Log filter when ELCA_LOG is unset (error, warn, info, debug, trace)
# log_level: warn

# Recompute outdated totals before reading results
# auto_update: true

# Milliseconds to wait for a locked cache
# busy_timeout_ms: 5000
"#
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .elca directory
    pub fn elca_dir(&self) -> PathBuf {
        self.root.join(MARKER_DIR)
    }

    /// Path of the workspace config file
    pub fn config_path(&self) -> PathBuf {
        self.elca_dir().join("config.yaml")
    }

    /// Path relative to the workspace root, for display
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    /// Iterate all model files below the root, skipping .elca/
    pub fn iter_model_files(&self) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.file_name() != MARKER_DIR)
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_string_lossy().ends_with(MODEL_SUFFIX))
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not an eLCA workspace (searched from {searched_from:?}). Run 'elca init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("eLCA workspace already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
