//! Model loading from a workspace

use miette::{IntoDiagnostic, Result};
use std::fs;

use crate::core::Project;
use crate::model::Model;

/// Read every `*.elca.yaml` file of the workspace into one model
///
/// Paths are kept relative to the workspace root so diagnostics and source
/// hashes do not depend on where the workspace lives.
pub fn load_model(project: &Project) -> Result<Model> {
    let mut sources = Vec::new();

    for path in project.iter_model_files() {
        let content = fs::read_to_string(&path).into_diagnostic()?;
        let relative = project.relative(&path).to_path_buf();
        sources.push((relative, content));
    }

    tracing::debug!(files = sources.len(), "loading model");
    Ok(Model::from_sources(sources)?)
}
