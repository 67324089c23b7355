//! Example workspace shipped with the binary

use std::fs;
use std::path::PathBuf;

use miette::{IntoDiagnostic, Result};
use rust_embed::Embed;

use crate::core::Project;

#[derive(Embed)]
#[folder = "templates/example/"]
struct ExampleFiles;

/// Write the example model files into a workspace
///
/// Existing files are left alone. Returns the paths written, relative to
/// the workspace root.
pub fn write_example(project: &Project) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for name in ExampleFiles::iter() {
        let target = project.root().join(name.as_ref());
        if target.exists() {
            tracing::debug!(path = %target.display(), "keeping existing file");
            continue;
        }

        let Some(file) = ExampleFiles::get(name.as_ref()) else {
            continue;
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).into_diagnostic()?;
        }
        fs::write(&target, file.data.as_ref()).into_diagnostic()?;
        written.push(PathBuf::from(name.as_ref()));
    }

    written.sort();
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::load_model;
    use tempfile::tempdir;

    #[test]
    fn test_example_loads_and_validates() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        let written = write_example(&project).unwrap();
        assert_eq!(written.len(), 2);

        let model = load_model(&project).unwrap();
        assert!(model.variant("v1").is_ok());
        assert!(crate::model::validate(&model)
            .iter()
            .all(|i| i.severity == crate::model::IssueSeverity::Warning));
    }

    #[test]
    fn test_existing_files_are_kept() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        fs::write(project.root().join("variants/v1.elca.yaml"), "# mine\n").unwrap();

        let written = write_example(&project).unwrap();
        assert_eq!(written, vec![PathBuf::from("library/library.elca.yaml")]);
        assert_eq!(
            fs::read_to_string(project.root().join("variants/v1.elca.yaml")).unwrap(),
            "# mine\n"
        );
    }
}
