//! Building model and process library
//!
//! A workspace holds any number of `*.elca.yaml` files. Each YAML document in
//! them is tagged with a `kind` and contributes to one [`Model`].

mod element_type;
mod library;
mod project;
mod validate;
mod variant;

pub use element_type::ElementTypeCode;
pub use library::{ElementTypeNames, IndicatorCatalog, ProcessConfig, ProcessDb};
pub use project::ProjectSpec;
pub use validate::{validate, IssueSeverity, ModelIssue};
pub use variant::{
    Component, Element, FinalEnergyDemand, FinalEnergyRefModel, FinalEnergySupply, Layer,
    Transport, TransportMean, Variant,
};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::lca::{Indicator, ProcessLifeCycle};
use crate::yaml::YamlSyntaxError;

/// A single YAML document of a model file
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Document {
    Project(ProjectSpec),
    Indicators(IndicatorCatalog),
    ProcessDb(ProcessDb),
    ProcessConfig(ProcessConfig),
    ElementTypes(ElementTypeNames),
    Variant(Variant),
}

/// Errors that can occur while assembling a model
#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("failed to read {path:?}: {message}")]
    Io { path: PathBuf, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("duplicate {kind} '{id}' in {path:?}")]
    #[diagnostic(code(elca::model::duplicate), help("ids must be unique across the workspace"))]
    Duplicate {
        kind: &'static str,
        id: String,
        path: PathBuf,
    },

    #[error("unknown variant '{0}'")]
    #[diagnostic(code(elca::model::unknown_variant))]
    UnknownVariant(String),

    #[error("unknown project '{project}' referenced by variant '{variant}'")]
    #[diagnostic(code(elca::model::unknown_project))]
    UnknownProject { project: String, variant: String },
}

/// Where a variant was loaded from
#[derive(Debug, Clone)]
struct VariantSource {
    path: PathBuf,
    content_hash: String,
}

/// Everything loaded from a workspace
#[derive(Debug, Default)]
pub struct Model {
    projects: BTreeMap<String, ProjectSpec>,
    indicators: Vec<Indicator>,
    process_dbs: BTreeMap<String, ProcessDb>,
    process_configs: BTreeMap<String, ProcessConfig>,
    element_type_names: BTreeMap<String, String>,
    variants: BTreeMap<String, Variant>,
    variant_sources: BTreeMap<String, VariantSource>,
    library_hashes: Vec<String>,
    library_hash: String,
    files: usize,
}

impl Model {
    /// Build a model from `(path, content)` pairs
    ///
    /// Paths are only used for diagnostics and source tracking.
    pub fn from_sources<I>(sources: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (PathBuf, String)>,
    {
        let mut sources: Vec<(PathBuf, String)> = sources.into_iter().collect();
        sources.sort_by(|a, b| a.0.cmp(&b.0));

        let mut model = Model::default();
        for (path, content) in &sources {
            model.add_source(path, content)?;
        }

        model.library_hash = compute_hash(&model.library_hashes.concat());
        Ok(model)
    }

    fn add_source(&mut self, path: &Path, content: &str) -> Result<(), ModelError> {
        self.files += 1;
        if is_blank(content) {
            return Ok(());
        }

        let content_hash = compute_hash(content);
        let filename = path.display().to_string();
        let mut contributes_to_library = false;

        for document in serde_yml::Deserializer::from_str(content) {
            let document = Document::deserialize(document)
                .map_err(|e| YamlSyntaxError::from_serde_error(&e, content, &filename))?;

            match document {
                Document::Variant(variant) => {
                    self.variant_sources.insert(
                        variant.id.clone(),
                        VariantSource {
                            path: path.to_path_buf(),
                            content_hash: content_hash.clone(),
                        },
                    );
                    insert_unique(&mut self.variants, "variant", variant.id.clone(), variant, path)?;
                }
                other => {
                    contributes_to_library = true;
                    self.add_library_document(other, path)?;
                }
            }
        }

        if contributes_to_library {
            self.library_hashes.push(content_hash);
        }

        Ok(())
    }

    fn add_library_document(&mut self, document: Document, path: &Path) -> Result<(), ModelError> {
        match document {
            Document::Project(project) => {
                insert_unique(&mut self.projects, "project", project.id.clone(), project, path)
            }
            Document::Indicators(catalog) => {
                for indicator in catalog.indicators {
                    if self.indicators.iter().any(|i| i.ident == indicator.ident) {
                        return Err(ModelError::Duplicate {
                            kind: "indicator",
                            id: indicator.ident,
                            path: path.to_path_buf(),
                        });
                    }
                    self.indicators.push(indicator);
                }
                Ok(())
            }
            Document::ProcessDb(db) => {
                insert_unique(&mut self.process_dbs, "process_db", db.id.clone(), db, path)
            }
            Document::ProcessConfig(config) => insert_unique(
                &mut self.process_configs,
                "process_config",
                config.id.clone(),
                config,
                path,
            ),
            Document::ElementTypes(names) => {
                self.element_type_names.extend(names.names);
                Ok(())
            }
            Document::Variant(_) => Ok(()),
        }
    }

    /// Number of model files read (including blank ones)
    pub fn file_count(&self) -> usize {
        self.files
    }

    pub fn projects(&self) -> impl Iterator<Item = &ProjectSpec> {
        self.projects.values()
    }

    pub fn project(&self, id: &str) -> Option<&ProjectSpec> {
        self.projects.get(id)
    }

    pub fn variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants.values()
    }

    pub fn variant(&self, id: &str) -> Result<&Variant, ModelError> {
        self.variants
            .get(id)
            .ok_or_else(|| ModelError::UnknownVariant(id.to_string()))
    }

    /// Project a variant belongs to
    pub fn project_of(&self, variant: &Variant) -> Result<&ProjectSpec, ModelError> {
        self.projects
            .get(&variant.project)
            .ok_or_else(|| ModelError::UnknownProject {
                project: variant.project.clone(),
                variant: variant.id.clone(),
            })
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn process_db(&self, id: &str) -> Option<&ProcessDb> {
        self.process_dbs.get(id)
    }

    pub fn process_dbs(&self) -> impl Iterator<Item = &ProcessDb> {
        self.process_dbs.values()
    }

    pub fn process_config(&self, id: &str) -> Option<&ProcessConfig> {
        self.process_configs.get(id)
    }

    pub fn process_configs(&self) -> impl Iterator<Item = &ProcessConfig> {
        self.process_configs.values()
    }

    /// Processes of a process config within the given database
    pub fn life_cycle(&self, process_config: &str, process_db: &str) -> Option<ProcessLifeCycle> {
        self.process_configs
            .get(process_config)
            .and_then(|c| c.life_cycle(process_db))
    }

    pub fn element_type_name(&self, code: &str) -> Option<&str> {
        self.element_type_names.get(code).map(String::as_str)
    }

    pub fn variant_path(&self, id: &str) -> Option<&Path> {
        self.variant_sources.get(id).map(|s| s.path.as_path())
    }

    /// Hash over the variant's file and the whole library
    ///
    /// Changes whenever anything the variant's results depend on changes.
    pub fn variant_source_hash(&self, id: &str) -> Option<String> {
        self.variant_sources
            .get(id)
            .map(|s| compute_hash(&format!("{}{}", s.content_hash, self.library_hash)))
    }
}

fn insert_unique<T>(
    map: &mut BTreeMap<String, T>,
    kind: &'static str,
    id: String,
    value: T,
    path: &Path,
) -> Result<(), ModelError> {
    if map.contains_key(&id) {
        return Err(ModelError::Duplicate {
            kind,
            id,
            path: path.to_path_buf(),
        });
    }
    map.insert(id, value);
    Ok(())
}

/// True if the content holds nothing but comments and whitespace
fn is_blank(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .all(|l| l.is_empty() || l.starts_with('#') || l == "---")
}

fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
