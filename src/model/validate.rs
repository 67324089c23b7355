//! Semantic checks across model documents
//!
//! Syntax and shape errors are caught while loading; these checks cover the
//! references between documents and combinations the processor cannot use.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use super::{Model, Variant};
use crate::lca::PET;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Warning,
    Error,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueSeverity::Warning => write!(f, "warning"),
            IssueSeverity::Error => write!(f, "error"),
        }
    }
}

/// A problem found in the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelIssue {
    pub severity: IssueSeverity,
    /// Document path such as `variant v1 / element wall`
    pub location: String,
    pub message: String,
}

impl ModelIssue {
    fn error(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            location: location.into(),
            message: message.into(),
        }
    }

    fn warning(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Check the whole model; errors first, then warnings
pub fn validate(model: &Model) -> Vec<ModelIssue> {
    let mut issues = Vec::new();

    check_library(model, &mut issues);
    for variant in model.variants() {
        check_variant(model, variant, &mut issues);
    }

    issues.sort_by(|a, b| b.severity.cmp(&a.severity));
    issues
}

fn check_library(model: &Model, issues: &mut Vec<ModelIssue>) {
    if model.indicators().is_empty() {
        issues.push(ModelIssue::error("indicators", "no indicators defined"));
    } else if !model.indicators().iter().any(|i| i.ident == PET) {
        issues.push(ModelIssue::error(
            "indicators",
            format!("indicator '{}' is required", PET),
        ));
    }

    for project in model.projects() {
        let location = format!("project {}", project.id);
        if model.process_db(&project.process_db).is_none() {
            issues.push(ModelIssue::error(
                &location,
                format!("unknown process_db '{}'", project.process_db),
            ));
        }
        if project.life_time == 0 {
            issues.push(ModelIssue::error(&location, "life_time must be greater than 0"));
        }
        for (ident, config) in &project.ref_model_processes {
            if model.process_config(config).is_none() {
                issues.push(ModelIssue::error(
                    &location,
                    format!("ref model '{}' references unknown process_config '{}'", ident, config),
                ));
            }
        }
    }

    for config in model.process_configs() {
        for (db, processes) in &config.life_cycles {
            if model.process_db(db).is_none() {
                issues.push(ModelIssue::warning(
                    format!("process_config {}", config.id),
                    format!("life cycle for unknown process_db '{}'", db),
                ));
            }
            for process in processes {
                if process.ref_value <= 0.0 {
                    issues.push(ModelIssue::error(
                        format!("process_config {} / process {}", config.id, process.id),
                        "ref_value must be greater than 0",
                    ));
                }
            }
        }
    }
}

fn check_variant(model: &Model, variant: &Variant, issues: &mut Vec<ModelIssue>) {
    let location = format!("variant {}", variant.id);

    let Some(project) = model.project(&variant.project) else {
        issues.push(ModelIssue::error(
            &location,
            format!("unknown project '{}'", variant.project),
        ));
        return;
    };
    let process_db = project.process_db.as_str();

    let check_config = |location: &str, config: &str, issues: &mut Vec<ModelIssue>| {
        match model.process_config(config) {
            None => issues.push(ModelIssue::error(
                location,
                format!("unknown process_config '{}'", config),
            )),
            Some(c) if !c.life_cycles.contains_key(process_db) => issues.push(ModelIssue::warning(
                location,
                format!("process_config '{}' has no processes for '{}'", config, process_db),
            )),
            Some(_) => {}
        }
    };

    let mut element_ids = HashSet::new();
    let mut component_ids = HashSet::new();
    let mut composite_of: HashMap<&str, &str> = HashMap::new();

    for element in &variant.elements {
        let loc = format!("{} / element {}", location, element.id);
        if !element_ids.insert(element.id.as_str()) {
            issues.push(ModelIssue::error(&loc, "duplicate element id"));
        }

        if element.is_composite() {
            if !element.element_type.is_composite_level() {
                issues.push(ModelIssue::warning(
                    &loc,
                    format!(
                        "composite element with non-composite element type {}",
                        element.element_type
                    ),
                ));
            }
            if !element.components.is_empty() {
                issues.push(ModelIssue::warning(&loc, "components of composite elements are ignored"));
            }
            for sub in &element.elements {
                match variant.element(sub) {
                    None => issues.push(ModelIssue::error(
                        &loc,
                        format!("unknown sub-element '{}'", sub),
                    )),
                    Some(s) if s.is_composite() => issues.push(ModelIssue::error(
                        &loc,
                        format!("sub-element '{}' is itself composite", sub),
                    )),
                    Some(_) => {}
                }
                if let Some(other) = composite_of.insert(sub.as_str(), element.id.as_str()) {
                    issues.push(ModelIssue::error(
                        &loc,
                        format!("sub-element '{}' is already part of '{}'", sub, other),
                    ));
                }
            }
        } else if element.element_type.is_composite_level() {
            issues.push(ModelIssue::warning(
                &loc,
                format!(
                    "element type {} holds composite elements; this element is excluded from totals",
                    element.element_type
                ),
            ));
        }

        for component in &element.components {
            let cloc = format!("{} / component {}", loc, component.id);
            if !component_ids.insert(component.id.as_str()) {
                issues.push(ModelIssue::error(&cloc, "duplicate component id"));
            }
            if component.quantity.is_none() && component.layer.is_none() {
                issues.push(ModelIssue::error(&cloc, "component needs either quantity or layer"));
            }
            if component.life_time == 0 {
                issues.push(ModelIssue::warning(&cloc, "life_time of 0 disables replacements"));
            }
            check_config(&cloc, &component.process_config, issues);
        }
    }

    for demand in &variant.final_energy_demands {
        let loc = format!("{} / final_energy_demand {}", location, demand.id);
        check_config(&loc, &demand.process_config, issues);
    }

    for supply in &variant.final_energy_supplies {
        let loc = format!("{} / final_energy_supply {}", location, supply.id);
        if !(0.0..=1.0).contains(&supply.en_ev_ratio) {
            issues.push(ModelIssue::warning(&loc, "en_ev_ratio should be between 0 and 1"));
        }
        check_config(&loc, &supply.process_config, issues);
    }

    for ref_model in &variant.final_energy_ref_models {
        if !project.ref_model_processes.contains_key(&ref_model.ident) {
            issues.push(ModelIssue::warning(
                format!("{} / final_energy_ref_model {}", location, ref_model.id),
                format!(
                    "project '{}' has no ref_model_processes entry for '{}'; it will be skipped",
                    project.id, ref_model.ident
                ),
            ));
        }
    }

    for transport in &variant.transports {
        for mean in &transport.means {
            let loc = format!("{} / transport {} / mean {}", location, transport.id, mean.id);
            check_config(&loc, &mean.process_config, issues);
        }
    }
}
