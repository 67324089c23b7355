//! Indicators and per-module indicator results

use serde::{Deserialize, Serialize};

use super::{Module, Stage};

/// Ident of the total primary energy indicator
pub const PET: &str = "pet";

/// Indicators whose values add up to PET
pub const PET_COMPONENTS: [&str; 4] = ["peEm", "peNEm", "pert", "penrt"];

/// An environmental indicator (GWP, PENRT, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    pub ident: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub unit: String,
}

impl Indicator {
    pub fn new(ident: impl Into<String>, name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            name: name.into(),
            unit: unit.into(),
        }
    }

    pub fn is_pet(&self) -> bool {
        self.ident == PET
    }

    pub fn is_pet_component(&self) -> bool {
        PET_COMPONENTS.contains(&self.ident.as_str())
    }
}

/// Value of a single indicator; `None` when the process does not define it
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorResult {
    indicator: String,
    value: Option<f64>,
}

impl IndicatorResult {
    pub fn new(indicator: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            indicator: indicator.into(),
            value,
        }
    }

    /// Build results from `(indicator, value)` pairs
    pub fn values_from_map<'a>(values: impl IntoIterator<Item = (&'a str, f64)>) -> Vec<Self> {
        values
            .into_iter()
            .map(|(ident, value)| Self::new(ident, Some(value)))
            .collect()
    }

    pub fn indicator(&self) -> &str {
        &self.indicator
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// All indicator results of one process (or aggregate) for one module
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorResults {
    module: Module,
    results: Vec<IndicatorResult>,
    process_id: Option<String>,
    module_ratio: f64,
}

impl IndicatorResults {
    pub fn new(
        module: Module,
        results: Vec<IndicatorResult>,
        process_id: Option<String>,
        module_ratio: f64,
    ) -> Self {
        Self {
            module,
            results,
            process_id,
            module_ratio,
        }
    }

    /// Results of the maintenance aggregate (no backing process)
    pub fn for_maintenance(results: Vec<IndicatorResult>) -> Self {
        Self::new(Module::maintenance(), results, None, 1.0)
    }

    pub fn module(&self) -> Module {
        self.module
    }

    pub fn stage(&self) -> Stage {
        self.module.stage()
    }

    pub fn process_id(&self) -> Option<&str> {
        self.process_id.as_deref()
    }

    pub fn module_ratio(&self) -> f64 {
        self.module_ratio
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn value(&self, indicator: &str) -> Option<f64> {
        self.results
            .iter()
            .find(|r| r.indicator == indicator)
            .and_then(|r| r.value)
    }

    /// Same values reported under another module
    pub fn change_module(mut self, module: Module) -> Self {
        self.module = module;
        self
    }

    /// Sum of both result sets per indicator; module, process and ratio of `self` are kept
    pub fn add(&self, other: &IndicatorResults) -> Self {
        let mut results = self.results.clone();

        for theirs in &other.results {
            match results.iter_mut().find(|r| r.indicator == theirs.indicator) {
                Some(ours) => {
                    ours.value = match (ours.value, theirs.value) {
                        (None, None) => None,
                        (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
                    };
                }
                None => results.push(theirs.clone()),
            }
        }

        Self {
            module: self.module,
            results,
            process_id: self.process_id.clone(),
            module_ratio: self.module_ratio,
        }
    }
}

impl<'a> IntoIterator for &'a IndicatorResults {
    type Item = &'a IndicatorResult;
    type IntoIter = std::slice::Iter<'a, IndicatorResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
