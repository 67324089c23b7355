//! Production impact avoided by extant components

use serde::Serialize;

use crate::lca::{Indicator, Module};

/// Savings of one indicator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSaving {
    pub indicator: String,
    pub name: String,
    pub unit: String,
    pub value: f64,
    /// `value` per m2 net floor area and year
    pub per_m2a: f64,
}

/// Summed savings of all extant components of a variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtantSavings {
    pub variant: String,
    /// Extant components that could be computed
    pub components: usize,
    /// `A1-3` for EN 15804 process databases, `prod` otherwise
    pub module: Module,
    pub savings: Vec<IndicatorSaving>,
}

impl ExtantSavings {
    pub(crate) fn new(variant: &str, module: Module, indicators: &[Indicator]) -> Self {
        Self {
            variant: variant.to_string(),
            components: 0,
            module,
            savings: indicators
                .iter()
                .map(|i| IndicatorSaving {
                    indicator: i.ident.clone(),
                    name: i.name.clone(),
                    unit: i.unit.clone(),
                    value: 0.0,
                    per_m2a: 0.0,
                })
                .collect(),
        }
    }

    pub(crate) fn add(&mut self, indicator: &str, value: f64) {
        if let Some(saving) = self.savings.iter_mut().find(|s| s.indicator == indicator) {
            saving.value += value;
        }
    }

    /// Derive the per m2 and year values; the divisor is at least 1
    pub(crate) fn normalize(&mut self, life_time: u32, ngf: f64) {
        let m2a = (f64::from(life_time) * ngf).max(1.0);
        for saving in &mut self.savings {
            saving.per_m2a = saving.value / m2a;
        }
    }

    pub fn value(&self, indicator: &str) -> Option<f64> {
        self.savings
            .iter()
            .find(|s| s.indicator == indicator)
            .map(|s| s.value)
    }
}
