//! Process library documents: indicators, process databases and process
//! configurations

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lca::{Conversion, Converter, Indicator, Process, ProcessLifeCycle};

/// `kind: indicators` - the indicator catalog, in reporting order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorCatalog {
    pub indicators: Vec<Indicator>,
}

/// `kind: process_db` - a versioned LCA database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDb {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Modules follow EN 15804 (A1..D) rather than legacy stages
    #[serde(default = "default_true")]
    pub en15804_compliant: bool,
}

fn default_true() -> bool {
    true
}

/// `kind: process_config` - a building material or energy carrier with its
/// processes per database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Gross to net calorific value ratio for energy carriers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f_hs_hi: Option<f64>,

    /// Invert results (energy supplies that offset demand)
    #[serde(default)]
    pub invert_values: bool,

    #[serde(default)]
    pub conversions: Vec<Conversion>,

    /// Process database id -> processes
    #[serde(default)]
    pub life_cycles: BTreeMap<String, Vec<Process>>,
}

impl ProcessConfig {
    pub fn converter(&self) -> Converter {
        Converter::new(self.id.clone(), self.conversions.clone())
    }

    pub fn life_cycle(&self, process_db: &str) -> Option<ProcessLifeCycle> {
        self.life_cycles.get(process_db).map(|processes| {
            ProcessLifeCycle::new(
                self.id.clone(),
                self.name.clone(),
                processes.clone(),
                self.converter(),
            )
            .with_energy_efficiency(self.f_hs_hi)
            .with_inverted_values(self.invert_values)
        })
    }
}

/// `kind: element_types` - display names of DIN 276 codes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementTypeNames {
    pub names: BTreeMap<String, String>,
}
