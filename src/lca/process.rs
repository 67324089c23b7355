//! Processes and process life cycles

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Converter, Module, Unit};

/// A single LCA dataset: indicator values for one module per reference quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub module: Module,

    /// Share of the module this process covers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,

    #[serde(default = "default_ref_value")]
    pub ref_value: f64,

    pub ref_unit: Unit,

    /// Indicator ident -> value per `ref_value` `ref_unit`
    #[serde(default)]
    pub indicators: BTreeMap<String, f64>,
}

fn default_ref_value() -> f64 {
    1.0
}

impl Process {
    /// Ratio clamped to a usable value; anything outside `[0, 1]` counts as 1
    pub fn module_ratio(&self) -> f64 {
        match self.ratio {
            Some(ratio) if (0.0..=1.0).contains(&ratio) => ratio,
            _ => 1.0,
        }
    }
}

/// All processes of one process configuration within one process database
#[derive(Debug, Clone)]
pub struct ProcessLifeCycle {
    process_config_id: String,
    process_config_name: String,
    processes: Vec<Process>,
    converter: Converter,
    energy_efficiency: Option<f64>,
    invert_values: bool,
}

impl ProcessLifeCycle {
    pub fn new(
        process_config_id: impl Into<String>,
        process_config_name: impl Into<String>,
        processes: Vec<Process>,
        converter: Converter,
    ) -> Self {
        Self {
            process_config_id: process_config_id.into(),
            process_config_name: process_config_name.into(),
            processes,
            converter,
            energy_efficiency: None,
            invert_values: false,
        }
    }

    pub fn with_energy_efficiency(mut self, f_hs_hi: Option<f64>) -> Self {
        self.energy_efficiency = f_hs_hi;
        self
    }

    pub fn with_inverted_values(mut self, invert: bool) -> Self {
        self.invert_values = invert;
        self
    }

    pub fn process_config_id(&self) -> &str {
        &self.process_config_id
    }

    pub fn process_config_name(&self) -> &str {
        &self.process_config_name
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn has_process(&self, process_id: &str) -> bool {
        self.processes.iter().any(|p| p.id == process_id)
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Ratio of gross to net calorific value (fHs/Hi), 1 when unset or zero
    pub fn energy_efficiency(&self) -> f64 {
        match self.energy_efficiency {
            Some(f) if f != 0.0 => f,
            _ => 1.0,
        }
    }

    pub fn invert_values(&self) -> bool {
        self.invert_values
    }

    pub fn usage_processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.iter().filter(|p| p.module.is_usage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(ratio: Option<f64>) -> Process {
        Process {
            id: "p".into(),
            name: String::new(),
            module: Module::A13,
            ratio,
            ref_value: 1.0,
            ref_unit: Unit::kg(),
            indicators: BTreeMap::new(),
        }
    }

    #[test]
    fn test_module_ratio_clamped() {
        assert_eq!(process(None).module_ratio(), 1.0);
        assert_eq!(process(Some(0.4)).module_ratio(), 0.4);
        assert_eq!(process(Some(0.0)).module_ratio(), 0.0);
        assert_eq!(process(Some(1.5)).module_ratio(), 1.0);
        assert_eq!(process(Some(-0.1)).module_ratio(), 1.0);
    }

    #[test]
    fn test_energy_efficiency_defaults_to_one() {
        let lc = ProcessLifeCycle::new("gas", "Gas", vec![], Converter::default());
        assert_eq!(lc.energy_efficiency(), 1.0);
        assert_eq!(lc.clone().with_energy_efficiency(Some(0.0)).energy_efficiency(), 1.0);
        assert_eq!(lc.with_energy_efficiency(Some(1.11)).energy_efficiency(), 1.11);
    }

    #[test]
    fn test_process_from_yaml() {
        let p: Process = serde_yml::from_str(
            r#"
id: concrete-a13
module: A1-3
ref_unit: m3
indicators:
  gwp: 300.0
"#,
        )
        .unwrap();
        assert_eq!(p.module, Module::A13);
        assert_eq!(p.ref_value, 1.0);
        assert_eq!(p.indicators["gwp"], 300.0);
    }
}
