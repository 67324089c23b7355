//! Life cycle usages: which modules count towards construction, maintenance
//! and energy demand of a project

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Module, Stage};

/// Usage flags of one module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeCycleUsage {
    pub module: Module,

    #[serde(default)]
    pub construction: bool,

    #[serde(default)]
    pub maintenance: bool,

    #[serde(default)]
    pub energy_demand: bool,
}

impl LifeCycleUsage {
    pub fn new(module: Module, construction: bool, maintenance: bool, energy_demand: bool) -> Self {
        Self {
            module,
            construction,
            maintenance,
            energy_demand,
        }
    }

    pub fn module(&self) -> Module {
        self.module
    }

    pub fn apply_in_construction(&self) -> bool {
        self.construction || self.module.is_maintenance()
    }

    pub fn apply_in_maintenance(&self) -> bool {
        self.maintenance
    }

    pub fn apply_in_energy_demand(&self) -> bool {
        self.energy_demand
    }

    pub fn apply_in_totals(&self) -> bool {
        self.apply_in_construction() || self.apply_in_energy_demand()
    }
}

/// Usage flags of all modules of a project
#[derive(Debug, Clone, PartialEq)]
pub struct LifeCycleUsages {
    usages: BTreeMap<Module, LifeCycleUsage>,
}

impl Default for LifeCycleUsages {
    fn default() -> Self {
        let construction = [
            Module::Legacy(Stage::Prod),
            Module::A1,
            Module::A2,
            Module::A3,
            Module::A13,
            Module::Legacy(Stage::Eol),
            Module::C3,
            Module::C4,
        ];

        let mut usages: Vec<LifeCycleUsage> = construction
            .into_iter()
            .map(|m| LifeCycleUsage::new(m, true, true, false))
            .collect();
        usages.push(LifeCycleUsage::new(Module::D, false, false, false));
        usages.push(LifeCycleUsage::new(Module::Legacy(Stage::Op), false, false, true));
        usages.push(LifeCycleUsage::new(Module::B6, false, false, true));

        Self::new(usages)
    }
}

impl LifeCycleUsages {
    pub fn new(usages: impl IntoIterator<Item = LifeCycleUsage>) -> Self {
        Self {
            usages: usages.into_iter().map(|u| (u.module, u)).collect(),
        }
    }

    /// Defaults with the given usages replacing those of the same module
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = LifeCycleUsage>) -> Self {
        for usage in overrides {
            self.usages.insert(usage.module, usage);
        }
        self
    }

    pub fn get(&self, module: Module) -> Option<&LifeCycleUsage> {
        self.usages.get(&module)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LifeCycleUsage> {
        self.usages.values()
    }

    pub fn module_is_applied_in_construction(&self, module: Module) -> bool {
        self.usages
            .get(&module)
            .map(|u| u.apply_in_construction())
            .unwrap_or_else(|| module.is_maintenance())
    }

    pub fn module_is_applied_in_maintenance(&self, module: Module) -> bool {
        self.usages
            .get(&module)
            .is_some_and(|u| u.apply_in_maintenance())
    }

    pub fn module_is_applied_in_energy_demand(&self, module: Module) -> bool {
        self.usages
            .get(&module)
            .is_some_and(|u| u.apply_in_energy_demand())
    }

    pub fn module_is_applied_in_totals(&self, module: Module) -> bool {
        self.module_is_applied_in_construction(module)
            || self.module_is_applied_in_energy_demand(module)
    }

    /// Whether module D contributes to construction or maintenance
    pub fn has_stage_rec(&self) -> bool {
        self.module_is_applied_in_construction(Module::D)
            || self.module_is_applied_in_maintenance(Module::D)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let usages = LifeCycleUsages::default();
        assert!(usages.module_is_applied_in_construction(Module::A13));
        assert!(usages.module_is_applied_in_maintenance(Module::C4));
        assert!(!usages.module_is_applied_in_construction(Module::D));
        assert!(!usages.module_is_applied_in_maintenance(Module::D));
        assert!(usages.module_is_applied_in_energy_demand(Module::B6));
        assert!(!usages.module_is_applied_in_totals(Module::A4));
        assert!(!usages.has_stage_rec());
    }

    #[test]
    fn test_maintenance_always_applied_in_totals() {
        let usages = LifeCycleUsages::new([]);
        assert!(usages.module_is_applied_in_construction(Module::maintenance()));
        assert!(usages.module_is_applied_in_totals(Module::maintenance()));
        assert!(!usages.module_is_applied_in_totals(Module::A13));
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let usages = LifeCycleUsages::default().with_overrides([
            LifeCycleUsage::new(Module::D, true, false, false),
            LifeCycleUsage::new(Module::A4, true, false, false),
        ]);
        assert!(usages.module_is_applied_in_totals(Module::D));
        assert!(usages.module_is_applied_in_totals(Module::A4));
        assert!(usages.has_stage_rec());
        assert!(usages.module_is_applied_in_totals(Module::A13));
    }
}
