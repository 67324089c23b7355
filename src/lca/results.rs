//! LCA results of one process life cycle applied to one quantity

use super::{IndicatorResult, IndicatorResults, LifeCycleUsages, Module, Quantity, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
enum ResultKey {
    Process(String),
    A13Aggregation,
    Maintenance,
}

/// Indicator results keyed by process, plus the `A1-3` and maintenance aggregates
#[derive(Debug, Clone)]
pub struct ProcessLifeCycleLcaResults {
    quantity: Quantity,
    mass: Option<f64>,
    results: Vec<(ResultKey, IndicatorResults)>,
    num_replacements: u32,
    a13_has_been_aggregated: bool,
}

impl ProcessLifeCycleLcaResults {
    pub fn new(quantity: Quantity, mass: Option<f64>) -> Self {
        Self {
            quantity,
            mass,
            results: Vec::new(),
            num_replacements: 0,
            a13_has_been_aggregated: false,
        }
    }

    pub fn quantity(&self) -> &Quantity {
        &self.quantity
    }

    pub fn mass(&self) -> Option<f64> {
        self.mass
    }

    pub fn num_replacements(&self) -> u32 {
        self.num_replacements
    }

    pub fn a13_has_been_aggregated(&self) -> bool {
        self.a13_has_been_aggregated
    }

    pub fn indicator_results(&self) -> impl Iterator<Item = &IndicatorResults> {
        self.results.iter().map(|(_, r)| r)
    }

    pub fn into_indicator_results(self) -> Vec<IndicatorResults> {
        self.results.into_iter().map(|(_, r)| r).collect()
    }

    pub fn has_process(&self, process_id: &str) -> bool {
        self.find(&ResultKey::Process(process_id.to_string())).is_some()
    }

    pub fn module_ratio_for(&self, process_id: &str) -> Option<f64> {
        self.find(&ResultKey::Process(process_id.to_string()))
            .map(|r| r.module_ratio())
    }

    /// `(process id, module ratio)` of every process that contributed
    pub fn process_module_ratios(&self) -> impl Iterator<Item = (&str, f64)> {
        self.results.iter().filter_map(|(key, r)| match key {
            ResultKey::Process(id) => Some((id.as_str(), r.module_ratio())),
            _ => None,
        })
    }

    /// Add the results of one process
    ///
    /// Results of `A1`, `A2` and `A3` are additionally summed into an `A1-3`
    /// aggregate, which from then on stands in for the single modules.
    pub fn add_process_indicator_results(&mut self, results: IndicatorResults) {
        if results.module().is_a1_a2_or_a3() {
            let aggregated = match self.find(&ResultKey::A13Aggregation) {
                Some(existing) => existing.add(&results),
                None => IndicatorResults::new(
                    Module::A13,
                    results.iter().cloned().collect(),
                    results.process_id().map(String::from),
                    results.module_ratio(),
                ),
            };
            self.upsert(ResultKey::A13Aggregation, aggregated);
            self.a13_has_been_aggregated = true;
        }

        let key = ResultKey::Process(results.process_id().unwrap_or_default().to_string());
        self.upsert(key, results);
    }

    /// Sum production, end-of-life and recycling results applied in maintenance,
    /// multiplied by the number of replacements, into a `maint` result
    pub fn aggregate_maintenance(&mut self, num_replacements: u32, usages: &LifeCycleUsages) {
        self.num_replacements = num_replacements;

        let mut maintenance: Vec<(String, f64)> = Vec::new();

        for (key, results) in &self.results {
            if *key == ResultKey::Maintenance {
                continue;
            }
            if !results
                .stage()
                .is_one_of(&[Stage::Prod, Stage::Eol, Stage::Rec])
            {
                continue;
            }
            if !usages.module_is_applied_in_maintenance(results.module()) {
                continue;
            }
            if self.a13_has_been_aggregated && results.module().is_a1_a2_or_a3() {
                continue;
            }

            for result in results {
                let idx = match maintenance
                    .iter()
                    .position(|(ident, _)| ident == result.indicator())
                {
                    Some(idx) => idx,
                    None => {
                        maintenance.push((result.indicator().to_string(), 0.0));
                        maintenance.len() - 1
                    }
                };

                if num_replacements > 0 {
                    maintenance[idx].1 += result.value().unwrap_or(0.0) * f64::from(num_replacements);
                }
            }
        }

        let values = maintenance
            .into_iter()
            .map(|(ident, value)| IndicatorResult::new(ident, Some(value)))
            .collect();

        self.upsert(ResultKey::Maintenance, IndicatorResults::for_maintenance(values));
    }

    fn find(&self, key: &ResultKey) -> Option<&IndicatorResults> {
        self.results.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    fn upsert(&mut self, key: ResultKey, results: IndicatorResults) {
        match self.results.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = results,
            None => self.results.push((key, results)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lca::{LifeCycleUsage, Unit};

    fn usages() -> LifeCycleUsages {
        LifeCycleUsages::new([
            LifeCycleUsage::new(Module::A1, false, true, false),
            LifeCycleUsage::new(Module::A2, false, true, false),
            LifeCycleUsage::new(Module::A3, false, true, false),
            LifeCycleUsage::new(Module::A13, false, true, false),
            LifeCycleUsage::new(Module::C3, false, true, false),
            LifeCycleUsage::new(Module::D, false, false, false),
        ])
    }

    fn results(module: Module, process: &str, ratio: f64) -> IndicatorResults {
        IndicatorResults::new(
            module,
            IndicatorResult::values_from_map([("1", 23.0), ("2", 12.0)]),
            Some(process.to_string()),
            ratio,
        )
    }

    fn lca_results() -> ProcessLifeCycleLcaResults {
        let mut lca = ProcessLifeCycleLcaResults::new(Quantity::new(1.0, Unit::piece()), Some(2.0));
        lca.add_process_indicator_results(results(Module::A13, "1234", 1.0));
        lca.add_process_indicator_results(results(Module::C3, "5678", 0.5));
        lca.add_process_indicator_results(results(Module::D, "9012", 1.0));
        lca
    }

    fn single_and_aggregated_a13() -> ProcessLifeCycleLcaResults {
        let mut lca = ProcessLifeCycleLcaResults::new(Quantity::new(1.0, Unit::piece()), Some(2.0));
        lca.add_process_indicator_results(results(Module::A1, "1234", 1.0));
        lca.add_process_indicator_results(results(Module::A2, "1235", 1.0));
        lca.add_process_indicator_results(results(Module::A3, "1236", 1.0));
        lca
    }

    fn maintenance(lca: &ProcessLifeCycleLcaResults) -> &IndicatorResults {
        lca.indicator_results()
            .find(|r| r.module().is_maintenance())
            .unwrap()
    }

    #[test]
    fn test_initial_state() {
        let lca = lca_results();
        assert_eq!(lca.quantity().value(), 1.0);
        assert_eq!(lca.mass(), Some(2.0));
        assert_eq!(lca.indicator_results().count(), 3);
        assert!(!lca.a13_has_been_aggregated());

        let ratios: Vec<_> = lca.process_module_ratios().collect();
        assert_eq!(ratios, vec![("1234", 1.0), ("5678", 0.5), ("9012", 1.0)]);
    }

    #[test]
    fn test_has_process_and_ratio() {
        let lca = lca_results();
        assert!(lca.has_process("1234"));
        assert!(!lca.has_process("12345"));
        assert_eq!(lca.module_ratio_for("5678"), Some(0.5));
        assert_eq!(lca.module_ratio_for("nope"), None);
    }

    #[test]
    fn test_aggregate_maintenance_without_replacements_yields_zeros() {
        let mut lca = lca_results();
        lca.aggregate_maintenance(0, &usages());

        let maint = maintenance(&lca);
        assert_eq!(maint.process_id(), None);
        assert_eq!(maint.value("1"), Some(0.0));
        assert_eq!(maint.value("2"), Some(0.0));
    }

    #[test]
    fn test_aggregate_maintenance_adds_a13_and_c3_but_ignores_d() {
        let mut lca = lca_results();
        lca.aggregate_maintenance(1, &usages());

        let maint = maintenance(&lca);
        assert_eq!(maint.value("1"), Some(46.0));
        assert_eq!(maint.value("2"), Some(24.0));
        assert_eq!(lca.num_replacements(), 1);
    }

    #[test]
    fn test_aggregate_maintenance_scales_with_replacements() {
        let mut lca = lca_results();
        lca.aggregate_maintenance(3, &usages());

        let maint = maintenance(&lca);
        assert_eq!(maint.value("1"), Some(3.0 * 46.0));
        assert_eq!(maint.value("2"), Some(3.0 * 24.0));
    }

    #[test]
    fn test_aggregate_maintenance_does_not_count_a13_twice() {
        let mut lca = single_and_aggregated_a13();
        lca.aggregate_maintenance(1, &usages());

        let maint = maintenance(&lca);
        assert_eq!(maint.value("1"), Some(23.0 * 3.0));
        assert_eq!(maint.value("2"), Some(12.0 * 3.0));
    }

    #[test]
    fn test_a1_a2_a3_are_aggregated_into_a13() {
        let lca = single_and_aggregated_a13();
        assert!(lca.a13_has_been_aggregated());

        let a13 = lca
            .indicator_results()
            .find(|r| r.module() == Module::A13)
            .unwrap();
        assert_eq!(a13.value("1"), Some(69.0));
        assert_eq!(a13.value("2"), Some(36.0));
        assert_eq!(a13.process_id(), Some("1234"));
        assert_eq!(lca.indicator_results().count(), 4);
    }
}
