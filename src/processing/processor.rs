//! Computes variants of the model into the result cache

use miette::{miette, Result};
use tracing::{debug, warn};

use super::{ComputeStats, ExtantSavings, LcaProcessingObserver};
use crate::core::cache::{CacheScope, ResultCache, UpdateStats};
use crate::lca::{
    ElementComponentLcaCalculator, ExtantSavingsCalculator, FinalEnergyLcaCalculator,
    LifeCycleUsages, Module, ProcessLifeCycleLcaResults, Quantity, Stage, TransportLcaCalculator,
    Unit, UsefulLife,
};
use crate::model::{
    Component, Element, FinalEnergyDemand, FinalEnergyRefModel, FinalEnergySupply, Model,
    ProcessDb, ProjectSpec, Transport, Variant,
};

/// Everything a variant computation needs besides the processor itself
struct VariantContext<'a> {
    variant: &'a Variant,
    project: &'a ProjectSpec,
    db: &'a ProcessDb,
    scope: CacheScope,
    usages: LifeCycleUsages,
}

/// Writes LCA results of model variants into a [`ResultCache`]
pub struct LcaProcessor<'a> {
    cache: &'a ResultCache,
    model: &'a Model,
    observers: Vec<Box<dyn LcaProcessingObserver + 'a>>,
}

impl<'a> LcaProcessor<'a> {
    pub fn new(cache: &'a ResultCache, model: &'a Model) -> Self {
        Self {
            cache,
            model,
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: impl LcaProcessingObserver + 'a) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Recompute all raw results of a variant
    ///
    /// Leaves the touched items outdated; run [`Self::update_cache`] to
    /// aggregate them.
    pub fn compute_project_variant(&mut self, variant_id: &str) -> Result<ComputeStats> {
        let model = self.model;
        let variant = model.variant(variant_id)?;
        let project = model.project_of(variant)?;
        let db = model.process_db(&project.process_db).ok_or_else(|| {
            miette!(
                help = "add a 'kind: process_db' document with this id to the library",
                "process database '{}' of project '{}' is not defined",
                project.process_db,
                project.id
            )
        })?;

        let ctx = VariantContext {
            variant,
            project,
            db,
            scope: CacheScope::new(&project.id, &variant.id),
            usages: project.usages(),
        };

        let cache = self.cache;
        let stats = cache.atomically("compute_variant", |cache| {
            let mut stats = ComputeStats::default();

            cache.store_project_settings(&project.id, &ctx.usages)?;
            cache.store_indicator_catalog(model.indicators())?;
            cache.ensure_variant_item(&ctx.scope)?;

            let mut stored = Vec::new();
            for element in variant.top_level_elements() {
                self.compute_element(&ctx, element, None, &mut stored, &mut stats)?;
            }

            // Elements skipped above must not survive from an earlier run
            let keep: Vec<&str> = stored.iter().map(String::as_str).collect();
            let pruned = cache.remove_elements_except(&ctx.scope, &keep)?;
            if !pruned.is_empty() {
                debug!(variant = %variant.id, types = ?pruned, "element types lost elements");
            }
            stats.pruned_element_types = pruned.len();

            self.compute_final_energy(&ctx, &mut stats)?;
            self.compute_transports(&ctx, &mut stats)?;

            if let Some(hash) = model.variant_source_hash(&variant.id) {
                cache.record_variant_source(&ctx.scope, &hash)?;
            }

            Ok(stats)
        })?;

        for observer in &mut self.observers {
            observer.after_recomputation(variant, &stats);
        }

        Ok(stats)
    }

    fn compute_element(
        &mut self,
        ctx: &VariantContext<'_>,
        element: &Element,
        composite_item_id: Option<i64>,
        stored: &mut Vec<String>,
        stats: &mut ComputeStats,
    ) -> Result<i64> {
        for observer in &mut self.observers {
            observer.before_element_processing(ctx.variant, element);
        }

        let item_id = self.cache.store_element(&ctx.scope, element, composite_item_id)?;
        stored.push(element.id.clone());
        stats.elements += 1;

        if element.is_composite() {
            self.cache.remove_element_components_except(item_id, &[])?;

            for sub_id in &element.elements {
                match ctx.variant.element(sub_id) {
                    None => {
                        warn!(element = %element.id, sub_element = %sub_id, "unknown sub-element, skipped");
                    }
                    Some(sub) if sub.is_composite() => {
                        warn!(element = %element.id, sub_element = %sub_id, "nested composite element, skipped");
                    }
                    Some(sub) => {
                        self.compute_element(ctx, sub, Some(item_id), stored, stats)?;
                    }
                }
            }
        } else {
            let keep: Vec<&str> = element.components.iter().map(|c| c.id.as_str()).collect();
            self.cache.remove_element_components_except(item_id, &keep)?;

            for component in &element.components {
                self.compute_element_component(ctx, element, item_id, component, stats)?;
            }
        }

        for observer in &mut self.observers {
            observer.after_element_processing(ctx.variant, element, item_id);
        }

        Ok(item_id)
    }

    fn compute_element_component(
        &self,
        ctx: &VariantContext<'_>,
        element: &Element,
        element_item_id: i64,
        component: &Component,
        stats: &mut ComputeStats,
    ) -> Result<()> {
        self.cache.remove_element_component(&ctx.scope, &component.id)?;
        if !component.calc_lca {
            return Ok(());
        }

        let Some(quantity) = component.quantity_in(element) else {
            warn!(component = %component.id, "component has neither layer nor quantity");
            stats.components_failed += 1;
            return Ok(());
        };

        let Some(life_cycle) = self.model.life_cycle(&component.process_config, &ctx.db.id) else {
            warn!(
                component = %component.id,
                process_config = %component.process_config,
                process_db = %ctx.db.id,
                "no life cycle in process database"
            );
            stats.components_failed += 1;
            return Ok(());
        };

        let calculator = ElementComponentLcaCalculator::new(
            self.model.indicators(),
            &ctx.usages,
            ctx.project.life_time,
        );
        let useful_life = UsefulLife::new(component.life_time, component.life_time_delay);

        let results = match calculator.compute(&life_cycle, &quantity, useful_life, component.extant) {
            Ok(results) => results,
            Err(err) => {
                warn!(component = %component.id, "calculation failed: {}", err);
                stats.components_failed += 1;
                return Ok(());
            }
        };

        let item_id = self.cache.store_element_component(
            &ctx.scope,
            element_item_id,
            &component.id,
            &quantity,
            results.mass().unwrap_or(0.0),
            results.num_replacements(),
        )?;

        let a13_aggregated = results.a13_has_been_aggregated();
        for indicators in results.indicator_results() {
            let zero_values = component.extant && indicators.stage() == Stage::Prod;
            let is_partial = a13_aggregated && indicators.module().is_a1_a2_or_a3();
            self.cache
                .store_indicators(item_id, indicators, zero_values, is_partial)?;
        }

        stats.components += 1;
        Ok(())
    }

    fn compute_final_energy(&mut self, ctx: &VariantContext<'_>, stats: &mut ComputeStats) -> Result<()> {
        let variant_id = &ctx.variant.id;
        self.cache.remove_final_energy_demands(variant_id)?;
        self.cache.remove_final_energy_supplies(variant_id)?;
        self.cache.remove_final_energy_ref_models(variant_id)?;

        let calculator = FinalEnergyLcaCalculator::new(self.model.indicators());
        let life_time = f64::from(ctx.project.life_time);

        for demand in &ctx.variant.final_energy_demands {
            for observer in &mut self.observers {
                observer.before_final_energy_demand_processing(ctx.variant, demand);
            }

            let Some(results) = self.compute_demand(ctx, &calculator, demand, life_time) else {
                continue;
            };
            let stored = Quantity::new(demand.total(), Unit::kwh());
            let item_id = self
                .cache
                .store_final_energy_demand(&ctx.scope, &demand.id, &stored)?;
            for indicators in results.indicator_results() {
                self.cache.store_indicators(item_id, indicators, false, false)?;
            }
            stats.demands += 1;

            for observer in &mut self.observers {
                observer.after_final_energy_demand_processing(ctx.variant, demand, &results);
            }
        }

        for supply in &ctx.variant.final_energy_supplies {
            for observer in &mut self.observers {
                observer.before_final_energy_supply_processing(ctx.variant, supply);
            }

            let Some(results) = self.compute_supply(ctx, &calculator, supply, life_time) else {
                continue;
            };
            let stored = Quantity::new(supply.total(), Unit::kwh());
            let item_id = self
                .cache
                .store_final_energy_supply(&ctx.scope, &supply.id, &stored)?;
            for indicators in results.indicator_results() {
                let moved = indicators.clone().change_module(Module::D);
                self.cache.store_indicators(item_id, &moved, false, false)?;
            }
            stats.supplies += 1;

            for observer in &mut self.observers {
                observer.after_final_energy_supply_processing(ctx.variant, supply, &results);
            }
        }

        for ref_model in &ctx.variant.final_energy_ref_models {
            let Some(results) = self.compute_ref_model(ctx, &calculator, ref_model, life_time) else {
                continue;
            };
            let stored = Quantity::new(ref_model.total(), Unit::kwh());
            let item_id = self
                .cache
                .store_final_energy_ref_model(&ctx.scope, &ref_model.id, &stored)?;
            for indicators in results.indicator_results() {
                self.cache.store_indicators(item_id, indicators, false, false)?;
            }
            stats.ref_models += 1;
        }

        Ok(())
    }

    /// Demand over the project life time: qE / fHs/Hi × NGF × years
    fn compute_demand(
        &self,
        ctx: &VariantContext<'_>,
        calculator: &FinalEnergyLcaCalculator<'_>,
        demand: &FinalEnergyDemand,
        life_time: f64,
    ) -> Option<ProcessLifeCycleLcaResults> {
        let Some(life_cycle) = self.model.life_cycle(&demand.process_config, &ctx.db.id) else {
            warn!(demand = %demand.id, process_config = %demand.process_config, "no life cycle in process database");
            return None;
        };

        let value = demand.total() / life_cycle.energy_efficiency() * ctx.variant.ngf_en_ev * life_time;
        calculator
            .compute(&life_cycle, &Quantity::new(value, Unit::kwh()))
            .map_err(|err| warn!(demand = %demand.id, "calculation failed: {}", err))
            .ok()
    }

    /// Supply over the project life time, negative for inverting processes
    fn compute_supply(
        &self,
        ctx: &VariantContext<'_>,
        calculator: &FinalEnergyLcaCalculator<'_>,
        supply: &FinalEnergySupply,
        life_time: f64,
    ) -> Option<ProcessLifeCycleLcaResults> {
        let Some(life_cycle) = self.model.life_cycle(&supply.process_config, &ctx.db.id) else {
            warn!(supply = %supply.id, process_config = %supply.process_config, "no life cycle in process database");
            return None;
        };

        let sign = if life_cycle.invert_values() { -1.0 } else { 1.0 };
        let value = supply.total() * life_time * sign;
        calculator
            .compute(&life_cycle, &Quantity::new(value, Unit::kwh()))
            .map_err(|err| warn!(supply = %supply.id, "calculation failed: {}", err))
            .ok()
    }

    fn compute_ref_model(
        &self,
        ctx: &VariantContext<'_>,
        calculator: &FinalEnergyLcaCalculator<'_>,
        ref_model: &FinalEnergyRefModel,
        life_time: f64,
    ) -> Option<ProcessLifeCycleLcaResults> {
        let Some(process_config) = ctx.project.ref_model_processes.get(&ref_model.ident) else {
            warn!(ref_model = %ref_model.id, ident = %ref_model.ident, "no reference process configured, skipped");
            return None;
        };
        let Some(life_cycle) = self.model.life_cycle(process_config, &ctx.db.id) else {
            warn!(ref_model = %ref_model.id, %process_config, "no life cycle in process database");
            return None;
        };

        let value = ref_model.total() / life_cycle.energy_efficiency() * ctx.variant.ngf_en_ev * life_time;
        calculator
            .compute(&life_cycle, &Quantity::new(value, Unit::kwh()))
            .map_err(|err| warn!(ref_model = %ref_model.id, "calculation failed: {}", err))
            .ok()
    }

    fn compute_transports(&self, ctx: &VariantContext<'_>, stats: &mut ComputeStats) -> Result<()> {
        self.cache.remove_transport_means(&ctx.variant.id)?;

        let calculator = TransportLcaCalculator::new(self.model.indicators(), ctx.db.en15804_compliant);
        for transport in &ctx.variant.transports {
            self.compute_transport(ctx, &calculator, transport, stats)?;
        }
        Ok(())
    }

    fn compute_transport(
        &self,
        ctx: &VariantContext<'_>,
        calculator: &TransportLcaCalculator<'_>,
        transport: &Transport,
        stats: &mut ComputeStats,
    ) -> Result<()> {
        for mean in &transport.means {
            let Some(life_cycle) = self.model.life_cycle(&mean.process_config, &ctx.db.id) else {
                warn!(transport = %transport.id, mean = %mean.id, "no life cycle in process database");
                continue;
            };

            let quantity = mean.quantity(transport);
            let results = match calculator.compute(&life_cycle, &quantity) {
                Ok(results) => results,
                Err(err) => {
                    warn!(mean = %mean.id, "calculation failed: {}", err);
                    continue;
                }
            };

            let item_id = self
                .cache
                .store_transport_mean(&ctx.scope, &mean.id, &quantity, transport.calc_lca)?;
            for indicators in results.indicator_results() {
                self.cache.store_indicators(item_id, indicators, false, false)?;
            }
            stats.transport_means += 1;
        }
        Ok(())
    }

    /// Aggregate outdated items of a project
    ///
    /// With a variant, its root is re-aggregated even when nothing below it
    /// changed.
    pub fn update_cache(&mut self, project_id: &str, variant_id: Option<&str>) -> Result<UpdateStats> {
        if let Some(variant_id) = variant_id {
            self.cache.mark_variant_outdated(variant_id)?;
        }

        let stats = self.cache.update(project_id)?;
        for observer in &mut self.observers {
            observer.after_cache_update(project_id, &stats);
        }
        Ok(stats)
    }

    pub fn update_element_type_tree(&self, variant_id: &str, code: &str) -> Result<Option<UpdateStats>> {
        self.cache.update_element_type_tree(variant_id, code)
    }

    pub fn update_project_variant(&self, variant_id: &str) -> Result<Option<UpdateStats>> {
        self.cache.update_project_variant(variant_id)
    }

    /// Production impact avoided by the extant components of a variant
    ///
    /// Computed from the model on every call; nothing is cached.
    pub fn extant_savings(&self, variant_id: &str) -> Result<ExtantSavings> {
        let variant = self.model.variant(variant_id)?;
        let project = self.model.project_of(variant)?;
        let db = self.model.process_db(&project.process_db).ok_or_else(|| {
            miette!(
                "process database '{}' of project '{}' is not defined",
                project.process_db,
                project.id
            )
        })?;

        let module = if db.en15804_compliant {
            Module::A13
        } else {
            Module::Legacy(Stage::Prod)
        };
        let indicators = self.model.indicators();
        let calculator = ExtantSavingsCalculator::new(indicators);
        let mut savings = ExtantSavings::new(&variant.id, module, indicators);

        for element in &variant.elements {
            for component in element.components.iter().filter(|c| c.extant && c.calc_lca) {
                let Some(quantity) = component.quantity_in(element) else {
                    continue;
                };
                let Some(life_cycle) = self.model.life_cycle(&component.process_config, &db.id) else {
                    warn!(component = %component.id, "no life cycle in process database, no savings");
                    continue;
                };

                let results = match calculator.compute(&life_cycle, &quantity) {
                    Ok(results) => results,
                    Err(err) => {
                        warn!(component = %component.id, "savings calculation failed: {}", err);
                        continue;
                    }
                };

                for indicator_results in results.indicator_results().filter(|r| r.module() == module) {
                    for result in indicator_results.iter() {
                        savings.add(result.indicator(), result.value().unwrap_or(0.0));
                    }
                }
                savings.components += 1;
            }
        }

        savings.normalize(project.life_time, variant.ngf_en_ev);
        Ok(savings)
    }

    /// True when the variant was never computed or its sources changed since
    pub fn needs_recompute(&self, variant_id: &str) -> Result<bool> {
        let stored = self.cache.variant_source(variant_id)?;
        Ok(stored.is_none() || stored != self.model.variant_source_hash(variant_id))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    use super::*;
    use crate::core::cache::ItemType;
    use crate::model::tests::{sample_model, LIBRARY, VARIANT};

    fn computed(model: &Model) -> ResultCache {
        let cache = ResultCache::open_in_memory().unwrap();
        {
            let mut processor = LcaProcessor::new(&cache, model);
            processor.compute_project_variant("v1").unwrap();
            processor.update_cache("office", Some("v1")).unwrap();
        }
        cache
    }

    fn gwp_total(cache: &ResultCache) -> f64 {
        cache
            .total_effects("v1")
            .unwrap()
            .into_iter()
            .find(|t| t.indicator == "gwp")
            .unwrap()
            .value
    }

    fn element_gwp(cache: &ResultCache, element: &str) -> f64 {
        cache
            .element_effects("v1", element)
            .unwrap()
            .effects
            .into_iter()
            .find(|e| e.life_cycle == "total" && e.indicator == "gwp")
            .map(|e| e.value)
            .unwrap_or(0.0)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    fn model_with_variant(variant: &str) -> Model {
        Model::from_sources([
            (PathBuf::from("library/library.elca.yaml"), LIBRARY.to_string()),
            (PathBuf::from("variants/v1.elca.yaml"), variant.to_string()),
        ])
        .unwrap()
    }

    #[test]
    fn test_sample_variant_totals() {
        let model = sample_model();
        let cache = computed(&model);

        assert_close(element_gwp(&cache, "wall"), 7160.0);
        assert_close(element_gwp(&cache, "facade"), 7160.0);
        assert_close(gwp_total(&cache), 70140.0);
        assert_eq!(cache.count_outdated("office").unwrap(), 0);
    }

    #[test]
    fn test_final_energy_and_transport_items() {
        let model = sample_model();
        let cache = computed(&model);

        let energy = cache.final_energy_effects("v1").unwrap();
        let heat = energy
            .iter()
            .find(|e| e.id == "heat" && e.indicator == "gwp")
            .unwrap();
        assert_eq!(heat.life_cycle, "B6");
        assert_close(heat.value, 62500.0);
        assert_close(heat.quantity, 50.0);

        let solar = energy
            .iter()
            .find(|e| e.id == "solar" && e.indicator == "gwp")
            .unwrap();
        assert_eq!(solar.life_cycle, "D");
        assert_close(solar.value, -25000.0);

        let reference = energy
            .iter()
            .find(|e| e.item_type == ItemType::FinalEnergyRefModel && e.indicator == "gwp")
            .unwrap();
        assert!(reference.is_virtual);
        assert_close(reference.value, 37500.0);

        let transports = cache.transport_effects("v1").unwrap();
        let truck = transports.iter().find(|t| t.indicator == "gwp").unwrap();
        assert_eq!(truck.life_cycle, "A4");
        assert_close(truck.value, 480.0);
        assert!(!truck.is_virtual);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let model = sample_model();
        let cache = computed(&model);
        let before = cache.statistics().unwrap().total_items;

        let mut processor = LcaProcessor::new(&cache, &model);
        let stats = processor.compute_project_variant("v1").unwrap();
        processor.update_cache("office", Some("v1")).unwrap();

        assert_eq!(stats.elements, 2);
        assert_eq!(stats.components, 2);
        assert_eq!(stats.pruned_element_types, 0);
        assert_eq!(cache.statistics().unwrap().total_items, before);
        assert_close(gwp_total(&cache), 70140.0);
        assert!(!processor.needs_recompute("v1").unwrap());
    }

    #[test]
    fn test_elements_removed_from_the_model_leave_the_cache() {
        let cache = computed(&sample_model());

        let without_facade = VARIANT.replace("    elements: [wall]\n", "");
        let without_wall = without_facade.replace(
            "  - id: wall\n    element_type: \"331\"",
            "  - id: slab\n    element_type: \"351\"",
        );
        let model = model_with_variant(&without_wall);
        assert!(LcaProcessor::new(&cache, &model).needs_recompute("v1").unwrap());

        let mut processor = LcaProcessor::new(&cache, &model);
        let stats = processor.compute_project_variant("v1").unwrap();
        processor.update_cache("office", Some("v1")).unwrap();

        assert_eq!(stats.pruned_element_types, 1);
        assert!(cache.element_item("v1", "wall").unwrap().is_none());
        assert!(cache.element_item("v1", "slab").unwrap().is_some());
        assert_close(element_gwp(&cache, "slab"), 7160.0);
        assert_close(gwp_total(&cache), 70140.0);
    }

    #[test]
    fn test_nested_composites_leave_the_cache() {
        let cache = computed(&sample_model());
        assert!(cache.element_item("v1", "facade").unwrap().is_some());

        let nested = VARIANT.replace(
            "elements:\n  - id: facade",
            "elements:\n  - id: shell\n    element_type: \"330\"\n    quantity: 1\n    ref_unit: piece\n    elements: [facade]\n  - id: facade",
        );
        let model = model_with_variant(&nested);
        let mut processor = LcaProcessor::new(&cache, &model);
        let stats = processor.compute_project_variant("v1").unwrap();
        processor.update_cache("office", Some("v1")).unwrap();

        assert_eq!(stats.elements, 1);
        assert!(cache.element_item("v1", "shell").unwrap().is_some());
        assert!(cache.element_item("v1", "facade").unwrap().is_none());
        assert!(cache.element_item("v1", "wall").unwrap().is_none());
        assert_close(gwp_total(&cache), 62980.0);
    }

    #[test]
    fn test_extant_savings() {
        let model = sample_model();
        let cache = ResultCache::open_in_memory().unwrap();
        let processor = LcaProcessor::new(&cache, &model);
        let none = processor.extant_savings("v1").unwrap();
        assert_eq!(none.components, 0);
        assert_eq!(none.value("gwp"), Some(0.0));

        let variant = VARIANT.replace(
            "layer: { size: 0.2 }, life_time: 80 }",
            "layer: { size: 0.2 }, life_time: 80, extant: true }",
        );
        let model = model_with_variant(&variant);
        let processor = LcaProcessor::new(&cache, &model);
        let savings = processor.extant_savings("v1").unwrap();

        // 20 m3 concrete at 300 kg CO2 per m3; C3 and D are not saved
        assert_eq!(savings.components, 1);
        assert_eq!(savings.module, Module::A13);
        assert_close(savings.value("gwp").unwrap(), 6000.0);
        assert_close(savings.value("pet").unwrap(), 32000.0);
        assert_close(savings.savings[0].per_m2a, 1.2);
    }

    #[derive(Default)]
    struct Counts {
        before_elements: usize,
        after_elements: usize,
        demands: usize,
        supplies: usize,
        recomputations: usize,
        updates: usize,
    }

    struct CountingObserver(Rc<RefCell<Counts>>);

    impl LcaProcessingObserver for CountingObserver {
        fn before_element_processing(&mut self, _: &Variant, _: &Element) {
            self.0.borrow_mut().before_elements += 1;
        }

        fn after_element_processing(&mut self, _: &Variant, _: &Element, _: i64) {
            self.0.borrow_mut().after_elements += 1;
        }

        fn after_final_energy_demand_processing(
            &mut self,
            _: &Variant,
            _: &FinalEnergyDemand,
            _: &ProcessLifeCycleLcaResults,
        ) {
            self.0.borrow_mut().demands += 1;
        }

        fn after_final_energy_supply_processing(
            &mut self,
            _: &Variant,
            _: &FinalEnergySupply,
            _: &ProcessLifeCycleLcaResults,
        ) {
            self.0.borrow_mut().supplies += 1;
        }

        fn after_recomputation(&mut self, _: &Variant, _: &ComputeStats) {
            self.0.borrow_mut().recomputations += 1;
        }

        fn after_cache_update(&mut self, _: &str, _: &UpdateStats) {
            self.0.borrow_mut().updates += 1;
        }
    }

    #[test]
    fn test_observers_are_notified() {
        let model = sample_model();
        let cache = ResultCache::open_in_memory().unwrap();
        let counts = Rc::new(RefCell::new(Counts::default()));

        let mut processor =
            LcaProcessor::new(&cache, &model).with_observer(CountingObserver(Rc::clone(&counts)));
        processor.compute_project_variant("v1").unwrap();
        processor.update_cache("office", Some("v1")).unwrap();

        let counts = counts.borrow();
        assert_eq!(counts.before_elements, 2);
        assert_eq!(counts.after_elements, 2);
        assert_eq!(counts.demands, 1);
        assert_eq!(counts.supplies, 1);
        assert_eq!(counts.recomputations, 1);
        assert_eq!(counts.updates, 1);
    }

    #[test]
    fn test_failed_components_are_counted_and_skipped() {
        let variant = VARIANT.replace(
            "{ id: wall-concrete, process_config: concrete, layer: { size: 0.2 }, life_time: 80 }",
            "{ id: wall-concrete, process_config: concrete, quantity: 1, unit: Stück, life_time: 80 }",
        );
        let model = model_with_variant(&variant);
        let cache = ResultCache::open_in_memory().unwrap();

        let mut processor = LcaProcessor::new(&cache, &model);
        let stats = processor.compute_project_variant("v1").unwrap();
        processor.update_cache("office", Some("v1")).unwrap();

        assert_eq!(stats.components, 1);
        assert_eq!(stats.components_failed, 1);
        assert_close(element_gwp(&cache, "wall"), 960.0);
    }

    #[test]
    fn test_extant_components_have_no_production_impact() {
        let variant = VARIANT.replace(
            "layer: { size: 0.2 }, life_time: 80 }",
            "layer: { size: 0.2 }, life_time: 80, extant: true }",
        );
        let model = model_with_variant(&variant);
        let cache = computed(&model);

        // A1-3 of the concrete is zeroed, its C3 (200) and one replacement (6200) remain
        assert_close(element_gwp(&cache, "wall"), 7360.0);
    }

    #[test]
    fn test_unknown_process_db_is_an_error() {
        let library = LIBRARY.replace("process_db: obd-2020\nlife_cycle_usages", "process_db: missing\nlife_cycle_usages");
        let model = Model::from_sources([
            (PathBuf::from("library/library.elca.yaml"), library),
            (PathBuf::from("variants/v1.elca.yaml"), VARIANT.to_string()),
        ])
        .unwrap();
        let cache = ResultCache::open_in_memory().unwrap();

        let err = LcaProcessor::new(&cache, &model)
            .compute_project_variant("v1")
            .unwrap_err();
        assert!(err.to_string().contains("process database 'missing'"));
        assert!(cache.variant_item("v1").unwrap().is_none());
    }
}
