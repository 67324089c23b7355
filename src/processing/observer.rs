//! Hooks into variant processing

use serde::Serialize;

use crate::core::cache::UpdateStats;
use crate::lca::ProcessLifeCycleLcaResults;
use crate::model::{Element, FinalEnergyDemand, FinalEnergySupply, Variant};

/// Counters of one variant computation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComputeStats {
    pub elements: usize,
    pub components: usize,
    pub components_failed: usize,
    pub demands: usize,
    pub supplies: usize,
    pub ref_models: usize,
    pub transport_means: usize,
    /// Element types that lost elements no longer in the model
    pub pruned_element_types: usize,
}

/// Receives notifications while a variant is processed
///
/// All hooks default to doing nothing.
pub trait LcaProcessingObserver {
    fn before_element_processing(&mut self, _variant: &Variant, _element: &Element) {}

    fn after_element_processing(&mut self, _variant: &Variant, _element: &Element, _item_id: i64) {}

    fn before_final_energy_demand_processing(&mut self, _variant: &Variant, _demand: &FinalEnergyDemand) {}

    fn after_final_energy_demand_processing(
        &mut self,
        _variant: &Variant,
        _demand: &FinalEnergyDemand,
        _results: &ProcessLifeCycleLcaResults,
    ) {
    }

    fn before_final_energy_supply_processing(&mut self, _variant: &Variant, _supply: &FinalEnergySupply) {}

    fn after_final_energy_supply_processing(
        &mut self,
        _variant: &Variant,
        _supply: &FinalEnergySupply,
        _results: &ProcessLifeCycleLcaResults,
    ) {
    }

    fn after_recomputation(&mut self, _variant: &Variant, _stats: &ComputeStats) {}

    fn after_cache_update(&mut self, _project_id: &str, _stats: &UpdateStats) {}
}

/// Logs processing progress through `tracing`
#[derive(Debug, Default)]
pub struct TracingObserver;

impl LcaProcessingObserver for TracingObserver {
    fn before_element_processing(&mut self, variant: &Variant, element: &Element) {
        tracing::trace!(variant = %variant.id, element = %element.id, "computing element");
    }

    fn after_final_energy_demand_processing(
        &mut self,
        variant: &Variant,
        demand: &FinalEnergyDemand,
        results: &ProcessLifeCycleLcaResults,
    ) {
        tracing::debug!(
            variant = %variant.id,
            demand = %demand.id,
            quantity = %results.quantity(),
            "computed final energy demand"
        );
    }

    fn after_final_energy_supply_processing(
        &mut self,
        variant: &Variant,
        supply: &FinalEnergySupply,
        results: &ProcessLifeCycleLcaResults,
    ) {
        tracing::debug!(
            variant = %variant.id,
            supply = %supply.id,
            quantity = %results.quantity(),
            "computed final energy supply"
        );
    }

    fn after_recomputation(&mut self, variant: &Variant, stats: &ComputeStats) {
        tracing::info!(
            variant = %variant.id,
            elements = stats.elements,
            components = stats.components,
            failed = stats.components_failed,
            "variant recomputed"
        );
    }

    fn after_cache_update(&mut self, project_id: &str, stats: &UpdateStats) {
        tracing::debug!(project = project_id, items = stats.items_updated, "totals aggregated");
    }
}
