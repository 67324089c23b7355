//! Calculators turning process life cycles and quantities into LCA results

use tracing::{debug, error, warn};

use super::{
    CalcError, Indicator, IndicatorResult, IndicatorResults, LifeCycleUsages, Module, Process,
    ProcessLifeCycle, ProcessLifeCycleLcaResults, Quantity, Stage, Unit,
};

/// Computes indicator results of a single process
#[derive(Debug, Clone, Copy)]
pub struct ProcessLcaCalculator<'a> {
    indicators: &'a [Indicator],
}

impl<'a> ProcessLcaCalculator<'a> {
    pub fn new(indicators: &'a [Indicator]) -> Self {
        Self { indicators }
    }

    /// Scale the process' indicator values to `quantity`
    ///
    /// The quantity is converted into the process reference unit and weighted
    /// with the module ratio. PET is derived from the primary energy
    /// indicators.
    pub fn compute(
        &self,
        life_cycle: &ProcessLifeCycle,
        process: &Process,
        quantity: &Quantity,
    ) -> Result<IndicatorResults, CalcError> {
        if !life_cycle.has_process(&process.id) {
            return Err(CalcError::ProcessNotFoundInLifeCycle {
                process: process.id.clone(),
                process_config: life_cycle.process_config_id().to_string(),
            });
        }

        let module_ratio = process.module_ratio();
        let converted = module_ratio
            * life_cycle
                .converter()
                .convert(quantity.value(), quantity.unit(), &process.ref_unit)?;

        let ref_value = if process.ref_value > 0.0 {
            process.ref_value
        } else {
            warn!(process = %process.id, ref_value = process.ref_value, "invalid reference value, using 1");
            1.0
        };

        debug!(
            process_config = life_cycle.process_config_id(),
            process = %process.id,
            module = %process.module,
            %quantity,
            converted,
            ref_unit = %process.ref_unit,
            "computing process"
        );

        let mut results = Vec::with_capacity(self.indicators.len());
        let mut pet_index = None;
        let mut pet = 0.0;

        for indicator in self.indicators {
            if indicator.is_pet() {
                pet_index = Some(results.len());
                results.push(IndicatorResult::new(&indicator.ident, None));
                continue;
            }

            let value = process
                .indicators
                .get(&indicator.ident)
                .map(|v| v * converted / ref_value);

            if indicator.is_pet_component() {
                pet += value.unwrap_or(0.0);
            }

            results.push(IndicatorResult::new(&indicator.ident, value));
        }

        let pet_index = pet_index.ok_or(CalcError::MissingPetIndicator)?;
        results[pet_index] = IndicatorResult::new(&self.indicators[pet_index].ident, Some(pet));

        Ok(IndicatorResults::new(
            process.module,
            results,
            Some(process.id.clone()),
            module_ratio,
        ))
    }
}

/// Service life of a component in years
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsefulLife {
    pub life_time: u32,
    pub delay: u32,
}

impl UsefulLife {
    pub fn new(life_time: u32, delay: u32) -> Self {
        Self { life_time, delay }
    }
}

/// Number of times a component is replaced within the project life time
#[derive(Debug, Clone, Copy)]
pub struct NumberOfReplacementsCalculator {
    project_life_time: u32,
}

impl NumberOfReplacementsCalculator {
    pub fn new(project_life_time: u32) -> Self {
        Self { project_life_time }
    }

    /// New components are built once and replaced whenever they wear out
    /// before the project ends. Extant components are only replaced, starting
    /// after their delay.
    pub fn compute(&self, useful_life: UsefulLife, is_extant: bool) -> u32 {
        if useful_life.life_time == 0 {
            return 0;
        }

        let remaining = self.project_life_time.saturating_sub(useful_life.delay);
        if remaining == 0 {
            return 0;
        }

        let cycles = remaining.div_ceil(useful_life.life_time);
        if is_extant {
            cycles
        } else {
            cycles.saturating_sub(1)
        }
    }
}

/// Mass of `quantity` in kg, 0 when no conversion into kg exists
pub fn component_mass(life_cycle: &ProcessLifeCycle, quantity: &Quantity) -> f64 {
    match life_cycle
        .converter()
        .convert(quantity.value(), quantity.unit(), &Unit::kg())
    {
        Ok(mass) => mass,
        Err(err) => {
            error!(process_config = life_cycle.process_config_id(), "mass calculation failed: {}", err);
            0.0
        }
    }
}

/// Computes the LCA of an element component over the project life time
#[derive(Debug, Clone, Copy)]
pub struct ElementComponentLcaCalculator<'a> {
    process_calculator: ProcessLcaCalculator<'a>,
    usages: &'a LifeCycleUsages,
    replacements: NumberOfReplacementsCalculator,
}

impl<'a> ElementComponentLcaCalculator<'a> {
    pub fn new(indicators: &'a [Indicator], usages: &'a LifeCycleUsages, project_life_time: u32) -> Self {
        Self {
            process_calculator: ProcessLcaCalculator::new(indicators),
            usages,
            replacements: NumberOfReplacementsCalculator::new(project_life_time),
        }
    }

    pub fn compute(
        &self,
        life_cycle: &ProcessLifeCycle,
        quantity: &Quantity,
        useful_life: UsefulLife,
        is_extant: bool,
    ) -> Result<ProcessLifeCycleLcaResults, CalcError> {
        let mass = component_mass(life_cycle, quantity);
        let mut results = ProcessLifeCycleLcaResults::new(quantity.clone(), Some(mass));

        for process in life_cycle.processes() {
            if Self::is_excluded(process.module) {
                continue;
            }
            results.add_process_indicator_results(
                self.process_calculator.compute(life_cycle, process, quantity)?,
            );
        }

        let num_replacements = self.replacements.compute(useful_life, is_extant);
        results.aggregate_maintenance(num_replacements, self.usages);

        Ok(results)
    }

    /// Usage stage, transport and construction/deconstruction modules are not
    /// part of a component's LCA
    fn is_excluded(module: Module) -> bool {
        module.is_usage() || matches!(module, Module::A4 | Module::A5 | Module::C1 | Module::C2)
    }
}

/// Computes the production impact an extant component avoids
///
/// Extant components keep their production modules zeroed in the cache. This
/// yields what building them new would have cost.
#[derive(Debug, Clone, Copy)]
pub struct ExtantSavingsCalculator<'a> {
    process_calculator: ProcessLcaCalculator<'a>,
}

impl<'a> ExtantSavingsCalculator<'a> {
    pub fn new(indicators: &'a [Indicator]) -> Self {
        Self {
            process_calculator: ProcessLcaCalculator::new(indicators),
        }
    }

    pub fn compute(
        &self,
        life_cycle: &ProcessLifeCycle,
        quantity: &Quantity,
    ) -> Result<ProcessLifeCycleLcaResults, CalcError> {
        let mut results = ProcessLifeCycleLcaResults::new(quantity.clone(), None);

        for process in life_cycle.processes() {
            if process.module.stage() != Stage::Prod
                || ElementComponentLcaCalculator::is_excluded(process.module)
            {
                continue;
            }
            results.add_process_indicator_results(
                self.process_calculator.compute(life_cycle, process, quantity)?,
            );
        }

        Ok(results)
    }
}

/// Computes usage stage results of final energy demands and supplies
#[derive(Debug, Clone, Copy)]
pub struct FinalEnergyLcaCalculator<'a> {
    process_calculator: ProcessLcaCalculator<'a>,
}

impl<'a> FinalEnergyLcaCalculator<'a> {
    pub fn new(indicators: &'a [Indicator]) -> Self {
        Self {
            process_calculator: ProcessLcaCalculator::new(indicators),
        }
    }

    pub fn compute(
        &self,
        life_cycle: &ProcessLifeCycle,
        quantity: &Quantity,
    ) -> Result<ProcessLifeCycleLcaResults, CalcError> {
        let mut results = ProcessLifeCycleLcaResults::new(quantity.clone(), None);

        for process in life_cycle.usage_processes() {
            results.add_process_indicator_results(
                self.process_calculator.compute(life_cycle, process, quantity)?,
            );
        }

        Ok(results)
    }
}

/// Computes transport results
///
/// EN 15804 databases model transports as module A4, older databases put
/// them into the usage stage.
#[derive(Debug, Clone, Copy)]
pub struct TransportLcaCalculator<'a> {
    process_calculator: ProcessLcaCalculator<'a>,
    en15804_compliant: bool,
}

impl<'a> TransportLcaCalculator<'a> {
    pub fn new(indicators: &'a [Indicator], en15804_compliant: bool) -> Self {
        Self {
            process_calculator: ProcessLcaCalculator::new(indicators),
            en15804_compliant,
        }
    }

    pub fn compute(
        &self,
        life_cycle: &ProcessLifeCycle,
        quantity: &Quantity,
    ) -> Result<ProcessLifeCycleLcaResults, CalcError> {
        let mut results = ProcessLifeCycleLcaResults::new(quantity.clone(), None);

        for process in life_cycle.processes() {
            let applies = if self.en15804_compliant {
                process.module.is_a4()
            } else {
                process.module.is_usage()
            };
            if !applies {
                continue;
            }
            results.add_process_indicator_results(
                self.process_calculator.compute(life_cycle, process, quantity)?,
            );
        }

        Ok(results)
    }
}
