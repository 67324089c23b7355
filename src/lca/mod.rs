//! LCA calculation core
//!
//! Turns process life cycles and quantities into indicator results per life
//! cycle module. Nothing in here touches the result cache or the filesystem.

mod calculator;
mod error;
mod indicator;
mod module;
mod process;
mod results;
mod unit;
mod usage;

pub use calculator::{
    component_mass, ElementComponentLcaCalculator, ExtantSavingsCalculator,
    FinalEnergyLcaCalculator, NumberOfReplacementsCalculator, ProcessLcaCalculator,
    TransportLcaCalculator, UsefulLife,
};
pub use error::CalcError;
pub use indicator::{Indicator, IndicatorResult, IndicatorResults, PET, PET_COMPONENTS};
pub use module::{Module, Stage};
pub use process::{Process, ProcessLifeCycle};
pub use results::ProcessLifeCycleLcaResults;
pub use unit::{Conversion, Converter, Quantity, Unit};
pub use usage::{LifeCycleUsage, LifeCycleUsages};
