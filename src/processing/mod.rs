//! Variant processing
//!
//! [`LcaProcessor`] walks a variant of the model, runs the calculators and
//! stores raw results in the [`ResultCache`](crate::core::ResultCache).
//! Aggregation is a separate step so several variants can be computed before
//! one update run.

mod observer;
mod processor;
mod savings;

pub use observer::{ComputeStats, LcaProcessingObserver, TracingObserver};
pub use processor::LcaProcessor;
pub use savings::{ExtantSavings, IndicatorSaving};
