//! Errors raised by the calculation core

use miette::Diagnostic;
use thiserror::Error;

use super::Unit;

/// Errors that can occur while computing LCA results
#[derive(Debug, Error, Diagnostic)]
pub enum CalcError {
    #[error("no conversion from {from} to {to} available for {context}")]
    #[diagnostic(
        code(elca::calc::conversion),
        help("add a conversion between these units to the process configuration")
    )]
    ConversionNotFound { context: String, from: Unit, to: Unit },

    #[error("process '{process}' is not part of the life cycle of '{process_config}'")]
    #[diagnostic(code(elca::calc::process_not_in_life_cycle))]
    ProcessNotFoundInLifeCycle {
        process: String,
        process_config: String,
    },

    #[error("No PET indicator was found")]
    #[diagnostic(
        code(elca::calc::missing_pet),
        help("the indicator catalog must contain an indicator with ident 'pet'")
    )]
    MissingPetIndicator,
}
