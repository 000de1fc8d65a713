//! Reckon Prelude
//!
//! This crate re-exports the most frequently used public items from the Reckon
//! crates (`reckon-core` and `reckon-calculator`). Applications can depend on
//! `reckon-prelude` to avoid long import lists and to stay insulated from
//! internal module reshuffles.

#![deny(warnings)]
#![deny(missing_docs)]

// Registry, content and formatting ------------------------------------------------------------

pub use reckon_core::{
    CalculatorDefinition, CategoryData, ContentResolver, EngineConfig, LocaleContent, Registry,
    ResultFormatter, SourcePayload,
    // Errors
    CalculationError, DefinitionError, EvaluationError, InputValidationError,
};

// Formula layer -------------------------------------------------------------------------------

pub use reckon_calculator::{
    CalculationResult, FormulaSpec, FormulaStore, InputField, InputKind, Inputs, OutputKind, Value,
    coerce, coerce_inputs,
};
