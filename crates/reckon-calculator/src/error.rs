//! Error types for formula compilation and evaluation

use crate::schema::InputKind;
use reckon_types::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A single reason a formula specification cannot be registered
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaIssue {
    #[error("input schema is empty")]
    EmptyInputSchema,

    #[error("output schema is empty")]
    EmptyOutputSchema,

    #[error("input '{field}' is declared incorrectly: {reason}")]
    InvalidInputField { field: String, reason: String },

    #[error("expression does not parse: {message}")]
    Parse { message: String },

    #[error("expression references '{variable}', which is neither a declared input nor defined earlier")]
    UndeclaredVariable { variable: String },

    #[error("'{target}' is assigned more than once")]
    DuplicateAssignment { target: String },

    #[error("'{target}' is assigned but is also an input")]
    ShadowedInput { target: String },

    #[error("expression assigns '{field}', which is not in the output schema")]
    UndeclaredOutput { field: String },

    #[error("output '{field}' is declared but never assigned")]
    UnassignedOutput { field: String },

    #[error("invalid function call: {message}")]
    InvalidCall { message: String },

    #[error("expression is {actual} characters long (max: {limit})")]
    TooLong { actual: usize, limit: usize },

    #[error("expression has {actual} nodes (max: {limit})")]
    TooComplex { actual: usize, limit: usize },

    #[error("expression nesting is {actual} levels deep (max: {limit})")]
    TooDeep { actual: usize, limit: usize },

    #[error("synthetic evaluation failed: {message}")]
    SyntheticEvaluation { message: String },

    #[error("output '{field}' is declared as {expected} but the expression produces {actual}")]
    OutputKindMismatch { field: String, expected: &'static str, actual: &'static str },

    #[error("formula name is already registered")]
    DuplicateFormula,
}

/// Every issue found in one formula, named by the formula it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaError {
    pub formula_name: String,
    pub issues: Vec<FormulaIssue>,
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "formula '{}': ", self.formula_name)?;
        let messages: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for FormulaError {}

/// Per-call input problem; the caller can retry with corrected input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputValidationError {
    #[error("unknown calculator '{calculator_id}'")]
    UnknownCalculator { calculator_id: String },

    #[error("calculator '{calculator_id}' has no formula named '{formula_name}'")]
    UnknownFormula { calculator_id: String, formula_name: String },

    #[error("{calculator_id}/{formula_name}: missing required input '{field}'")]
    MissingField { calculator_id: String, formula_name: String, field: String },

    #[error("{calculator_id}/{formula_name}: input '{field}' expected {expected}, got {actual}")]
    WrongType {
        calculator_id: String,
        formula_name: String,
        field: String,
        expected: InputKind,
        actual: &'static str,
    },

    #[error("{calculator_id}/{formula_name}: input '{field}' = {value} must be {constraint}")]
    OutOfDomain {
        calculator_id: String,
        formula_name: String,
        field: String,
        value: Value,
        constraint: String,
    },
}

/// A formula ran but did not produce its declared outputs
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{calculator_id}/{formula_name} failed: {message}")]
pub struct EvaluationError {
    pub calculator_id: String,
    pub formula_name: String,
    /// Inputs exactly as bound for the failing run
    pub inputs: BTreeMap<String, Value>,
    pub message: String,
}

/// Anything `evaluate` can return instead of a result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculationError {
    #[error(transparent)]
    Input(#[from] InputValidationError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl CalculationError {
    /// Error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            CalculationError::Input(_) => "input_validation",
            CalculationError::Evaluation(_) => "evaluation",
        }
    }
}
