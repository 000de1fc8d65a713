//! Compiled formulas keyed by calculator id and formula name

use crate::Inputs;
use crate::dsl::FunctionRegistry;
use crate::error::{CalculationError, FormulaError, FormulaIssue, InputValidationError};
use crate::formula::CompiledFormula;
use crate::limits::ExpressionLimits;
use crate::result::CalculationResult;
use crate::schema::FormulaSpec;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Owns the function table and every compiled formula
#[derive(Debug)]
pub struct FormulaStore {
    functions: FunctionRegistry,
    limits: ExpressionLimits,
    formulas: HashMap<String, Vec<CompiledFormula>>,
}

impl Default for FormulaStore {
    fn default() -> Self {
        Self::new(ExpressionLimits::default())
    }
}

impl FormulaStore {
    pub fn new(limits: ExpressionLimits) -> Self {
        Self { functions: FunctionRegistry::with_builtins(), limits, formulas: HashMap::new() }
    }

    /// Compile and register one formula under `calculator_id`
    pub fn register_formula(&mut self, calculator_id: &str, spec: FormulaSpec) -> Result<(), FormulaError> {
        let existing = self.formulas.get(calculator_id);
        if existing.is_some_and(|formulas| formulas.iter().any(|f| f.name() == spec.name)) {
            return Err(FormulaError { formula_name: spec.name, issues: vec![FormulaIssue::DuplicateFormula] });
        }

        let compiled = CompiledFormula::compile(spec, &self.functions, &self.limits)?;
        debug!(calculator_id, formula = compiled.name(), "Registered formula");
        self.formulas.entry(calculator_id.to_string()).or_default().push(compiled);
        Ok(())
    }

    pub fn get(&self, calculator_id: &str, formula_name: &str) -> Option<&CompiledFormula> {
        self.formulas(calculator_id).iter().find(|f| f.name() == formula_name)
    }

    /// Formulas of one calculator in registration order
    pub fn formulas(&self, calculator_id: &str) -> &[CompiledFormula] {
        self.formulas.get(calculator_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Number of calculators with at least one formula
    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    #[instrument(skip(self, inputs), fields(input_count = inputs.len()))]
    pub fn evaluate(
        &self,
        calculator_id: &str,
        formula_name: &str,
        inputs: &Inputs,
    ) -> Result<CalculationResult, CalculationError> {
        let Some(formulas) = self.formulas.get(calculator_id) else {
            return Err(InputValidationError::UnknownCalculator { calculator_id: calculator_id.to_string() }.into());
        };
        let Some(formula) = formulas.iter().find(|f| f.name() == formula_name) else {
            return Err(InputValidationError::UnknownFormula {
                calculator_id: calculator_id.to_string(),
                formula_name: formula_name.to_string(),
            }
            .into());
        };

        formula.evaluate(calculator_id, inputs, &self.functions)
    }
}
