//! Compilation and checked evaluation of formula specifications

use crate::Inputs;
use crate::dsl::ast::{Binding, Program, extract_calls, extract_variables};
use crate::dsl::{FunctionRegistry, evaluate_program, parse_program_with_limits};
use crate::error::{CalculationError, EvaluationError, FormulaError, FormulaIssue, InputValidationError};
use crate::limits::ExpressionLimits;
use crate::result::{CalculationResult, ResultField};
use crate::schema::{FieldViolation, FormulaSpec};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// A formula whose names, calls, budget and output types have all been checked
#[derive(Debug, Clone)]
pub struct CompiledFormula {
    spec: FormulaSpec,
    program: Program,
    /// Inputs the expression actually reads
    variables: Vec<String>,
}

impl CompiledFormula {
    /// Parse and validate `spec`, reporting every issue found rather than the first
    pub fn compile(
        spec: FormulaSpec,
        functions: &FunctionRegistry,
        limits: &ExpressionLimits,
    ) -> Result<Self, FormulaError> {
        let mut issues = Vec::new();

        if spec.input_schema.is_empty() {
            issues.push(FormulaIssue::EmptyInputSchema);
        }
        if spec.output_schema.is_empty() {
            issues.push(FormulaIssue::EmptyOutputSchema);
        }
        for (field, declaration) in &spec.input_schema {
            for reason in declaration.declaration_problems() {
                issues.push(FormulaIssue::InvalidInputField { field: field.clone(), reason });
            }
        }

        if spec.expression.len() > limits.max_expression_length {
            issues.push(FormulaIssue::TooLong {
                actual: spec.expression.len(),
                limit: limits.max_expression_length,
            });
            return Err(FormulaError { formula_name: spec.name, issues });
        }

        let program = match parse_program_with_limits(&spec.expression, limits) {
            Ok(program) => program,
            Err(e) => {
                issues.push(FormulaIssue::Parse { message: format!("{e:#}") });
                return Err(FormulaError { formula_name: spec.name, issues });
            }
        };

        issues.extend(check_budget(&program, limits));
        issues.extend(check_calls(&program, functions));
        let (name_issues, variables) = check_names(&spec, &program);
        issues.extend(name_issues);

        if !issues.is_empty() {
            return Err(FormulaError { formula_name: spec.name, issues });
        }

        let compiled = Self { spec, program, variables };
        let synthetic_issues = compiled.synthetic_check(functions);
        if !synthetic_issues.is_empty() {
            return Err(FormulaError { formula_name: compiled.spec.name, issues: synthetic_issues });
        }

        debug!(
            formula = %compiled.spec.name,
            statements = compiled.program.statements.len(),
            "Compiled formula"
        );
        Ok(compiled)
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &FormulaSpec {
        &self.spec
    }

    /// Declared inputs the expression reads, sorted
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Evaluate against `inputs`; only declared input fields are visible to the formula
    pub fn evaluate(
        &self,
        calculator_id: &str,
        inputs: &Inputs,
        functions: &FunctionRegistry,
    ) -> Result<CalculationResult, CalculationError> {
        let bound = self.bind_inputs(calculator_id, inputs)?;

        let mut outputs = evaluate_program(&self.program, &bound, functions)
            .map_err(|e| self.evaluation_error(calculator_id, &bound, format!("{e:#}")))?;

        let mut fields = BTreeMap::new();
        for (name, kind) in &self.spec.output_schema {
            let Some(value) = outputs.remove(name) else {
                return Err(self
                    .evaluation_error(
                        calculator_id,
                        &bound,
                        format!("declared output '{name}' was never assigned"),
                    )
                    .into());
            };
            if !kind.accepts(&value) {
                return Err(self
                    .evaluation_error(
                        calculator_id,
                        &bound,
                        format!(
                            "output '{name}' is declared as {} but evaluated to {}",
                            kind.name(),
                            value.type_name()
                        ),
                    )
                    .into());
            }
            fields.insert(name.clone(), ResultField { value, kind: *kind });
        }

        Ok(CalculationResult {
            calculator_id: calculator_id.to_string(),
            formula_name: self.spec.name.clone(),
            fields,
        })
    }

    fn bind_inputs(
        &self,
        calculator_id: &str,
        inputs: &Inputs,
    ) -> Result<Inputs, InputValidationError> {
        let mut bound = BTreeMap::new();

        for (name, field) in &self.spec.input_schema {
            // Defaults are applied by coercion, never here
            let Some(value) = inputs.get(name) else {
                return Err(InputValidationError::MissingField {
                    calculator_id: calculator_id.to_string(),
                    formula_name: self.spec.name.clone(),
                    field: name.clone(),
                });
            };

            field.check(value).map_err(|violation| match violation {
                FieldViolation::WrongType { expected, actual } => InputValidationError::WrongType {
                    calculator_id: calculator_id.to_string(),
                    formula_name: self.spec.name.clone(),
                    field: name.clone(),
                    expected,
                    actual,
                },
                FieldViolation::OutOfDomain { constraint } => InputValidationError::OutOfDomain {
                    calculator_id: calculator_id.to_string(),
                    formula_name: self.spec.name.clone(),
                    field: name.clone(),
                    value: value.clone(),
                    constraint,
                },
            })?;

            bound.insert(name.clone(), value.clone());
        }

        if inputs.len() > bound.len() {
            let ignored: Vec<&String> =
                inputs.keys().filter(|k| !self.spec.input_schema.contains_key(*k)).collect();
            debug!(calculator_id, formula = %self.spec.name, ?ignored, "Ignoring undeclared inputs");
        }

        Ok(bound)
    }

    fn evaluation_error(&self, calculator_id: &str, bound: &Inputs, message: String) -> EvaluationError {
        EvaluationError {
            calculator_id: calculator_id.to_string(),
            formula_name: self.spec.name.clone(),
            inputs: bound.clone(),
            message,
        }
    }

    /// Run once against synthetic inputs and check each output's type
    fn synthetic_check(&self, functions: &FunctionRegistry) -> Vec<FormulaIssue> {
        let inputs: Inputs = self
            .spec
            .input_schema
            .iter()
            .map(|(name, field)| (name.clone(), field.synthetic_value()))
            .collect();

        let outputs = match evaluate_program(&self.program, &inputs, functions) {
            Ok(outputs) => outputs,
            Err(e) => return vec![FormulaIssue::SyntheticEvaluation { message: format!("{e:#}") }],
        };

        self.spec
            .output_schema
            .iter()
            .filter_map(|(field, kind)| match outputs.get(field) {
                Some(value) if !kind.accepts(value) => Some(FormulaIssue::OutputKindMismatch {
                    field: field.clone(),
                    expected: kind.name(),
                    actual: value.type_name(),
                }),
                Some(_) => None,
                None => Some(FormulaIssue::UnassignedOutput { field: field.clone() }),
            })
            .collect()
    }
}

fn check_budget(program: &Program, limits: &ExpressionLimits) -> Vec<FormulaIssue> {
    let mut issues = Vec::new();

    let nodes = program.node_count();
    if nodes > limits.max_expression_nodes {
        issues.push(FormulaIssue::TooComplex { actual: nodes, limit: limits.max_expression_nodes });
    }
    let depth = program.depth();
    if depth > limits.max_expression_depth {
        issues.push(FormulaIssue::TooDeep { actual: depth, limit: limits.max_expression_depth });
    }

    issues
}

fn check_calls(program: &Program, functions: &FunctionRegistry) -> Vec<FormulaIssue> {
    program
        .statements
        .iter()
        .flat_map(|statement| extract_calls(&statement.expr))
        .filter_map(|(name, arg_count)| functions.check_call(name, arg_count).err())
        .map(|e| FormulaIssue::InvalidCall { message: e.to_string() })
        .collect()
}

/// Walk statements in order, tracking what is defined at each point
fn check_names(spec: &FormulaSpec, program: &Program) -> (Vec<FormulaIssue>, Vec<String>) {
    let mut issues = Vec::new();
    let mut defined: HashSet<&str> = spec.input_schema.keys().map(String::as_str).collect();
    let mut assigned: HashSet<&str> = HashSet::new();
    let mut reported = BTreeSet::new();
    let mut read_inputs = BTreeSet::new();

    for statement in &program.statements {
        for variable in extract_variables(&statement.expr) {
            if !defined.contains(variable.as_str()) {
                if reported.insert(variable.clone()) {
                    issues.push(FormulaIssue::UndeclaredVariable { variable });
                }
            } else if spec.input_schema.contains_key(&variable) {
                read_inputs.insert(variable);
            }
        }

        let target = statement.target.as_str();
        if spec.input_schema.contains_key(target) {
            issues.push(FormulaIssue::ShadowedInput { target: target.to_string() });
        } else if !assigned.insert(target) {
            issues.push(FormulaIssue::DuplicateAssignment { target: target.to_string() });
        }

        if statement.binding == Binding::Output && !spec.output_schema.contains_key(target) {
            issues.push(FormulaIssue::UndeclaredOutput { field: target.to_string() });
        }
        defined.insert(target);
    }

    for field in spec.output_schema.keys() {
        if !program.outputs().any(|output| output == field) {
            issues.push(FormulaIssue::UnassignedOutput { field: field.clone() });
        }
    }

    (issues, read_inputs.into_iter().collect())
}
