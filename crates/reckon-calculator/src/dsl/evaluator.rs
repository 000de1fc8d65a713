//! Program evaluator for the formula language
//!
//! Evaluation sees only the bound inputs and the locals assigned by earlier
//! statements. Numbers follow IEEE 754: dividing by zero produces `inf` or
//! `NaN` rather than an error.

use crate::dsl::ast::{BinaryOperator, Binding, Expression, Program, UnaryOperator};
use crate::dsl::functions::FunctionRegistry;
use anyhow::{Context, Result, anyhow};
use reckon_types::Value;
use std::collections::{BTreeMap, HashMap};

/// Variables visible while evaluating one statement
struct Scope<'a> {
    inputs: &'a BTreeMap<String, Value>,
    locals: HashMap<&'a str, Value>,
}

impl Scope<'_> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.locals.get(name).or_else(|| self.inputs.get(name))
    }
}

/// Run every statement in order and return the values assigned to outputs
pub fn evaluate_program(
    program: &Program,
    inputs: &BTreeMap<String, Value>,
    functions: &FunctionRegistry,
) -> Result<BTreeMap<String, Value>> {
    let mut scope = Scope { inputs, locals: HashMap::new() };
    let mut outputs = BTreeMap::new();

    for statement in &program.statements {
        let value = evaluate_expression(&statement.expr, &scope, functions)
            .with_context(|| format!("while computing '{}'", statement.target))?;

        if statement.binding == Binding::Output {
            outputs.insert(statement.target.clone(), value.clone());
        }
        scope.locals.insert(statement.target.as_str(), value);
    }

    Ok(outputs)
}

/// Evaluate a standalone expression against a set of variables
pub fn evaluate_standalone(
    expr: &Expression,
    variables: &BTreeMap<String, Value>,
    functions: &FunctionRegistry,
) -> Result<Value> {
    let scope = Scope { inputs: variables, locals: HashMap::new() };
    evaluate_expression(expr, &scope, functions)
}

fn evaluate_expression(
    expr: &Expression,
    scope: &Scope<'_>,
    functions: &FunctionRegistry,
) -> Result<Value> {
    match expr {
        Expression::Literal(value) => Ok(value.clone()),

        Expression::Variable(name) => scope
            .lookup(name)
            .cloned()
            .ok_or_else(|| anyhow!("Variable '{}' is not bound", name)),

        Expression::BinaryOp {
            left,
            operator: op @ (BinaryOperator::And | BinaryOperator::Or),
            right,
        } => {
            let left_val = expect_boolean(evaluate_expression(left, scope, functions)?, *op)?;
            // Short-circuit
            match (*op, left_val) {
                (BinaryOperator::And, false) => Ok(Value::Boolean(false)),
                (BinaryOperator::Or, true) => Ok(Value::Boolean(true)),
                _ => {
                    let right_val = evaluate_expression(right, scope, functions)?;
                    Ok(Value::Boolean(expect_boolean(right_val, *op)?))
                }
            }
        }

        Expression::BinaryOp { left, operator, right } => {
            let left_val = evaluate_expression(left, scope, functions)?;
            let right_val = evaluate_expression(right, scope, functions)?;
            evaluate_binary_op(&left_val, *operator, &right_val)
        }

        Expression::UnaryOp { operator, operand } => {
            let operand_val = evaluate_expression(operand, scope, functions)?;
            evaluate_unary_op(*operator, &operand_val)
        }

        Expression::FunctionCall { name, args } => {
            let arg_values = args
                .iter()
                .map(|arg| evaluate_expression(arg, scope, functions))
                .collect::<Result<Vec<_>>>()?;
            functions.call(name, &arg_values)
        }

        Expression::Conditional { condition, then_expr, else_expr } => {
            if evaluate_expression(condition, scope, functions)?.is_truthy() {
                evaluate_expression(then_expr, scope, functions)
            } else {
                evaluate_expression(else_expr, scope, functions)
            }
        }

        Expression::ConditionalSet { conditions, default_value } => {
            for (condition, value) in conditions {
                if evaluate_expression(condition, scope, functions)?.is_truthy() {
                    return evaluate_expression(value, scope, functions);
                }
            }

            match default_value {
                Some(default) => evaluate_expression(default, scope, functions),
                None => Err(anyhow!(
                    "No conditions matched in conditional set and no default value provided"
                )),
            }
        }
    }
}

fn expect_boolean(value: Value, op: BinaryOperator) -> Result<bool> {
    match value {
        Value::Boolean(b) => Ok(b),
        other => Err(anyhow!("{:?} requires boolean operands, got {}", op, other.type_name())),
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(left: &Value, operator: BinaryOperator, right: &Value) -> Result<Value> {
    use {BinaryOperator::*, Value::*};

    match (left, right, operator) {
        // Arithmetic, IEEE 754 throughout
        (Number(a), Number(b), Add) => Ok(Number(a + b)),
        (Number(a), Number(b), Subtract) => Ok(Number(a - b)),
        (Number(a), Number(b), Multiply) => Ok(Number(a * b)),
        (Number(a), Number(b), Divide) => Ok(Number(a / b)),
        (Number(a), Number(b), Modulo) => Ok(Number(a % b)),
        (Number(a), Number(b), Power) => Ok(Number(a.powf(*b))),

        // Comparison operations
        (Number(a), Number(b), Equal) => Ok(Boolean(numbers_equal(*a, *b))),
        (Number(a), Number(b), NotEqual) => Ok(Boolean(!numbers_equal(*a, *b))),
        (Number(a), Number(b), LessThan) => Ok(Boolean(a < b)),
        (Number(a), Number(b), LessThanOrEqual) => Ok(Boolean(a <= b)),
        (Number(a), Number(b), GreaterThan) => Ok(Boolean(a > b)),
        (Number(a), Number(b), GreaterThanOrEqual) => Ok(Boolean(a >= b)),

        // Text comparisons
        (Text(a), Text(b), Equal) => Ok(Boolean(a == b)),
        (Text(a), Text(b), NotEqual) => Ok(Boolean(a != b)),
        (Text(a), Text(b), LessThan) => Ok(Boolean(a < b)),
        (Text(a), Text(b), LessThanOrEqual) => Ok(Boolean(a <= b)),
        (Text(a), Text(b), GreaterThan) => Ok(Boolean(a > b)),
        (Text(a), Text(b), GreaterThanOrEqual) => Ok(Boolean(a >= b)),

        // Boolean operations
        (Boolean(a), Boolean(b), Equal) => Ok(Boolean(a == b)),
        (Boolean(a), Boolean(b), NotEqual) => Ok(Boolean(a != b)),

        // Cross-type equality
        (a, b, Equal) if std::mem::discriminant(a) != std::mem::discriminant(b) => {
            Ok(Boolean(false))
        }
        (a, b, NotEqual) if std::mem::discriminant(a) != std::mem::discriminant(b) => {
            Ok(Boolean(true))
        }

        _ => Err(anyhow!(
            "Unsupported operation: {} {:?} {}",
            left.type_name(),
            operator,
            right.type_name()
        )),
    }
}

// Exact match first so equal infinities compare equal; NaN never does
fn numbers_equal(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() < f64::EPSILON
}

/// Evaluate a unary operation
fn evaluate_unary_op(operator: UnaryOperator, operand: &Value) -> Result<Value> {
    match (operator, operand) {
        (UnaryOperator::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        _ => Err(anyhow!(
            "Unsupported unary operation: {:?} {}",
            operator,
            operand.type_name()
        )),
    }
}
