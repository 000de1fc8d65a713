//! Abstract Syntax Tree for formula bodies

use reckon_types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// AST node representing an expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal value (number, string, boolean)
    Literal(Value),

    /// Reference to an input field or an earlier binding
    Variable(String),

    /// Binary operation (a + b, a > b, etc.)
    BinaryOp { left: Box<Expression>, operator: BinaryOperator, right: Box<Expression> },

    /// Unary operation (-a, !a)
    UnaryOp { operator: UnaryOperator, operand: Box<Expression> },

    /// Function call (max(a, b), round(x, 2))
    FunctionCall { name: String, args: Vec<Expression> },

    /// Conditional expression (if condition then expr else expr)
    Conditional {
        condition: Box<Expression>,
        then_expr: Box<Expression>,
        else_expr: Box<Expression>,
    },

    /// Conditional set with multiple condition-value pairs
    /// Evaluates conditions in order and returns the first matching value
    ConditionalSet {
        conditions: Vec<(Expression, Expression)>, // (condition, value) pairs
        default_value: Option<Box<Expression>>,    // default if no conditions match
    },
}

/// Binary operators supported by the formula language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,

    // Logical
    And,
    Or,
}

/// Unary operators supported by the formula language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Numeric negation (-x)
    Negate,
    /// Logical negation (!x)
    Not,
}

/// Whether a statement binds a scratch local or one of the formula's outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Binding {
    Local,
    Output,
}

/// `let name = expr` or `name = expr`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub target: String,
    pub binding: Binding,
    pub expr: Expression,
}

/// A parsed formula body: straight-line statements evaluated in order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Expression {
    /// Create a literal number expression
    pub fn number(value: f64) -> Self {
        Self::Literal(Value::Number(value))
    }

    /// Create a literal string expression
    pub fn string(value: &str) -> Self {
        Self::Literal(Value::Text(value.to_string()))
    }

    /// Create a literal boolean expression
    pub fn bool(value: bool) -> Self {
        Self::Literal(Value::Boolean(value))
    }

    /// Create a variable reference
    pub fn var(name: &str) -> Self {
        Self::Variable(name.to_string())
    }

    /// Create a binary operation
    pub fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Self {
        Self::BinaryOp { left: Box::new(left), operator: op, right: Box::new(right) }
    }

    /// Create a unary operation
    pub fn unary(op: UnaryOperator, operand: Expression) -> Self {
        Self::UnaryOp { operator: op, operand: Box::new(operand) }
    }

    /// Create a function call
    pub fn call(name: &str, args: Vec<Expression>) -> Self {
        Self::FunctionCall { name: name.to_string(), args }
    }

    /// Create a conditional expression
    pub fn conditional(
        condition: Expression,
        then_expr: Expression,
        else_expr: Expression,
    ) -> Self {
        Self::Conditional {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    /// Create a conditional set expression
    pub fn conditional_set(
        conditions: Vec<(Expression, Expression)>,
        default_value: Option<Expression>,
    ) -> Self {
        Self::ConditionalSet { conditions, default_value: default_value.map(Box::new) }
    }

    /// Visit this node and every descendant, parents first
    pub fn visit<'a>(&'a self, visitor: &mut impl FnMut(&'a Expression)) {
        visitor(self);
        match self {
            Expression::Literal(_) | Expression::Variable(_) => {}
            Expression::BinaryOp { left, right, .. } => {
                left.visit(visitor);
                right.visit(visitor);
            }
            Expression::UnaryOp { operand, .. } => operand.visit(visitor),
            Expression::FunctionCall { args, .. } => {
                for arg in args {
                    arg.visit(visitor);
                }
            }
            Expression::Conditional { condition, then_expr, else_expr } => {
                condition.visit(visitor);
                then_expr.visit(visitor);
                else_expr.visit(visitor);
            }
            Expression::ConditionalSet { conditions, default_value } => {
                for (condition, value) in conditions {
                    condition.visit(visitor);
                    value.visit(visitor);
                }
                if let Some(default) = default_value {
                    default.visit(visitor);
                }
            }
        }
    }

    /// Number of AST nodes, used as the static execution-step budget
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.visit(&mut |_| count += 1);
        count
    }

    /// Maximum nesting depth; a lone literal has depth 1
    pub fn depth(&self) -> usize {
        let children = match self {
            Expression::Literal(_) | Expression::Variable(_) => 0,
            Expression::BinaryOp { left, right, .. } => left.depth().max(right.depth()),
            Expression::UnaryOp { operand, .. } => operand.depth(),
            Expression::FunctionCall { args, .. } => {
                args.iter().map(Expression::depth).max().unwrap_or(0)
            }
            Expression::Conditional { condition, then_expr, else_expr } => {
                condition.depth().max(then_expr.depth()).max(else_expr.depth())
            }
            Expression::ConditionalSet { conditions, default_value } => conditions
                .iter()
                .map(|(c, v)| c.depth().max(v.depth()))
                .chain(default_value.iter().map(|d| d.depth()))
                .max()
                .unwrap_or(0),
        };
        children + 1
    }
}

impl Program {
    /// Total AST nodes across every statement
    pub fn node_count(&self) -> usize {
        self.statements.iter().map(|s| s.expr.node_count()).sum()
    }

    /// Deepest expression in the program
    pub fn depth(&self) -> usize {
        self.statements.iter().map(|s| s.expr.depth()).max().unwrap_or(0)
    }

    /// Names assigned as outputs, in statement order
    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.statements
            .iter()
            .filter(|s| s.binding == Binding::Output)
            .map(|s| s.target.as_str())
    }
}

/// Extract all variable names referenced in an expression
pub fn extract_variables(expr: &Expression) -> Vec<String> {
    let mut variables = BTreeSet::new();
    expr.visit(&mut |node| {
        if let Expression::Variable(name) = node {
            variables.insert(name.clone());
        }
    });
    variables.into_iter().collect()
}

/// Extract every function name called in an expression, with its argument count
pub fn extract_calls(expr: &Expression) -> Vec<(&str, usize)> {
    let mut calls = Vec::new();
    expr.visit(&mut |node| {
        if let Expression::FunctionCall { name, args } = node {
            calls.push((name.as_str(), args.len()));
        }
    });
    calls
}
