//! Formula language for calculator definitions
//!
//! A formula body is a short straight-line program of assignments over a
//! fixed set of named inputs. There are no loops and no I/O, and calls are
//! limited to the pure math functions in [`FunctionRegistry::with_builtins`].

pub mod ast;
pub mod evaluator;
pub mod functions;
pub mod parser;

pub use ast::{BinaryOperator, Binding, Expression, Program, Statement, UnaryOperator};
pub use evaluator::{evaluate_program, evaluate_standalone};
pub use functions::{Arity, CalculatorFunction, FunctionRegistry};
pub use parser::{parse_expression, parse_program, parse_program_with_limits};
