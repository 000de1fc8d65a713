//! # Reckon Calculator
//!
//! The formula layer of Reckon: a small, closed expression language that is
//! parsed and checked once at load time, plus input coercion and a store of
//! compiled formulas.
//!
//! ## Formula language
//!
//! A formula is a sequence of statements separated by `;`:
//!
//! ```text
//! let rate = interestRate / 100 / 12;
//! payment = principal * rate / (1 - (1 + rate) ** -months)
//! ```
//!
//! `let` binds a local; a bare assignment produces an output that must appear
//! in the formula's output schema. There are no loops, no I/O and no way to
//! call anything outside the registered function set.
//!
//! ## Quick Start
//!
//! ```rust
//! use reckon_calculator::{FormulaSpec, FormulaStore, InputField, InputKind, Inputs, OutputKind};
//!
//! let spec = FormulaSpec {
//!     name: "primary".to_string(),
//!     input_schema: [("bill".to_string(), InputField::new(InputKind::Number))].into(),
//!     expression: "tip = bill * 0.2".to_string(),
//!     output_schema: [("tip".to_string(), OutputKind::Currency)].into(),
//! };
//!
//! let mut store = FormulaStore::default();
//! store.register_formula("tip", spec).unwrap();
//!
//! let inputs = Inputs::from([("bill".to_string(), 50.0.into())]);
//! let result = store.evaluate("tip", "primary", &inputs).unwrap();
//! assert_eq!(result.number("tip"), Some(10.0));
//! ```

pub mod coercion;
pub mod dsl;
pub mod error;
pub mod formula;
pub mod limits;
pub mod result;
pub mod schema;
pub mod store;

use std::collections::BTreeMap;

pub use reckon_types::Value;

/// Typed input values keyed by field name
pub type Inputs = BTreeMap<String, Value>;

pub use coercion::{coerce, coerce_bool, coerce_inputs};
pub use dsl::{Expression, FunctionRegistry, parse_expression, parse_program};
pub use error::{CalculationError, EvaluationError, FormulaError, FormulaIssue, InputValidationError};
pub use formula::CompiledFormula;
pub use limits::ExpressionLimits;
pub use result::{CalculationResult, ResultField};
pub use schema::{ClampPolicy, FieldViolation, FormulaSpec, InputField, InputKind, OutputKind};
pub use store::FormulaStore;
