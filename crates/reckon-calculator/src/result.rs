use crate::schema::OutputKind;
use reckon_types::Value;
use serde::Serialize;
use std::collections::BTreeMap;

/// One computed output together with its declared presentation kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultField {
    pub value: Value,
    pub kind: OutputKind,
}

/// Structured, unrounded result of evaluating one formula
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub calculator_id: String,
    pub formula_name: String,
    pub fields: BTreeMap<String, ResultField>,
}

impl CalculationResult {
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).map(|f| &f.value)
    }

    /// Numeric output by name
    pub fn number(&self, field: &str) -> Option<f64> {
        self.value(field).and_then(Value::as_number)
    }

    /// Bitwise comparison of every field, treating `NaN` as equal to itself
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.calculator_id == other.calculator_id
            && self.formula_name == other.formula_name
            && self.fields.len() == other.fields.len()
            && self.fields.iter().zip(&other.fields).all(|((ka, a), (kb, b))| {
                ka == kb && a.kind == b.kind && a.value.bit_eq(&b.value)
            })
    }
}
