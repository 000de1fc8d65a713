//! Input and output schema declarations for formula specifications

use reckon_types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declared type of an input field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Number,
    Integer,
    Text,
    Boolean,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputKind::Number => "number",
            InputKind::Integer => "integer",
            InputKind::Text => "text",
            InputKind::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// What coercion does with a numeric value outside `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClampPolicy {
    /// Pull the value back into range
    #[default]
    Clamp,
    /// Leave it alone so evaluation rejects it
    Reject,
}

/// Type and constraints of a single input field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    #[serde(rename = "type")]
    pub kind: InputKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Allowed values for text fields; empty means any text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub policy: ClampPolicy,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// Why a value does not satisfy an [`InputField`]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldViolation {
    WrongType { expected: InputKind, actual: &'static str },
    OutOfDomain { constraint: String },
}

impl InputField {
    pub fn new(kind: InputKind) -> Self {
        Self {
            kind,
            min: None,
            max: None,
            choices: Vec::new(),
            default: None,
            policy: ClampPolicy::default(),
            required: true,
        }
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_policy(mut self, policy: ClampPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    fn is_numeric(&self) -> bool {
        matches!(self.kind, InputKind::Number | InputKind::Integer)
    }

    /// Check a value against the declared type and constraints
    pub fn check(&self, value: &Value) -> Result<(), FieldViolation> {
        match (self.kind, value) {
            (InputKind::Number | InputKind::Integer, Value::Number(n)) => {
                if !n.is_finite() {
                    return Err(FieldViolation::OutOfDomain {
                        constraint: "a finite number".to_string(),
                    });
                }
                if self.kind == InputKind::Integer && n.fract() != 0.0 {
                    return Err(FieldViolation::OutOfDomain {
                        constraint: "a whole number".to_string(),
                    });
                }
                if let Some(min) = self.min.filter(|min| n < min) {
                    return Err(FieldViolation::OutOfDomain { constraint: format!(">= {min}") });
                }
                if let Some(max) = self.max.filter(|max| n > max) {
                    return Err(FieldViolation::OutOfDomain { constraint: format!("<= {max}") });
                }
                Ok(())
            }
            (InputKind::Text, Value::Text(s)) => {
                if self.choices.is_empty() || self.choices.iter().any(|c| c == s) {
                    Ok(())
                } else {
                    Err(FieldViolation::OutOfDomain {
                        constraint: format!("one of [{}]", self.choices.join(", ")),
                    })
                }
            }
            (InputKind::Boolean, Value::Boolean(_)) => Ok(()),
            (expected, actual) => {
                Err(FieldViolation::WrongType { expected, actual: actual.type_name() })
            }
        }
    }

    /// Problems with the declaration itself, reported at load time
    pub fn declaration_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                problems.push(format!("min {min} is greater than max {max}"));
            }
        }
        if !self.is_numeric() && (self.min.is_some() || self.max.is_some()) {
            problems.push(format!("min/max are not allowed on {} fields", self.kind));
        }
        if self.kind != InputKind::Text && !self.choices.is_empty() {
            problems.push(format!("choices are not allowed on {} fields", self.kind));
        }
        if let Some(default) = &self.default {
            if let Err(violation) = self.check(default) {
                problems.push(format!("default {default} is invalid: {}", violation));
            }
        }
        if !self.required && self.default.is_none() {
            problems.push("optional fields need a default".to_string());
        }

        problems
    }

    /// Value used for the one-time synthetic evaluation at load time
    pub fn synthetic_value(&self) -> Value {
        if let Some(default) = &self.default {
            return default.clone();
        }
        match self.kind {
            InputKind::Number | InputKind::Integer => {
                Value::Number(self.min.or(self.max).unwrap_or(1.0))
            }
            InputKind::Text => Value::Text(self.choices.first().cloned().unwrap_or_default()),
            InputKind::Boolean => Value::Boolean(false),
        }
    }

    /// Numeric fallback used when raw input cannot be parsed
    pub fn fallback_number(&self) -> f64 {
        self.default
            .as_ref()
            .and_then(Value::as_number)
            .or(self.min)
            .unwrap_or(0.0)
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldViolation::WrongType { expected, actual } => {
                write!(f, "expected {expected}, got {actual}")
            }
            FieldViolation::OutOfDomain { constraint } => write!(f, "must be {constraint}"),
        }
    }
}

/// How a result field is presented; drives the formatter's precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputKind {
    /// Money; always two fraction digits
    Currency,
    /// Value already expressed in percent (5 means 5%)
    Percent {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision: Option<u8>,
    },
    /// Dimensionless ratio such as a BMI or a multiplier
    Ratio {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision: Option<u8>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision: Option<u8>,
    },
    Integer,
    Text,
    Boolean,
}

impl OutputKind {
    /// Whether a computed value has the shape this kind expects
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            OutputKind::Text => matches!(value, Value::Text(_)),
            OutputKind::Boolean => matches!(value, Value::Boolean(_)),
            _ => matches!(value, Value::Number(_)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputKind::Currency => "currency",
            OutputKind::Percent { .. } => "percent",
            OutputKind::Ratio { .. } => "ratio",
            OutputKind::Number { .. } => "number",
            OutputKind::Integer => "integer",
            OutputKind::Text => "text",
            OutputKind::Boolean => "boolean",
        }
    }
}

/// Declarative description of one computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaSpec {
    pub name: String,
    pub input_schema: BTreeMap<String, InputField>,
    pub expression: String,
    pub output_schema: BTreeMap<String, OutputKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_field_check() {
        let field = InputField::new(InputKind::Integer).with_range(Some(1.0), Some(40.0));
        assert!(field.check(&Value::Number(30.0)).is_ok());
        assert!(matches!(
            field.check(&Value::Number(2.5)),
            Err(FieldViolation::OutOfDomain { .. })
        ));
        assert!(matches!(field.check(&Value::Number(0.0)), Err(FieldViolation::OutOfDomain { .. })));
        assert!(matches!(
            field.check(&Value::Text("3".to_string())),
            Err(FieldViolation::WrongType { expected: InputKind::Integer, actual: "text" })
        ));
        assert!(field.check(&Value::Number(f64::NAN)).is_err());
    }

    #[test]
    fn test_choice_field() {
        let field = InputField::new(InputKind::Text).with_choices(&["monthly", "weekly"]);
        assert!(field.check(&Value::from("weekly")).is_ok());
        assert!(field.check(&Value::from("daily")).is_err());
        assert_eq!(field.synthetic_value(), Value::from("monthly"));
    }

    #[test]
    fn test_declaration_problems() {
        let bad = InputField::new(InputKind::Number).with_range(Some(10.0), Some(1.0));
        assert_eq!(bad.declaration_problems().len(), 1);

        let bad_default = InputField::new(InputKind::Number).with_range(Some(0.0), None).with_default(-1.0);
        assert!(bad_default.declaration_problems()[0].contains("default"));

        let optional = InputField::new(InputKind::Boolean).optional();
        assert!(!optional.declaration_problems().is_empty());

        let good = InputField::new(InputKind::Text).with_choices(&["a"]).with_default("a");
        assert!(good.declaration_problems().is_empty());
    }

    #[test]
    fn test_formula_spec_deserializes_from_json() {
        let spec: FormulaSpec = serde_json::from_str(
            r#"{
                "name": "primary",
                "inputSchema": {
                    "amount": {"type": "number", "min": 0, "default": 50},
                    "rounding": {"type": "boolean", "required": false, "default": false}
                },
                "expression": "total = amount * 2",
                "outputSchema": {"total": {"type": "currency"}, "rate": {"type": "percent", "precision": 1}}
            }"#,
        )
        .unwrap();

        assert_eq!(spec.input_schema["amount"].kind, InputKind::Number);
        assert_eq!(spec.input_schema["amount"].policy, ClampPolicy::Clamp);
        assert!(!spec.input_schema["rounding"].required);
        assert_eq!(spec.output_schema["rate"], OutputKind::Percent { precision: Some(1) });
    }
}
