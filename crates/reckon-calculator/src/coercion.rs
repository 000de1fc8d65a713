//! Best-effort conversion of raw user input into typed values
//!
//! Nothing here fails: unparsable input falls back to a declared value, and
//! clamping follows each field's [`ClampPolicy`].

use crate::Inputs;
use crate::schema::{ClampPolicy, InputField, InputKind};
use reckon_types::Value;
use std::collections::{BTreeMap, HashMap};

/// Parse the leading numeric prefix of `raw`.
///
/// Returns `fallback` for empty, non-numeric, `NaN` or infinite input.
/// Trailing text after the number is ignored (`"42.5kg"` is `42.5`).
pub fn coerce(raw: &str, fallback: f64) -> f64 {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return fallback;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    match text[..end].parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => fallback,
    }
}

/// Parse a boolean flag, accepting the usual form spellings
pub fn coerce_bool(raw: &str, fallback: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => fallback,
    }
}

impl InputField {
    /// Coerce raw text (or its absence) into a value for this field
    pub fn coerce_raw(&self, raw: Option<&str>) -> Value {
        match self.kind {
            InputKind::Number | InputKind::Integer => {
                let fallback = self.fallback_number();
                let mut value = raw.map_or(fallback, |r| coerce(r, fallback));
                if self.kind == InputKind::Integer {
                    value = value.trunc();
                }
                if self.policy == ClampPolicy::Clamp {
                    if let Some(min) = self.min {
                        value = value.max(min);
                    }
                    if let Some(max) = self.max {
                        value = value.min(max);
                    }
                }
                Value::Number(value)
            }
            InputKind::Text => Value::Text(self.coerce_text(raw)),
            InputKind::Boolean => {
                let fallback = self.default.as_ref().and_then(Value::as_boolean).unwrap_or(false);
                Value::Boolean(raw.map_or(fallback, |r| coerce_bool(r, fallback)))
            }
        }
    }

    // Choices match case-insensitively; anything else falls back to the default choice
    fn coerce_text(&self, raw: Option<&str>) -> String {
        let fallback = || match &self.default {
            Some(Value::Text(s)) => s.clone(),
            _ => self.choices.first().cloned().unwrap_or_default(),
        };
        match raw.map(str::trim) {
            Some(text) if self.choices.is_empty() => text.to_string(),
            Some(text) => self
                .choices
                .iter()
                .find(|c| c.eq_ignore_ascii_case(text))
                .cloned()
                .unwrap_or_else(fallback),
            None => fallback(),
        }
    }
}

/// Coerce every field of `schema` from raw text, falling back per field.
///
/// Raw entries with no matching schema field are dropped.
pub fn coerce_inputs(
    schema: &BTreeMap<String, InputField>,
    raw: &HashMap<String, String>,
) -> Inputs {
    schema
        .iter()
        .map(|(name, field)| (name.clone(), field.coerce_raw(raw.get(name).map(String::as_str))))
        .collect()
}
