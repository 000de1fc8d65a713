use proptest::prelude::*;
use reckon_calculator::{
    FormulaSpec, FormulaStore, InputField, InputKind, Inputs, OutputKind, Value, coerce, coerce_inputs,
};
use std::collections::HashMap;

fn store() -> FormulaStore {
    let spec = FormulaSpec {
        name: "primary".to_string(),
        input_schema: [
            ("a".to_string(), InputField::new(InputKind::Number)),
            ("b".to_string(), InputField::new(InputKind::Number)),
        ]
        .into(),
        expression: "let ratio = a / b; scaled = ratio ** 2 - ln(abs(a)); positive = scaled > 0".to_string(),
        output_schema: [
            ("scaled".to_string(), OutputKind::Ratio { precision: Some(3) }),
            ("positive".to_string(), OutputKind::Boolean),
        ]
        .into(),
    };
    let mut store = FormulaStore::default();
    store.register_formula("pure", spec).unwrap();
    store
}

proptest! {
    /// Evaluating the same inputs twice gives bit-identical results, NaN included.
    #[test]
    fn prop_evaluation_is_deterministic(a in -1e6f64..1e6, b in prop_oneof![Just(0.0), -1e3f64..1e3]) {
        let store = store();
        let inputs = Inputs::from([("a".to_string(), Value::Number(a)), ("b".to_string(), Value::Number(b))]);

        let first = store.evaluate("pure", "primary", &inputs).unwrap();
        let second = store.evaluate("pure", "primary", &inputs).unwrap();
        prop_assert!(first.bit_eq(&second));
    }

    /// Coercion never yields a non-finite number, whatever the text.
    #[test]
    fn prop_coerce_is_always_finite(raw in ".*", fallback in -1e9f64..1e9) {
        prop_assert!(coerce(&raw, fallback).is_finite());
    }

    /// Clamped fields always land inside their declared range.
    #[test]
    fn prop_coerced_inputs_respect_range(raw in "[-+]?[0-9]{0,12}(\\.[0-9]{0,4})?[a-z]{0,3}") {
        let schema = [(
            "term".to_string(),
            InputField::new(InputKind::Integer).with_range(Some(1.0), Some(40.0)).with_default(30.0),
        )]
        .into();
        let raw_inputs = HashMap::from([("term".to_string(), raw)]);

        let coerced = coerce_inputs(&schema, &raw_inputs);
        let term = coerced["term"].as_number().unwrap();
        prop_assert!((1.0..=40.0).contains(&term));
        prop_assert_eq!(term.fract(), 0.0);
    }
}
