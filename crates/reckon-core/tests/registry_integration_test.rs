use reckon_core::merge::merge_category;
use reckon_core::{
    CalculationError, ContentResolver, EngineConfig, FallbackLevel, InputValidationError, Inputs, IssueKind,
    NameSource, PartialCategory, Registry, ResultFormatter, SourcePayload, Subject, Value, builtin_sources, coerce,
};
use std::collections::{BTreeMap, HashMap};

fn builtin() -> Registry {
    Registry::builtin(&EngineConfig::default()).unwrap()
}

fn loan_inputs() -> Inputs {
    Inputs::from([
        ("principal".to_string(), Value::Number(10_000.0)),
        ("interestRate".to_string(), Value::Number(5.0)),
        ("loanTerm".to_string(), Value::Number(1.0)),
        ("paymentFrequency".to_string(), Value::from("monthly")),
    ])
}

#[test]
fn loan_payment_reconciles() {
    let registry = builtin();
    let result = registry.evaluate("loan", "primary", &loan_inputs()).unwrap();

    let payment = result.number("payment").unwrap();
    let total = result.number("totalPayment").unwrap();
    let interest = result.number("totalInterest").unwrap();

    assert!(payment > 0.0);
    assert!((total - payment * 12.0).abs() <= 1e-2);
    assert!((interest - (total - 10_000.0)).abs() <= 1e-2);
    assert!(result.number("effectiveRate").unwrap() > 0.0);
    assert_eq!(result.number("numberOfPayments"), Some(12.0));
    assert!((payment - 856.07).abs() < 0.005, "payment was {payment}");
}

#[test]
fn evaluation_is_pure() {
    let registry = builtin();
    let first = registry.evaluate("loan", "primary", &loan_inputs()).unwrap();
    for _ in 0..10 {
        assert!(registry.evaluate("loan", "primary", &loan_inputs()).unwrap().bit_eq(&first));
    }
}

#[test]
fn missing_optional_input_is_not_defaulted_by_evaluate() {
    let registry = builtin();
    let inputs = Inputs::from([
        ("principal".to_string(), Value::Number(1000.0)),
        ("annualRate".to_string(), Value::Number(5.0)),
        ("years".to_string(), Value::Number(10.0)),
        ("compoundsPerYear".to_string(), Value::Number(12.0)),
    ]);

    match registry.evaluate("compound-interest", "primary", &inputs) {
        Err(CalculationError::Input(InputValidationError::MissingField { field, calculator_id, .. })) => {
            assert_eq!(field, "monthlyContribution");
            assert_eq!(calculator_id, "compound-interest");
        }
        other => panic!("Expected a missing field error, got {other:?}"),
    }

    let raw: HashMap<String, String> = inputs.iter().map(|(k, v)| (k.clone(), v.to_string())).collect();
    let result = registry.evaluate_raw("compound-interest", "primary", &raw).unwrap();
    assert_eq!(result.number("totalContributions"), Some(1000.0));
}

#[test]
fn coercion_is_safe() {
    assert_eq!(coerce("", 3.0), 3.0);
    assert_eq!(coerce("abc", 3.0), 3.0);
    assert_eq!(coerce("NaN", 3.0), 3.0);
    assert_eq!(coerce("Infinity", 3.0), 3.0);
    assert_eq!(coerce("42.5", 0.0), 42.5);
}

#[test]
fn raw_form_input_flows_through_coercion() {
    let registry = builtin();
    let raw = HashMap::from([
        ("weight".to_string(), "72.5kg".to_string()),
        ("height".to_string(), "abc".to_string()),
    ]);

    let result = registry.evaluate_raw("bmi", "primary", &raw).unwrap();
    let bmi = result.number("bmi").unwrap();
    assert!((bmi - 72.5 / (1.75 * 1.75)).abs() < 1e-9);
    assert_eq!(result.value("category"), Some(&Value::from("normal")));
}

#[test]
fn merge_is_idempotent_and_deterministic() {
    let baseline = PartialCategory {
        color: Some("#111".to_string()),
        description: Some("base".to_string()),
        ..PartialCategory::new("finance")
    };
    let overlay = PartialCategory {
        name: Some(NameSource::Localized(BTreeMap::from([("en".to_string(), "X".to_string())]))),
        ..PartialCategory::new("finance")
    };

    let mut once = baseline.clone();
    merge_category(&mut once, &overlay, "en").unwrap();
    let mut twice = once.clone();
    merge_category(&mut twice, &overlay, "en").unwrap();
    assert_eq!(once, twice);

    assert_eq!(once.color.as_deref(), Some("#111"));
    assert_eq!(once.description.as_deref(), Some("base"));
    assert_eq!(once.name, overlay.name);

    let sources = builtin_sources().unwrap();
    let config = EngineConfig::default();
    let a = Registry::load(&sources, &config).unwrap();
    let b = Registry::load(&sources, &config).unwrap();
    assert!(a.categories().eq(b.categories()));
    assert!(a.calculators().eq(b.calculators()));
}

#[test]
fn reapplying_an_overlay_source_changes_nothing() {
    let mut sources = builtin_sources().unwrap();
    let config = EngineConfig::default();
    let once = Registry::load(&sources, &config).unwrap();

    let overlay = sources[1].clone();
    sources.push(overlay);
    let twice = Registry::load(&sources, &config).unwrap();

    assert!(once.categories().eq(twice.categories()));
    assert!(once.calculators().eq(twice.calculators()));
}

#[test]
fn localized_category_names_win() {
    let registry = builtin();
    let resolver = ContentResolver::new(&registry);

    let finance = registry.category("finance").unwrap();
    assert_eq!(finance.color.as_deref(), Some("#1f6feb"));
    assert_eq!(finance.description, "Loans, savings and interest");
    assert_eq!(resolver.category_name("finance", "de"), "Finanzen");
    assert_eq!(resolver.category_name("health", "es-MX"), "Salud");
    assert_eq!(resolver.category_name("math", "xx"), "Math");
    assert_eq!(resolver.category_name("unknown", "en"), "unknown");
}

#[test]
fn locale_fallback_never_fails() {
    let registry = builtin();
    let resolver = ContentResolver::new(&registry);

    let content = resolver.resolve_content("bmi", "xx-ZZ");
    assert_eq!(content.name, "BMI Calculator");
    assert!(!content.faq.is_empty());

    let resolved = resolver.resolve("bmi", "fr-CA");
    assert_eq!(resolved.level, FallbackLevel::BaseLanguage);
    assert_eq!(resolved.locale.as_deref(), Some("fr"));
    assert_eq!(resolved.content.name, "Calculateur d'IMC");

    let exact = resolver.resolve("bmi", "de");
    assert_eq!(exact.level, FallbackLevel::Exact);
    assert!(exact.warning.is_none());

    let synthetic = resolver.resolve("no-such-calculator", "en");
    assert_eq!(synthetic.level, FallbackLevel::Synthetic);
    assert_eq!(synthetic.content.name, "no-such-calculator");
    assert!(synthetic.content.description.is_empty() && synthetic.content.keywords.is_empty());
    let warning = synthetic.warning.unwrap();
    assert_eq!(warning.served, "synthetic");

    let stats = resolver.stats();
    assert_eq!((stats.base_language, stats.default_locale, stats.synthetic), (1, 1, 1));
}

#[test]
fn undeclared_input_rejects_the_whole_registry() {
    let mut sources = builtin_sources().unwrap();
    let bmi = sources[0].calculators.iter_mut().find(|c| c.id == "bmi").unwrap();
    bmi.formulas[0].expression = bmi.formulas[0].expression.replace("weight /", "mass /");

    let err = Registry::load(&sources, &EngineConfig::default()).unwrap_err();
    assert!(err.names_calculator("bmi"));
    assert_eq!(err.offending(), vec![&Subject::Calculator("bmi".to_string())]);
    assert!(matches!(&err.issues[0].kind, IssueKind::Formula(e) if e.to_string().contains("'mass'")));
}

#[test]
fn conflicting_slugs_are_rejected() {
    let mut sources = builtin_sources().unwrap();
    sources.push(SourcePayload {
        name: "conflicting".to_string(),
        categories: vec![PartialCategory { slug: Some("money".to_string()), ..PartialCategory::new("finance") }],
        calculators: Vec::new(),
    });

    let err = Registry::load(&sources, &EngineConfig::default()).unwrap_err();
    assert_eq!(err.offending(), vec![&Subject::Category("finance".to_string())]);
}

#[test]
fn registry_queries() {
    let registry = builtin();

    assert_eq!(registry.categories().count(), 4);
    assert_eq!(registry.calculators().count(), 5);
    let finance: Vec<&str> = registry.calculators_in("finance").iter().map(|c| c.id.as_str()).collect();
    assert_eq!(finance, ["compound-interest", "loan"]);
    assert_eq!(registry.find_by_slug("health", "bmi").map(|c| c.id.as_str()), Some("bmi"));
    assert_eq!(registry.related("loan")[0].id, "compound-interest");
    assert_eq!(registry.locales_for("tip"), ["de", "en", "es", "fr"]);
    assert_eq!(registry.calculator("percentage").unwrap().formula_names().collect::<Vec<_>>(), ["primary", "change"]);
}

#[test]
fn results_format_per_locale() {
    let config = EngineConfig::default();
    let registry = Registry::builtin(&config).unwrap();
    let formatter = ResultFormatter::new(config.formatting.clone(), registry.default_locale());
    let result = registry.evaluate("loan", "primary", &loan_inputs()).unwrap();

    let en = formatter.format(&result, "en");
    assert_eq!(en["payment"], "$856.07");
    assert_eq!(en["totalPayment"], "$10,272.90");
    assert_eq!(en["numberOfPayments"], "12");
    assert_eq!(en["effectiveRate"], "5.12%");

    let de = formatter.format(&result, "de-DE");
    assert_eq!(de["totalPayment"], "10.272,90\u{a0}$");
}
