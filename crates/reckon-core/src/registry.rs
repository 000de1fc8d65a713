//! The immutable calculator registry
//!
//! A [`Registry`] is built once from an ordered list of partial sources and
//! never changes afterwards. It owns the compiled formulas, so every formula
//! is validated exactly once, during [`Registry::load`].

use crate::config::EngineConfig;
use crate::error::{DefinitionError, DefinitionIssue, IssueKind};
use crate::merge::{merge_calculator, merge_category};
use crate::model::{CalculatorDefinition, CategoryData, LocaleContent, LocalizedName};
use crate::source::{PartialCalculator, PartialCategory, SourcePayload};
use reckon_calculator::{CalculationError, CalculationResult, FormulaStore, Inputs, coerce_inputs};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, error, info, instrument};

#[derive(Debug)]
pub struct Registry {
    calculators: BTreeMap<String, CalculatorDefinition>,
    categories: BTreeMap<String, CategoryData>,
    formulas: FormulaStore,
    default_locale: String,
}

impl Registry {
    /// Merge `sources` in order, validate everything and compile every formula.
    ///
    /// Fails with every problem found, not just the first.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub fn load(sources: &[SourcePayload], config: &EngineConfig) -> Result<Self, DefinitionError> {
        let default_locale = config.locale.default_locale.as_str();
        let mut issues = Vec::new();
        let mut categories: BTreeMap<String, PartialCategory> = BTreeMap::new();
        let mut calculators: BTreeMap<String, PartialCalculator> = BTreeMap::new();

        for source in sources {
            debug!(
                source = %source.name,
                categories = source.categories.len(),
                calculators = source.calculators.len(),
                "Merging source"
            );

            for category in &source.categories {
                if category.id.trim().is_empty() {
                    issues.push(DefinitionIssue::source(&source.name, IssueKind::EmptyId));
                    continue;
                }
                let base =
                    categories.entry(category.id.clone()).or_insert_with(|| PartialCategory::new(&category.id));
                if let Err(kind) = merge_category(base, category, default_locale) {
                    issues.push(DefinitionIssue::category(&category.id, kind));
                }
            }

            for calculator in &source.calculators {
                if calculator.id.trim().is_empty() {
                    issues.push(DefinitionIssue::source(&source.name, IssueKind::EmptyId));
                    continue;
                }
                let base = calculators
                    .entry(calculator.id.clone())
                    .or_insert_with(|| PartialCalculator::new(&calculator.id));
                if let Err(kind) = merge_calculator(base, calculator) {
                    issues.push(DefinitionIssue::calculator(&calculator.id, kind));
                }
            }
        }

        let categories: BTreeMap<String, CategoryData> = categories
            .into_iter()
            .map(|(id, partial)| (id, build_category(partial, default_locale)))
            .collect();

        let known_ids: BTreeSet<String> = calculators.keys().cloned().collect();
        let mut formulas = FormulaStore::new(config.limits.clone());
        let mut slugs: HashMap<(String, String), String> = HashMap::new();
        let mut definitions = BTreeMap::new();

        for (id, partial) in calculators {
            let category = match &partial.category {
                None => {
                    issues.push(DefinitionIssue::calculator(&id, IssueKind::MissingCategory));
                    None
                }
                Some(category) if !categories.contains_key(category) => {
                    issues.push(DefinitionIssue::calculator(
                        &id,
                        IssueKind::UnknownCategory { category: category.clone() },
                    ));
                    None
                }
                Some(category) => Some(category.clone()),
            };

            if partial.formulas.is_empty() {
                issues.push(DefinitionIssue::calculator(&id, IssueKind::NoFormulas));
            }
            for formula in &partial.formulas {
                if let Err(e) = formulas.register_formula(&id, formula.clone()) {
                    issues.push(DefinitionIssue::calculator(&id, e));
                }
            }

            for related in &partial.related {
                if *related == id {
                    issues.push(DefinitionIssue::calculator(&id, IssueKind::SelfRelated));
                } else if !known_ids.contains(related) {
                    issues.push(DefinitionIssue::calculator(
                        &id,
                        IssueKind::UnknownRelated { related: related.clone() },
                    ));
                }
            }

            let slug = partial.slug.clone().unwrap_or_else(|| id.clone());
            let Some(category) = category else {
                continue;
            };
            if let Some(other) = slugs.insert((category.clone(), slug.clone()), id.clone()) {
                issues.push(DefinitionIssue::calculator(&id, IssueKind::DuplicateSlug { slug: slug.clone(), other }));
            }

            definitions.insert(id.clone(), build_calculator(id, slug, category, partial, default_locale));
        }

        if !issues.is_empty() {
            error!(issues = issues.len(), "Registry definition rejected");
            return Err(DefinitionError { issues });
        }

        info!(calculators = definitions.len(), categories = categories.len(), "Registry loaded");
        Ok(Self { calculators: definitions, categories, formulas, default_locale: default_locale.to_string() })
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn calculator(&self, id: &str) -> Option<&CalculatorDefinition> {
        self.calculators.get(id)
    }

    /// All calculators, ordered by id
    pub fn calculators(&self) -> impl Iterator<Item = &CalculatorDefinition> {
        self.calculators.values()
    }

    pub fn category(&self, id: &str) -> Option<&CategoryData> {
        self.categories.get(id)
    }

    /// All categories, ordered by id
    pub fn categories(&self) -> impl Iterator<Item = &CategoryData> {
        self.categories.values()
    }

    pub fn calculators_in(&self, category: &str) -> Vec<&CalculatorDefinition> {
        self.calculators.values().filter(|c| c.category == category).collect()
    }

    pub fn find_by_slug(&self, category: &str, slug: &str) -> Option<&CalculatorDefinition> {
        self.calculators.values().find(|c| c.category == category && c.slug == slug)
    }

    /// Related calculators in declared order; empty for an unknown id
    pub fn related(&self, id: &str) -> Vec<&CalculatorDefinition> {
        self.calculator(id)
            .map(|c| c.related.iter().filter_map(|r| self.calculators.get(r)).collect())
            .unwrap_or_default()
    }

    pub fn locales_for(&self, id: &str) -> Vec<&str> {
        self.calculator(id).map(|c| c.locales.keys().map(String::as_str).collect()).unwrap_or_default()
    }

    pub fn formulas(&self) -> &FormulaStore {
        &self.formulas
    }

    /// Evaluate one formula against already typed inputs
    #[instrument(skip(self, inputs), fields(input_count = inputs.len()))]
    pub fn evaluate(
        &self,
        calculator_id: &str,
        formula_name: &str,
        inputs: &Inputs,
    ) -> Result<CalculationResult, CalculationError> {
        let result = self.formulas.evaluate(calculator_id, formula_name, inputs);
        if let Err(e) = &result {
            debug!(category = e.category(), error = %e, "Evaluation failed");
        }
        result
    }

    /// Coerce raw text per the formula's input schema, then evaluate
    pub fn evaluate_raw(
        &self,
        calculator_id: &str,
        formula_name: &str,
        raw: &HashMap<String, String>,
    ) -> Result<CalculationResult, CalculationError> {
        let inputs = self
            .formulas
            .get(calculator_id, formula_name)
            .map(|formula| coerce_inputs(&formula.spec().input_schema, raw))
            .unwrap_or_default();
        self.evaluate(calculator_id, formula_name, &inputs)
    }
}

fn build_category(partial: PartialCategory, default_locale: &str) -> CategoryData {
    CategoryData {
        name: LocalizedName::from_source(partial.name, default_locale),
        id: partial.id,
        description: partial.description.unwrap_or_default(),
        icon: partial.icon,
        color: partial.color,
        slug: partial.slug,
    }
}

fn build_calculator(
    id: String,
    slug: String,
    category: String,
    partial: PartialCalculator,
    default_locale: &str,
) -> CalculatorDefinition {
    // Locales without a name borrow the default locale's name
    let fallback_name = partial
        .locales
        .get(default_locale)
        .and_then(|content| content.name.clone())
        .unwrap_or_else(|| id.clone());

    let locales = partial
        .locales
        .into_iter()
        .map(|(locale, content)| (locale, LocaleContent::from_partial(content, &fallback_name)))
        .collect();

    CalculatorDefinition { id, slug, category, formulas: partial.formulas, locales, related: partial.related }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Subject;
    use crate::source::{NameSource, PartialLocaleContent};
    use reckon_calculator::{FormulaSpec, InputField, InputKind, OutputKind, Value};

    fn double_formula() -> FormulaSpec {
        FormulaSpec {
            name: "primary".to_string(),
            input_schema: [("x".to_string(), InputField::new(InputKind::Number))].into(),
            expression: "doubled = x * 2".to_string(),
            output_schema: [("doubled".to_string(), OutputKind::Number { precision: None })].into(),
        }
    }

    fn calculator(id: &str, category: &str) -> PartialCalculator {
        PartialCalculator {
            category: Some(category.to_string()),
            formulas: vec![double_formula()],
            ..PartialCalculator::new(id)
        }
    }

    fn source(categories: Vec<PartialCategory>, calculators: Vec<PartialCalculator>) -> SourcePayload {
        SourcePayload { name: "test".to_string(), categories, calculators }
    }

    #[test]
    fn test_load_and_query() {
        let mut first = calculator("first", "math");
        first.related = vec!["second".to_string()];
        let mut second = calculator("second", "math");
        second.slug = Some("twice".to_string());
        second.locales.insert(
            "en".to_string(),
            PartialLocaleContent { name: Some("Second".to_string()), ..PartialLocaleContent::default() },
        );
        second.locales.insert("de".to_string(), PartialLocaleContent::default());

        let registry = Registry::load(
            &[source(vec![PartialCategory::new("math")], vec![first, second])],
            &EngineConfig::default(),
        )
        .unwrap();

        assert_eq!(registry.calculators_in("math").len(), 2);
        assert_eq!(registry.find_by_slug("math", "first").map(|c| c.id.as_str()), Some("first"));
        assert_eq!(registry.find_by_slug("math", "twice").map(|c| c.id.as_str()), Some("second"));
        assert_eq!(registry.related("first")[0].id, "second");
        assert_eq!(registry.locales_for("second"), ["de", "en"]);
        assert_eq!(registry.calculator("second").unwrap().locales["de"].name, "Second");
        assert!(registry.related("missing").is_empty());

        let inputs = Inputs::from([("x".to_string(), Value::Number(21.0))]);
        assert_eq!(registry.evaluate("first", "primary", &inputs).unwrap().number("doubled"), Some(42.0));
    }

    #[test]
    fn test_every_offending_id_is_reported() {
        let mut orphan = calculator("orphan", "nowhere");
        orphan.related = vec!["orphan".to_string(), "ghost".to_string()];
        let mut broken = calculator("broken", "math");
        broken.formulas[0].expression = "doubled = y * 2".to_string();
        let empty = PartialCalculator { category: Some("math".to_string()), ..PartialCalculator::new("empty") };

        let err = Registry::load(
            &[source(vec![PartialCategory::new("math")], vec![orphan, broken, empty])],
            &EngineConfig::default(),
        )
        .unwrap_err();

        assert_eq!(
            err.offending(),
            vec![
                &Subject::Calculator("broken".to_string()),
                &Subject::Calculator("empty".to_string()),
                &Subject::Calculator("orphan".to_string()),
            ]
        );
        let kinds: Vec<&IssueKind> = err.issues.iter().map(|i| &i.kind).collect();
        assert!(kinds.contains(&&IssueKind::SelfRelated));
        assert!(kinds.contains(&&IssueKind::UnknownRelated { related: "ghost".to_string() }));
        assert!(kinds.contains(&&IssueKind::UnknownCategory { category: "nowhere".to_string() }));
        assert!(kinds.contains(&&IssueKind::NoFormulas));
    }

    #[test]
    fn test_duplicate_slug_within_category() {
        let mut a = calculator("a", "math");
        a.slug = Some("same".to_string());
        let mut b = calculator("b", "math");
        b.slug = Some("same".to_string());

        let err =
            Registry::load(&[source(vec![PartialCategory::new("math")], vec![a, b])], &EngineConfig::default())
                .unwrap_err();
        assert_eq!(
            err.issues,
            vec![DefinitionIssue::calculator(
                "b",
                IssueKind::DuplicateSlug { slug: "same".to_string(), other: "a".to_string() }
            )]
        );
    }

    #[test]
    fn test_plain_category_name_is_canonicalized() {
        let category = PartialCategory {
            name: Some(NameSource::Plain("Mathematics".to_string())),
            ..PartialCategory::new("math")
        };
        let registry =
            Registry::load(&[source(vec![category], vec![calculator("x", "math")])], &EngineConfig::default())
                .unwrap();

        assert_eq!(registry.category("math").unwrap().name.get("en"), Some("Mathematics"));
    }

    #[test]
    fn test_evaluate_raw_coerces_first() {
        let registry = Registry::load(
            &[source(vec![PartialCategory::new("math")], vec![calculator("double", "math")])],
            &EngineConfig::default(),
        )
        .unwrap();

        let raw = HashMap::from([("x".to_string(), "4.5 units".to_string())]);
        let result = registry.evaluate_raw("double", "primary", &raw).unwrap();
        assert_eq!(result.number("doubled"), Some(9.0));
    }
}
