//! Canonical registry records, built once from merged sources

use crate::source::{FaqEntry, NameSource, PartialLocaleContent};
use reckon_calculator::FormulaSpec;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Display text for one calculator in one locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleContent {
    pub name: String,
    pub description: String,
    pub faq: Vec<FaqEntry>,
    pub keywords: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl LocaleContent {
    /// Well-formed placeholder used when no locale has content
    pub fn synthetic(calculator_id: &str) -> Self {
        Self {
            name: calculator_id.to_string(),
            description: String::new(),
            faq: Vec::new(),
            keywords: BTreeSet::new(),
            example: None,
        }
    }

    pub(crate) fn from_partial(partial: PartialLocaleContent, fallback_name: &str) -> Self {
        Self {
            name: partial.name.unwrap_or_else(|| fallback_name.to_string()),
            description: partial.description.unwrap_or_default(),
            faq: partial.faq.unwrap_or_default(),
            keywords: partial.keywords.unwrap_or_default().into_iter().collect(),
            example: partial.example,
        }
    }
}

/// A name keyed by locale; plain source names are stored under the default locale
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct LocalizedName(BTreeMap<String, String>);

impl LocalizedName {
    pub(crate) fn from_source(source: Option<NameSource>, default_locale: &str) -> Self {
        match source {
            Some(NameSource::Plain(name)) => Self(BTreeMap::from([(default_locale.to_string(), name)])),
            Some(NameSource::Localized(names)) => Self(names),
            None => Self::default(),
        }
    }

    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryData {
    pub id: String,
    pub name: LocalizedName,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculatorDefinition {
    pub id: String,
    pub slug: String,
    pub category: String,
    /// Never empty once the registry is built
    pub formulas: Vec<FormulaSpec>,
    pub locales: BTreeMap<String, LocaleContent>,
    pub related: Vec<String>,
}

impl CalculatorDefinition {
    pub fn formula_names(&self) -> impl Iterator<Item = &str> {
        self.formulas.iter().map(|f| f.name.as_str())
    }

    /// The formula used when a caller does not name one
    pub fn primary_formula(&self) -> Option<&FormulaSpec> {
        self.formulas.first()
    }
}
