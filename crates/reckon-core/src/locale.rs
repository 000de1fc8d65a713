//! Locale content resolution with language fallback
//!
//! Lookup order is exact locale, base language, the registry's default
//! locale, then a synthetic placeholder. Resolution never fails; every
//! fallback is logged as a [`LocaleFallbackWarning`] and counted.

use crate::model::LocaleContent;
use crate::registry::Registry;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use unic_langid::LanguageIdentifier;

/// Where resolved content came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackLevel {
    Exact,
    BaseLanguage,
    DefaultLocale,
    Synthetic,
}

/// Requested locale was unavailable and other content was served
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleFallbackWarning {
    pub calculator_id: String,
    pub requested: String,
    pub served: String,
}

impl fmt::Display for LocaleFallbackWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no '{}' content for calculator '{}', served '{}'",
            self.requested, self.calculator_id, self.served
        )
    }
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub content: LocaleContent,
    /// Locale key actually used; `None` for synthetic content
    pub locale: Option<String>,
    pub level: FallbackLevel,
    pub warning: Option<LocaleFallbackWarning>,
}

#[derive(Debug, Default)]
struct FallbackStats {
    base_language: AtomicU64,
    default_locale: AtomicU64,
    synthetic: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FallbackSnapshot {
    pub base_language: u64,
    pub default_locale: u64,
    pub synthetic: u64,
}

/// Resolves display text against a registry, counting fallbacks.
///
/// Counters use relaxed atomics, so one resolver can be shared across threads.
#[derive(Debug)]
pub struct ContentResolver<'r> {
    registry: &'r Registry,
    stats: FallbackStats,
}

impl<'r> ContentResolver<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry, stats: FallbackStats::default() }
    }

    /// Best available content for `calculator_id` in `locale`
    pub fn resolve_content(&self, calculator_id: &str, locale: &str) -> LocaleContent {
        self.resolve(calculator_id, locale).content
    }

    pub fn resolve(&self, calculator_id: &str, locale: &str) -> Resolved {
        let default_locale = self.registry.default_locale();
        let found = self.registry.calculator(calculator_id).and_then(|calculator| {
            fallback_chain(locale, default_locale).into_iter().find_map(|(candidate, level)| {
                calculator.locales.get(&candidate).map(|content| (candidate, level, content.clone()))
            })
        });

        let (served, level, content) = match found {
            Some((candidate, level, content)) => (Some(candidate), level, content),
            None => (None, FallbackLevel::Synthetic, LocaleContent::synthetic(calculator_id)),
        };

        let warning = (level != FallbackLevel::Exact).then(|| {
            self.record(level);
            let warning = LocaleFallbackWarning {
                calculator_id: calculator_id.to_string(),
                requested: locale.to_string(),
                served: served.clone().unwrap_or_else(|| "synthetic".to_string()),
            };
            warn!(
                calculator_id = %warning.calculator_id,
                requested = %warning.requested,
                served = %warning.served,
                level = ?level,
                "Locale fallback: {}",
                warning
            );
            warning
        });

        Resolved { content, locale: served, level, warning }
    }

    /// Category display name through the same fallback chain; the id when nothing matches
    pub fn category_name(&self, category_id: &str, locale: &str) -> String {
        let Some(category) = self.registry.category(category_id) else {
            return category_id.to_string();
        };

        fallback_chain(locale, self.registry.default_locale())
            .into_iter()
            .find_map(|(candidate, level)| {
                category.name.get(&candidate).map(|name| {
                    if level != FallbackLevel::Exact {
                        debug!(category_id, requested = locale, served = %candidate, "Category name fallback");
                    }
                    name.to_string()
                })
            })
            .unwrap_or_else(|| {
                debug!(category_id, requested = locale, "No category name in any locale");
                category_id.to_string()
            })
    }

    pub fn stats(&self) -> FallbackSnapshot {
        FallbackSnapshot {
            base_language: self.stats.base_language.load(Ordering::Relaxed),
            default_locale: self.stats.default_locale.load(Ordering::Relaxed),
            synthetic: self.stats.synthetic.load(Ordering::Relaxed),
        }
    }

    fn record(&self, level: FallbackLevel) {
        let counter = match level {
            FallbackLevel::Exact => return,
            FallbackLevel::BaseLanguage => &self.stats.base_language,
            FallbackLevel::DefaultLocale => &self.stats.default_locale,
            FallbackLevel::Synthetic => &self.stats.synthetic,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Candidate locale keys in lookup order, without duplicates.
///
/// An unparsable tag goes straight to the default locale.
pub fn fallback_chain(requested: &str, default_locale: &str) -> Vec<(String, FallbackLevel)> {
    let mut chain: Vec<(String, FallbackLevel)> = Vec::with_capacity(4);
    let mut push = |candidate: String, level: FallbackLevel| {
        if !chain.iter().any(|(existing, _)| *existing == candidate) {
            chain.push((candidate, level));
        }
    };

    let parsed = requested.parse::<LanguageIdentifier>().ok().filter(|_| !requested.trim().is_empty());
    if let Some(langid) = parsed {
        push(requested.to_string(), FallbackLevel::Exact);
        push(langid.to_string(), FallbackLevel::Exact);
        push(langid.language.as_str().to_string(), FallbackLevel::BaseLanguage);
    }
    push(default_locale.to_string(), FallbackLevel::DefaultLocale);

    chain
}
