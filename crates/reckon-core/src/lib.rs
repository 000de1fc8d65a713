//! # Reckon Core
//!
//! Builds the immutable calculator [`Registry`] from ordered partial sources,
//! resolves localized content with language fallback and renders results per
//! locale. Formula parsing and evaluation live in `reckon-calculator`.
//!
//! ```rust
//! use reckon_core::{ContentResolver, EngineConfig, Inputs, Registry, ResultFormatter, Value};
//!
//! let config = EngineConfig::default();
//! let registry = Registry::builtin(&config).unwrap();
//!
//! let inputs = Inputs::from([
//!     ("bill".to_string(), Value::Number(80.0)),
//!     ("tipPercent".to_string(), Value::Number(15.0)),
//!     ("people".to_string(), Value::Number(2.0)),
//! ]);
//! let result = registry.evaluate("tip", "primary", &inputs).unwrap();
//!
//! let formatter = ResultFormatter::new(config.formatting.clone(), registry.default_locale());
//! assert_eq!(formatter.format(&result, "en")["perPerson"], "$46.00");
//!
//! let resolver = ContentResolver::new(&registry);
//! assert_eq!(resolver.resolve_content("tip", "de-CH").name, "Trinkgeldrechner");
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod locale;
pub mod merge;
pub mod model;
pub mod registry;
pub mod source;

pub use catalog::builtin_sources;
pub use config::{EngineConfig, FormattingConfig, LocaleConfig};
pub use error::{
    CalculationError, ConfigError, DefinitionError, DefinitionIssue, EvaluationError, InputValidationError,
    IssueKind, Subject,
};
pub use format::{NumberConventions, ResultFormatter, format_number};
pub use locale::{ContentResolver, FallbackLevel, FallbackSnapshot, LocaleFallbackWarning, Resolved, fallback_chain};
pub use model::{CalculatorDefinition, CategoryData, LocaleContent, LocalizedName};
pub use reckon_calculator::{CalculationResult, FormulaSpec, Inputs, Value, coerce};
pub use registry::Registry;
pub use source::{FaqEntry, NameSource, PartialCalculator, PartialCategory, PartialLocaleContent, SourcePayload};
