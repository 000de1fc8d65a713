//! Engine configuration loaded from TOML with `RECKON_*` environment overrides

use crate::error::ConfigError;
use reckon_calculator::ExpressionLimits;
use serde::{Deserialize, Serialize};
use tracing::info;
use unic_langid::LanguageIdentifier;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LocaleConfig {
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self { default_locale: default_locale() }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FormattingConfig {
    /// ISO 4217 code used for currency outputs
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_ratio_precision")]
    pub ratio_precision: u8,
    #[serde(default = "default_number_precision")]
    pub number_precision: u8,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            ratio_precision: default_ratio_precision(),
            number_precision: default_number_precision(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub locale: LocaleConfig,
    #[serde(default)]
    pub limits: ExpressionLimits,
    #[serde(default)]
    pub formatting: FormattingConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document; missing sections take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RECKON_*` overrides supplied by `lookup`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(locale) = lookup("RECKON_DEFAULT_LOCALE") {
            info!(locale = %locale, "Overriding default locale");
            self.locale.default_locale = locale;
        }
        if let Some(currency) = lookup("RECKON_CURRENCY") {
            info!(currency = %currency, "Overriding currency");
            self.formatting.currency = currency;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.locale.default_locale.parse::<LanguageIdentifier>().is_err() {
            return Err(ConfigError::Invalid {
                field: "locale.default_locale",
                reason: format!("'{}' is not a valid language tag", self.locale.default_locale),
            });
        }

        let currency = &self.formatting.currency;
        if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ConfigError::Invalid {
                field: "formatting.currency",
                reason: format!("'{currency}' is not a three-letter ISO 4217 code"),
            });
        }
        for (field, precision) in [
            ("formatting.ratio_precision", self.formatting.ratio_precision),
            ("formatting.number_precision", self.formatting.number_precision),
        ] {
            if precision > MAX_PRECISION {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{precision} exceeds the maximum of {MAX_PRECISION}"),
                });
            }
        }

        for (field, limit) in [
            ("limits.max_expression_length", self.limits.max_expression_length),
            ("limits.max_expression_nodes", self.limits.max_expression_nodes),
            ("limits.max_expression_depth", self.limits.max_expression_depth),
        ] {
            if limit == 0 {
                return Err(ConfigError::Invalid { field, reason: "must be greater than zero".to_string() });
            }
        }

        Ok(())
    }
}

const MAX_PRECISION: u8 = 15;

fn default_locale() -> String {
    "en".to_string()
}
fn default_currency() -> String {
    "USD".to_string()
}
fn default_ratio_precision() -> u8 {
    2
}
fn default_number_precision() -> u8 {
    2
}
