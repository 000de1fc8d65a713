//! Locale-aware rendering of calculation results
//!
//! Rounding happens here and nowhere else; results carry full precision.

use crate::config::FormattingConfig;
use num_format::{Grouping, Locale};
use reckon_calculator::{CalculationResult, OutputKind};
use reckon_types::Value;
use std::collections::BTreeMap;
use unic_langid::LanguageIdentifier;

/// Separators, grouping and symbol placement for one locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberConventions {
    pub group: &'static str,
    pub decimal: &'static str,
    pub minus: &'static str,
    /// Digits in the group nearest the decimal point; 0 disables grouping
    pub primary_group: usize,
    pub secondary_group: usize,
    pub percent: &'static str,
    pub currency_prefix: bool,
}

impl NumberConventions {
    pub fn from_num_format(locale: Locale) -> Self {
        let (primary_group, secondary_group) = match locale.grouping() {
            Grouping::Standard => (3, 3),
            Grouping::Indian => (3, 2),
            Grouping::Posix => (0, 0),
        };
        // Point-decimal locales write the symbol first
        let currency_prefix = locale.decimal() == ".";
        Self {
            group: locale.separator(),
            decimal: locale.decimal(),
            minus: locale.minus_sign(),
            primary_group,
            secondary_group,
            percent: if currency_prefix { "%" } else { "\u{a0}%" },
            currency_prefix,
        }
    }

    /// Conventions for a locale tag; unknown or unparsable tags use `fallback`'s, then English
    pub fn for_locale(locale: &str, fallback: &str) -> Self {
        let locale = num_format_locale(locale).or_else(|| num_format_locale(fallback)).unwrap_or(Locale::en);
        Self::from_num_format(locale)
    }
}

// Full tag first, then its language alone
fn num_format_locale(tag: &str) -> Option<Locale> {
    let id = tag.parse::<LanguageIdentifier>().ok()?;
    Locale::from_name(id.to_string()).or_else(|_| Locale::from_name(id.language.as_str())).ok()
}

/// Currency symbol for an ISO code; the code itself when unknown
pub fn currency_symbol(code: &str) -> &str {
    match code {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "INR" => "₹",
        _ => code,
    }
}

/// Stateless renderer for [`CalculationResult`]s
#[derive(Debug, Clone)]
pub struct ResultFormatter {
    config: FormattingConfig,
    default_locale: String,
}

impl ResultFormatter {
    pub fn new(config: FormattingConfig, default_locale: &str) -> Self {
        Self { config, default_locale: default_locale.to_string() }
    }

    /// Render every field of `result` for display in `locale`
    pub fn format(&self, result: &CalculationResult, locale: &str) -> BTreeMap<String, String> {
        let conventions = NumberConventions::for_locale(locale, &self.default_locale);
        result
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), self.format_value(&field.value, field.kind, &conventions)))
            .collect()
    }

    pub fn format_value(&self, value: &Value, kind: OutputKind, conventions: &NumberConventions) -> String {
        let number = match value {
            Value::Number(n) => *n,
            Value::Text(text) => return text.clone(),
            Value::Boolean(flag) => return flag.to_string(),
        };

        match kind {
            OutputKind::Currency => {
                let amount = format_number(number, 2, conventions);
                let symbol = currency_symbol(&self.config.currency);
                match (conventions.currency_prefix, amount.strip_prefix(conventions.minus)) {
                    (true, Some(unsigned)) => format!("{}{symbol}{unsigned}", conventions.minus),
                    (true, None) => format!("{symbol}{amount}"),
                    (false, _) => format!("{amount}\u{a0}{symbol}"),
                }
            }
            OutputKind::Percent { precision } => {
                let digits = precision.unwrap_or(self.config.ratio_precision);
                format!("{}{}", format_number(number, digits, conventions), conventions.percent)
            }
            OutputKind::Ratio { precision } => {
                format_number(number, precision.unwrap_or(self.config.ratio_precision), conventions)
            }
            OutputKind::Number { precision } => {
                format_number(number, precision.unwrap_or(self.config.number_precision), conventions)
            }
            OutputKind::Integer => format_number(number, 0, conventions),
            OutputKind::Text | OutputKind::Boolean => number.to_string(),
        }
    }
}

/// Fixed-point rendering with grouping; infinities render as `∞`
pub fn format_number(value: f64, fraction_digits: u8, conventions: &NumberConventions) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { conventions.minus } else { "" };
        return format!("{sign}∞");
    }

    let fixed = format!("{:.*}", usize::from(fraction_digits), value.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((&fixed, ""));

    let mut out = String::with_capacity(fixed.len() + integer.len() / 2 * conventions.group.len() + 4);
    // Rounds to zero: no sign
    if value < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        out.push_str(conventions.minus);
    }
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && starts_group(integer.len() - i, conventions) {
            out.push_str(conventions.group);
        }
        out.push(digit);
    }
    if !fraction.is_empty() {
        out.push_str(conventions.decimal);
        out.push_str(fraction);
    }
    out
}

// Whether a separator goes before the digit with `remaining` digits at and after it
fn starts_group(remaining: usize, conventions: &NumberConventions) -> bool {
    let (primary, secondary) = (conventions.primary_group, conventions.secondary_group);
    if primary == 0 || remaining < primary {
        return false;
    }
    remaining == primary || (secondary > 0 && (remaining - primary) % secondary == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reckon_calculator::ResultField;

    fn result(fields: &[(&str, Value, OutputKind)]) -> CalculationResult {
        CalculationResult {
            calculator_id: "test".to_string(),
            formula_name: "primary".to_string(),
            fields: fields
                .iter()
                .map(|(name, value, kind)| (name.to_string(), ResultField { value: value.clone(), kind: *kind }))
                .collect(),
        }
    }

    fn conventions(tag: &str) -> NumberConventions {
        NumberConventions::for_locale(tag, "en")
    }

    #[test]
    fn test_format_number_grouping() {
        assert_eq!(format_number(1234567.891, 2, &conventions("en")), "1,234,567.89");
        assert_eq!(format_number(1234567.891, 2, &conventions("de")), "1.234.567,89");
        assert_eq!(format_number(999.0, 0, &conventions("en")), "999");
        assert_eq!(format_number(-0.001, 2, &conventions("en")), "0.00");
        assert_eq!(format_number(-1500.5, 1, &conventions("en")), "-1,500.5");
        assert_eq!(format_number(f64::INFINITY, 2, &conventions("en")), "∞");
        assert_eq!(format_number(f64::NEG_INFINITY, 2, &conventions("en")), "-∞");
        assert_eq!(format_number(f64::NAN, 2, &conventions("en")), "NaN");
    }

    #[test]
    fn test_group_sizes() {
        let base = conventions("en");
        let indian = NumberConventions { primary_group: 3, secondary_group: 2, ..base };
        assert_eq!(format_number(1234567.0, 0, &indian), "12,34,567");
        assert_eq!(format_number(123.0, 0, &indian), "123");

        let ungrouped = NumberConventions { primary_group: 0, secondary_group: 0, ..base };
        assert_eq!(format_number(1234567.25, 2, &ungrouped), "1234567.25");

        let spaced = NumberConventions { group: "\u{a0}", decimal: ",", ..base };
        assert_eq!(format_number(1000.0, 0, &spaced), "1\u{a0}000");
    }

    #[test]
    fn test_locale_conventions() {
        let de = conventions("de-AT");
        assert_eq!((de.decimal, de.currency_prefix), (",", false));
        assert_eq!(conventions("fr").group, Locale::fr.separator());
        assert_eq!(conventions("xx-ZZ"), NumberConventions::from_num_format(Locale::en));
        assert_eq!(NumberConventions::for_locale("???", "de").decimal, ",");
        assert_eq!(NumberConventions::for_locale("???", "???"), NumberConventions::from_num_format(Locale::en));
    }

    #[test]
    fn test_currency_is_rounded_only_for_display() {
        let formatter = ResultFormatter::new(FormattingConfig::default(), "en");
        let payment = 856.074_818_4;
        let result = result(&[
            ("payment", Value::Number(payment), OutputKind::Currency),
            ("loss", Value::Number(-12.5), OutputKind::Currency),
            ("rate", Value::Number(5.116_189_788), OutputKind::Percent { precision: Some(3) }),
            ("bmi", Value::Number(22.857), OutputKind::Ratio { precision: Some(1) }),
            ("payments", Value::Number(12.0), OutputKind::Integer),
            ("category", Value::from("normal"), OutputKind::Text),
        ]);

        let en = formatter.format(&result, "en-US");
        assert_eq!(en["payment"], "$856.07");
        assert_eq!(en["loss"], "-$12.50");
        assert_eq!(en["rate"], "5.116%");
        assert_eq!(en["bmi"], "22.9");
        assert_eq!(en["payments"], "12");
        assert_eq!(en["category"], "normal");
        assert_eq!(result.number("payment"), Some(payment));

        let de = formatter.format(&result, "de");
        assert_eq!(de["payment"], "856,07\u{a0}$");
        assert_eq!(de["rate"], "5,116\u{a0}%");
    }

    #[test]
    fn test_configured_currency_and_precision() {
        let config = FormattingConfig { currency: "EUR".to_string(), ratio_precision: 1, number_precision: 3 };
        let formatter = ResultFormatter::new(config, "en");
        let result = result(&[
            ("total", Value::Number(1234.5), OutputKind::Currency),
            ("ratio", Value::Number(0.256), OutputKind::Ratio { precision: None }),
            ("value", Value::Number(2.0 / 3.0), OutputKind::Number { precision: None }),
        ]);

        let fr = formatter.format(&result, "fr-FR");
        assert_eq!(fr["total"], format!("1{}234,50\u{a0}€", Locale::fr.separator()));
        assert_eq!(fr["ratio"], "0,3");
        assert_eq!(fr["value"], "0,667");
    }
}
