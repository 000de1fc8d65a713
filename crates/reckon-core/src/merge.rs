//! Field-wise overlay of partial records
//!
//! Records are merged in source order. An overlay only touches the fields it
//! defines, so applying the same overlay twice gives the same record as
//! applying it once.

use crate::error::IssueKind;
use crate::source::{NameSource, PartialCalculator, PartialCategory, PartialLocaleContent};
use tracing::debug;

/// Overlay `overlay` onto `base`, keeping identity fields consistent
pub fn merge_category(
    base: &mut PartialCategory,
    overlay: &PartialCategory,
    default_locale: &str,
) -> Result<(), IssueKind> {
    merge_identity("slug", &mut base.slug, &overlay.slug)?;

    if let Some(name) = &overlay.name {
        base.name = Some(merge_name(base.name.take(), name, default_locale));
    }
    overlay_field(&mut base.description, &overlay.description);
    overlay_field(&mut base.icon, &overlay.icon);
    overlay_field(&mut base.color, &overlay.color);

    debug!(category = %base.id, "Merged category overlay");
    Ok(())
}

/// Overlay `overlay` onto `base`.
///
/// Formulas are replaced by name and appended otherwise; locale content merges
/// per field; related ids are an order-preserving union.
pub fn merge_calculator(base: &mut PartialCalculator, overlay: &PartialCalculator) -> Result<(), IssueKind> {
    merge_identity("slug", &mut base.slug, &overlay.slug)?;
    merge_identity("category", &mut base.category, &overlay.category)?;

    for formula in &overlay.formulas {
        match base.formulas.iter_mut().find(|f| f.name == formula.name) {
            Some(existing) => {
                debug!(calculator = %base.id, formula = %formula.name, "Replacing formula");
                *existing = formula.clone();
            }
            None => base.formulas.push(formula.clone()),
        }
    }

    for (locale, content) in &overlay.locales {
        merge_locale_content(base.locales.entry(locale.clone()).or_default(), content);
    }

    for related in &overlay.related {
        if !base.related.contains(related) {
            base.related.push(related.clone());
        }
    }

    Ok(())
}

pub fn merge_locale_content(base: &mut PartialLocaleContent, overlay: &PartialLocaleContent) {
    overlay_field(&mut base.name, &overlay.name);
    overlay_field(&mut base.description, &overlay.description);
    overlay_field(&mut base.faq, &overlay.faq);
    overlay_field(&mut base.keywords, &overlay.keywords);
    overlay_field(&mut base.example, &overlay.example);
}

/// A localized map always wins over a plain string; maps merge per locale.
///
/// A plain name displaced by a map survives as the default-locale entry when
/// the map does not define one.
fn merge_name(base: Option<NameSource>, overlay: &NameSource, default_locale: &str) -> NameSource {
    match (base, overlay) {
        (None | Some(NameSource::Plain(_)), NameSource::Plain(name)) => NameSource::Plain(name.clone()),
        (Some(NameSource::Plain(plain)), NameSource::Localized(names)) => {
            let mut names = names.clone();
            names.entry(default_locale.to_string()).or_insert(plain);
            NameSource::Localized(names)
        }
        (Some(NameSource::Localized(mut names)), NameSource::Plain(plain)) => {
            debug!("Keeping localized name over plain overlay");
            names.entry(default_locale.to_string()).or_insert_with(|| plain.clone());
            NameSource::Localized(names)
        }
        (Some(NameSource::Localized(mut names)), NameSource::Localized(overlay)) => {
            names.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
            NameSource::Localized(names)
        }
        (None, NameSource::Localized(names)) => NameSource::Localized(names.clone()),
    }
}

fn merge_identity(
    field: &'static str,
    base: &mut Option<String>,
    overlay: &Option<String>,
) -> Result<(), IssueKind> {
    match (base.as_deref(), overlay.as_deref()) {
        (Some(existing), Some(incoming)) if existing != incoming => Err(IssueKind::IdentityConflict {
            field,
            existing: existing.to_string(),
            incoming: incoming.to_string(),
        }),
        (None, Some(incoming)) => {
            *base = Some(incoming.to_string());
            Ok(())
        }
        _ => Ok(()),
    }
}

fn overlay_field<T: Clone>(base: &mut Option<T>, overlay: &Option<T>) {
    if let Some(value) = overlay {
        *base = Some(value.clone());
    }
}
