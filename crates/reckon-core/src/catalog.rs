//! Calculators shipped with the engine

use crate::config::EngineConfig;
use crate::error::{DefinitionError, DefinitionIssue, IssueKind};
use crate::registry::Registry;
use crate::source::SourcePayload;

const BASELINE: (&str, &str) = ("baseline", include_str!("../catalog/baseline.json"));
const LOCALIZED: (&str, &str) = ("localized", include_str!("../catalog/localized.json"));

/// Built-in sources in merge order: baseline first, localized overlay second
pub fn builtin_sources() -> Result<Vec<SourcePayload>, DefinitionError> {
    parse_sources(&[BASELINE, LOCALIZED])
}

/// Parse named JSON documents, reporting every malformed one
pub fn parse_sources(documents: &[(&str, &str)]) -> Result<Vec<SourcePayload>, DefinitionError> {
    let mut sources = Vec::with_capacity(documents.len());
    let mut issues = Vec::new();

    for (name, json) in documents {
        match SourcePayload::from_json(json) {
            Ok(source) => sources.push(source),
            Err(e) => issues.push(DefinitionIssue::source(name, IssueKind::MalformedSource { message: e.to_string() })),
        }
    }

    if issues.is_empty() { Ok(sources) } else { Err(DefinitionError { issues }) }
}

impl Registry {
    /// Registry of the built-in calculators
    pub fn builtin(config: &EngineConfig) -> Result<Self, DefinitionError> {
        Registry::load(&builtin_sources()?, config)
    }
}
