//! Error taxonomy for registry construction and configuration
//!
//! Load-time problems are collected into a single [`DefinitionError`] so that
//! every offending calculator or category is reported at once. Per-call errors
//! ([`CalculationError`] and its parts) come from the formula layer.

use reckon_calculator::FormulaError;
use std::fmt;
use thiserror::Error;

pub use reckon_calculator::{CalculationError, EvaluationError, InputValidationError};

/// What a definition problem is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subject {
    Calculator(String),
    Category(String),
    Source(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Calculator(id) => write!(f, "calculator '{id}'"),
            Subject::Category(id) => write!(f, "category '{id}'"),
            Subject::Source(name) => write!(f, "source '{name}'"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IssueKind {
    #[error("source payload is malformed: {message}")]
    MalformedSource { message: String },

    #[error("id is empty")]
    EmptyId,

    #[error("{field} is '{existing}' in one source and '{incoming}' in another")]
    IdentityConflict { field: &'static str, existing: String, incoming: String },

    #[error("no category assigned")]
    MissingCategory,

    #[error("category '{category}' does not exist")]
    UnknownCategory { category: String },

    #[error("no formulas defined")]
    NoFormulas,

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error("related calculator '{related}' does not exist")]
    UnknownRelated { related: String },

    #[error("lists itself as related")]
    SelfRelated,

    #[error("slug '{slug}' is already used by '{other}' in the same category")]
    DuplicateSlug { slug: String, other: String },
}

/// One problem found while building the registry
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{subject}: {kind}")]
pub struct DefinitionIssue {
    pub subject: Subject,
    pub kind: IssueKind,
}

impl DefinitionIssue {
    pub fn calculator(id: &str, kind: impl Into<IssueKind>) -> Self {
        Self { subject: Subject::Calculator(id.to_string()), kind: kind.into() }
    }

    pub fn category(id: &str, kind: impl Into<IssueKind>) -> Self {
        Self { subject: Subject::Category(id.to_string()), kind: kind.into() }
    }

    pub fn source(name: &str, kind: impl Into<IssueKind>) -> Self {
        Self { subject: Subject::Source(name.to_string()), kind: kind.into() }
    }
}

/// Registry construction failed; fatal at startup
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionError {
    pub issues: Vec<DefinitionIssue>,
}

impl DefinitionError {
    /// Every distinct subject with at least one issue, sorted
    pub fn offending(&self) -> Vec<&Subject> {
        let mut subjects: Vec<&Subject> = self.issues.iter().map(|i| &i.subject).collect();
        subjects.sort();
        subjects.dedup();
        subjects
    }

    pub fn names_calculator(&self, id: &str) -> bool {
        self.issues.iter().any(|i| matches!(&i.subject, Subject::Calculator(c) if c == id))
    }
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registry definition has {} issue(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  - {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DefinitionError {}

impl From<DefinitionIssue> for DefinitionError {
    fn from(issue: DefinitionIssue) -> Self {
        Self { issues: vec![issue] }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration field '{field}' is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    /// Error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ConfigError::Parse(_) => "parse",
            ConfigError::Invalid { .. } => "validation",
        }
    }
}
