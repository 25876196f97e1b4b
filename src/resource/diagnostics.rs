//! Diagnostics
//!
//! Structured, severity-tagged reports collected while an operation runs.
//! Operations never bail out with an error type; they append to a
//! [`Diagnostics`] list and hand it back with whatever state they produced.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// What went wrong, so callers can react without parsing summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticClass {
    /// A schema constraint was violated (missing name, immutable field changed, ...)
    Validation,
    /// The external API call failed
    Remote,
    /// The target of a read or import does not exist
    NotFound,
    /// Operation invoked in the wrong lifecycle phase
    InvalidState,
    /// The caller cancelled the operation
    Cancelled,
    /// Provider configuration problem
    Configuration,
}

impl DiagnosticClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Remote => "remote",
            Self::NotFound => "not_found",
            Self::InvalidState => "invalid_state",
            Self::Cancelled => "cancelled",
            Self::Configuration => "configuration",
        }
    }
}

/// A single diagnostic entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub class: DiagnosticClass,
    pub summary: String,
    pub detail: String,
    /// Attribute the diagnostic refers to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(
        class: DiagnosticClass,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            class,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(
        class: DiagnosticClass,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            class,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    /// Attach the attribute path this diagnostic is about
    pub fn at(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.attribute {
            Some(attr) => write!(
                f,
                "{}[{}]: {} ({}): {}",
                level,
                self.class.as_str(),
                self.summary,
                attr,
                self.detail
            ),
            None => write!(
                f,
                "{}[{}]: {}: {}",
                level,
                self.class.as_str(),
                self.summary,
                self.detail
            ),
        }
    }
}

/// Append-only list of diagnostics for one operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn add_error(
        &mut self,
        class: DiagnosticClass,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic::error(class, summary, detail));
    }

    pub fn add_warning(
        &mut self,
        class: DiagnosticClass,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic::warning(class, summary, detail));
    }

    /// True if any entry has error severity
    pub fn has_error(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    /// True if any error entry has the given class
    pub fn has_class(&self, class: DiagnosticClass) -> bool {
        self.errors().any(|d| d.class == class)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| !d.is_error())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
