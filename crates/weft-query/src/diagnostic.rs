//! Diagnostic types for structured error reporting.
//!
//! Rule compilation failures, rejected rules and unreadable rule files are all
//! surfaced as [`Diagnostic`] entries. Loading many rule files aggregates them
//! into a [`DiagnosticReport`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RuleLocation;

/// Stable error codes for weft diagnostics.
///
/// # Example
///
/// ```
/// use weft_query::DiagnosticCode;
///
/// let code = DiagnosticCode::EWeftQueryParse;
/// assert_eq!(format!("{code}"), "E_WEFT_QUERY_PARSE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DiagnosticCode {
    /// Malformed rule syntax.
    EWeftQueryParse,
    /// A predicate or directive references an undefined capture.
    EWeftUnknownCapture,
    /// Unknown predicate name or wrong predicate arguments.
    EWeftInvalidPredicate,
    /// Invalid regular expression in `#match?`.
    EWeftInvalidRegex,
    /// A rule file could not be read.
    EWeftQueryLoad,
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EWeftQueryParse => f.write_str("E_WEFT_QUERY_PARSE"),
            Self::EWeftUnknownCapture => f.write_str("E_WEFT_UNKNOWN_CAPTURE"),
            Self::EWeftInvalidPredicate => f.write_str("E_WEFT_INVALID_PREDICATE"),
            Self::EWeftInvalidRegex => f.write_str("E_WEFT_INVALID_REGEX"),
            Self::EWeftQueryLoad => f.write_str("E_WEFT_QUERY_LOAD"),
        }
    }
}

/// A location within a rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Start byte offset (inclusive).
    start: usize,
    /// End byte offset (exclusive).
    end: usize,
    /// One-based line of the start offset.
    line: u32,
    /// One-based column of the start offset.
    column: u32,
    /// Optional URI of the rule file.
    uri: Option<String>,
}

impl SourceSpan {
    /// Creates a new source span.
    #[must_use]
    pub const fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
            uri: None,
        }
    }

    pub(crate) const fn from_location(location: RuleLocation) -> Self {
        Self::new(
            location.offset,
            location.offset.saturating_add(location.len),
            location.line,
            location.column,
        )
    }

    /// Attaches the URI of the rule file.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Returns the inclusive start byte offset.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Returns the exclusive end byte offset.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Returns the one-based line.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Returns the one-based column.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Returns the rule file URI, if known.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }
}

/// A single diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    code: DiagnosticCode,
    message: String,
    span: Option<SourceSpan>,
    notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    #[must_use]
    pub const fn new(
        code: DiagnosticCode,
        message: String,
        span: Option<SourceSpan>,
        notes: Vec<String>,
    ) -> Self {
        Self {
            code,
            message,
            span,
            notes,
        }
    }

    /// Returns the diagnostic code.
    #[must_use]
    pub const fn code(&self) -> DiagnosticCode {
        self.code
    }

    /// Returns the diagnostic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the source span, if available.
    #[must_use]
    pub const fn span(&self) -> Option<&SourceSpan> {
        self.span.as_ref()
    }

    /// Returns the supplementary notes.
    #[must_use]
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Appends a note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Attaches a rule file URI to the span, when there is one.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.span = self.span.map(|span| span.with_uri(uri));
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(span) = &self.span {
            match span.uri() {
                Some(uri) => write!(f, " ({uri}:{}:{})", span.line, span.column)?,
                None => write!(f, " ({}:{})", span.line, span.column)?,
            }
        }
        Ok(())
    }
}

fn diagnostic_summary(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => String::from("empty diagnostic report"),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

/// A collection of diagnostics produced while compiling or loading rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{}", diagnostic_summary(&self.diagnostics))]
pub struct DiagnosticReport {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticReport {
    /// Creates a report from a vector of diagnostics.
    #[must_use]
    pub const fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Appends a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Returns the diagnostics in this report.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns `true` if the report contains no diagnostics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns the number of diagnostics in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}

impl Extend<Diagnostic> for DiagnosticReport {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.diagnostics.extend(iter);
    }
}

impl IntoIterator for DiagnosticReport {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}
