//! Error types for rule compilation, tree construction, matching and loading.
//!
//! Compile-time failures reject a rule set (or a single rule, see
//! [`crate::RuleSet::compile`]); run-time anomalies surface as
//! [`crate::MatchWarning`] values instead of errors. Only cancellation aborts a
//! match pass.

use std::fmt;
use std::ops::Range;
use camino::Utf8PathBuf;
use thiserror::Error;

use crate::diagnostic::{Diagnostic, DiagnosticCode, SourceSpan};
use crate::loader::Feature;

/// Where in a rule file a compile error was detected.
///
/// `rule` is the rank the offending rule would have had; `line` and `column`
/// are one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleLocation {
    /// Zero-based rank of the rule containing the error.
    pub rule: usize,
    /// One-based line number.
    pub line: u32,
    /// One-based column number (in characters).
    pub column: u32,
    /// Byte offset of the offending token.
    pub offset: usize,
    /// Byte length of the offending token.
    pub len: usize,
}

impl fmt::Display for RuleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule {} at {}:{}", self.rule, self.line, self.column)
    }
}

/// Errors raised while compiling rule source text.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum QueryError {
    /// The rule text is syntactically malformed.
    #[error("invalid query syntax in {location}: {message}")]
    Parse {
        /// Location of the offending token.
        location: RuleLocation,
        /// Description of the problem.
        message: String,
    },

    /// A predicate or directive refers to a capture the pattern never binds.
    #[error("{location} references undefined capture @{capture}")]
    UnknownCapture {
        /// Location of the reference.
        location: RuleLocation,
        /// The capture name as written, without the `@`.
        capture: String,
    },

    /// A predicate has an unknown name or the wrong arguments.
    #[error("invalid predicate #{name} in {location}: {message}")]
    InvalidPredicate {
        /// Location of the predicate.
        location: RuleLocation,
        /// Predicate name including its `?` or `!` suffix.
        name: String,
        /// Description of the problem.
        message: String,
    },

    /// A `#match?` pattern is not a valid regular expression.
    #[error("invalid regex in {location}: {source}")]
    InvalidRegex {
        /// Location of the regex literal.
        location: RuleLocation,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },
}

impl QueryError {
    /// Creates a syntax error.
    #[must_use]
    pub fn parse(location: RuleLocation, message: impl Into<String>) -> Self {
        Self::Parse {
            location,
            message: message.into(),
        }
    }

    /// Creates an unknown capture error.
    #[must_use]
    pub fn unknown_capture(location: RuleLocation, capture: impl Into<String>) -> Self {
        Self::UnknownCapture {
            location,
            capture: capture.into(),
        }
    }

    /// Creates an invalid predicate error.
    #[must_use]
    pub fn invalid_predicate(
        location: RuleLocation,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidPredicate {
            location,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Returns the location of the error.
    #[must_use]
    pub const fn location(&self) -> RuleLocation {
        match self {
            Self::Parse { location, .. }
            | Self::UnknownCapture { location, .. }
            | Self::InvalidPredicate { location, .. }
            | Self::InvalidRegex { location, .. } => *location,
        }
    }

    /// Returns the stable diagnostic code for this error.
    #[must_use]
    pub const fn code(&self) -> DiagnosticCode {
        match self {
            Self::Parse { .. } => DiagnosticCode::EWeftQueryParse,
            Self::UnknownCapture { .. } => DiagnosticCode::EWeftUnknownCapture,
            Self::InvalidPredicate { .. } => DiagnosticCode::EWeftInvalidPredicate,
            Self::InvalidRegex { .. } => DiagnosticCode::EWeftInvalidRegex,
        }
    }

    /// Converts the error into a structured diagnostic.
    #[must_use]
    pub fn diagnostic(&self) -> Diagnostic {
        let location = self.location();
        let span = SourceSpan::from_location(location);
        let mut notes = vec![format!("while compiling rule {}", location.rule)];
        if let Self::UnknownCapture { capture, .. } = self {
            notes.push(format!("no pattern in this rule binds @{capture}"));
        }
        Diagnostic::new(self.code(), self.to_string(), Some(span), notes)
    }
}

/// Errors raised by a match pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MatchError {
    /// The pass observed a cancellation request and produced no result.
    #[error("match pass cancelled")]
    Cancelled,
}

/// Errors raised while building or importing a syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TreeError {
    /// Failed to initialise the tree-sitter parser for a language.
    #[error("failed to initialise parser for {language}: {message}")]
    ParserInit {
        /// The language label.
        language: String,
        /// Description of the failure.
        message: String,
    },

    /// Tree-sitter did not produce a tree.
    #[error("failed to parse {language}: {message}")]
    Parse {
        /// The language label.
        language: String,
        /// Description of the failure.
        message: String,
    },

    /// A node span violates the tree's structural rules.
    #[error("invalid span {}..{} for `{kind}`: {reason}", range.start, range.end)]
    InvalidSpan {
        /// Kind of the offending node.
        kind: String,
        /// The offending byte range.
        range: Range<usize>,
        /// Which rule was violated.
        reason: String,
    },

    /// `build` was called while nodes were still open.
    #[error("node `{kind}` was never finished")]
    UnclosedNode {
        /// Kind of the innermost open node.
        kind: String,
    },

    /// `finish_node` was called with no open node.
    #[error("finish_node called without a matching start_node")]
    UnbalancedFinish,

    /// A second top-level node was started.
    #[error("a syntax tree has exactly one root node")]
    MultipleRoots,

    /// `build` was called before any node was added.
    #[error("cannot build an empty syntax tree")]
    EmptyTree,
}

impl TreeError {
    /// Creates an invalid span error.
    #[must_use]
    pub fn invalid_span(kind: impl Into<String>, range: Range<usize>, reason: impl Into<String>) -> Self {
        Self::InvalidSpan {
            kind: kind.into(),
            range,
            reason: reason.into(),
        }
    }
}

/// Errors raised while reading rule files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// A rule file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the unreadable file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// Converts the error into a structured diagnostic.
    #[must_use]
    pub fn diagnostic(&self) -> Diagnostic {
        let Self::Io { path, .. } = self;
        Diagnostic::new(DiagnosticCode::EWeftQueryLoad, self.to_string(), None, Vec::new())
            .with_note(format!("rule file {path}"))
    }
}

/// Errors raised by the [`crate::Engine`] facade.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The feature's rule set failed to compile; other features still work.
    #[error("{feature} rules for {language} are unavailable: {source}")]
    FeatureUnavailable {
        /// Language label.
        language: String,
        /// The degraded feature.
        feature: Feature,
        /// Why compilation failed.
        #[source]
        source: QueryError,
    },

    /// No rule set is registered for the language and feature.
    #[error("no {feature} rules registered for {language}")]
    NotLoaded {
        /// Language label.
        language: String,
        /// The requested feature.
        feature: Feature,
    },

    /// The match pass failed.
    #[error(transparent)]
    Match(#[from] MatchError),
}
