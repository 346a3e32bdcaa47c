//! Serialisable command reports.

use std::ops::Range;

use camino::Utf8PathBuf;
use serde::Serialize;
use weft_query::{Diagnostic, LineIndex};

/// A one-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct Position {
    pub(crate) line: u32,
    pub(crate) column: u32,
}

/// A byte range with display positions and the text it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Span {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) from: Position,
    pub(crate) to: Position,
    pub(crate) text: String,
}

impl Span {
    pub(crate) fn new(source: &str, index: &LineIndex, range: Range<usize>) -> Self {
        let text = source.get(range.clone()).unwrap_or_default().to_owned();
        Self {
            start: range.start,
            end: range.end,
            from: Position::at(index, range.start),
            to: Position::at(index, range.end),
            text,
        }
    }
}

impl Position {
    pub(crate) fn at(index: &LineIndex, offset: usize) -> Self {
        let (line, column) = index.point_at(offset).to_one_based();
        Self { line, column }
    }
}

/// The outcome of compiling one rule file.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CheckedFile {
    pub(crate) path: Utf8PathBuf,
    pub(crate) ok: bool,
    pub(crate) declared: usize,
    pub(crate) usable: usize,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CheckReport {
    pub(crate) files: Vec<CheckedFile>,
}

impl CheckReport {
    pub(crate) fn succeeded(&self) -> bool {
        self.files.iter().all(|file| file.ok)
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct HighlightItem {
    pub(crate) span: Span,
    pub(crate) tag: String,
    pub(crate) rank: usize,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct IndentItem {
    pub(crate) at: Position,
    pub(crate) byte: usize,
    pub(crate) direction: &'static str,
    pub(crate) depth: usize,
    pub(crate) capture: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct InjectionItem {
    pub(crate) span: Span,
    pub(crate) language: String,
    pub(crate) depth: usize,
    pub(crate) parent: Option<usize>,
    pub(crate) state: &'static str,
    pub(crate) matches: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct BracketItem {
    pub(crate) open: Span,
    pub(crate) close: Span,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TextObjectItem {
    pub(crate) span: Span,
    pub(crate) object: String,
    pub(crate) variant: &'static str,
    pub(crate) rank: usize,
}

/// Feature-specific results of `weft run`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "feature", content = "items", rename_all = "snake_case")]
pub(crate) enum FeatureItems {
    Highlights(Vec<HighlightItem>),
    Indents(Vec<IndentItem>),
    Injections(Vec<InjectionItem>),
    Brackets(Vec<BracketItem>),
    #[serde(rename = "textobjects")]
    TextObjects(Vec<TextObjectItem>),
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RunReport {
    pub(crate) path: Utf8PathBuf,
    pub(crate) language: String,
    #[serde(flatten)]
    pub(crate) items: FeatureItems,
    pub(crate) warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct BracketsReport {
    pub(crate) path: Utf8PathBuf,
    pub(crate) pairs: Vec<BracketItem>,
    pub(crate) unmatched: Vec<Span>,
}

impl BracketsReport {
    pub(crate) const fn succeeded(&self) -> bool {
        self.unmatched.is_empty()
    }
}

/// Any command report.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum Report {
    Check(CheckReport),
    Run(RunReport),
    Brackets(BracketsReport),
}

impl Report {
    /// Whether the command should exit successfully.
    pub(crate) fn succeeded(&self) -> bool {
        match self {
            Self::Check(report) => report.succeeded(),
            Self::Run(_) => true,
            Self::Brackets(report) => report.succeeded(),
        }
    }
}
