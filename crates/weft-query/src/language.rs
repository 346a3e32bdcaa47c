//! Grammars bundled with the tree-sitter adapter.
//!
//! Rule sets are keyed by plain language labels so hosts can register their
//! own grammars; [`SupportedLanguage`] names the ones [`crate::Parser`] can
//! build trees for out of the box.

use std::fmt;
use std::str::FromStr;

use camino::Utf8Path;
use thiserror::Error;

/// A grammar the parser adapter ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SupportedLanguage {
    /// `.rs`
    #[default]
    Rust,
    /// `.py`, `.pyi`
    Python,
    /// `.ts` and friends, parsed with the TSX grammar.
    TypeScript,
}

const LABELS: &[(&str, SupportedLanguage)] = &[
    ("rust", SupportedLanguage::Rust),
    ("rs", SupportedLanguage::Rust),
    ("python", SupportedLanguage::Python),
    ("py", SupportedLanguage::Python),
    ("typescript", SupportedLanguage::TypeScript),
    ("ts", SupportedLanguage::TypeScript),
    ("tsx", SupportedLanguage::TypeScript),
];

impl SupportedLanguage {
    /// Maps a file extension to a grammar.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "rs" => Some(Self::Rust),
            "py" | "pyi" => Some(Self::Python),
            "ts" | "tsx" | "mts" | "cts" => Some(Self::TypeScript),
            _ => None,
        }
    }

    /// Maps a source path to a grammar by its extension.
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        path.extension().and_then(Self::from_extension)
    }

    /// Maps a language label, such as an `injection.language` value, to a
    /// grammar. Accepts the canonical labels and their short aliases.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let normalised = label.trim().to_ascii_lowercase();
        LABELS
            .iter()
            .find(|(alias, _)| *alias == normalised)
            .map(|(_, language)| *language)
    }

    /// Returns the tree-sitter grammar.
    #[must_use]
    pub fn tree_sitter_language(self) -> tree_sitter::Language {
        match self {
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// Returns the label used for rule directories and registry keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::TypeScript => "typescript",
        }
    }

    /// Returns every bundled grammar.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Rust, Self::Python, Self::TypeScript]
    }
}

impl fmt::Display for SupportedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised when a language label names no bundled grammar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported language: '{0}'")]
pub struct LanguageParseError(String);

impl LanguageParseError {
    /// Returns the rejected label.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.0
    }
}

impl FromStr for SupportedLanguage {
    type Err = LanguageParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::from_label(input).ok_or_else(|| LanguageParseError(input.trim().to_owned()))
    }
}
