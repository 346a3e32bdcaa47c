//! Tree-sitter parsing adapter.
//!
//! Parses source text with a bundled grammar and copies the result into an
//! arena [`SyntaxTree`] labelled with the language. Tree-sitter is
//! error-tolerant: the returned tree may contain error or missing nodes, which
//! the matcher skips as match roots.

use crate::error::TreeError;
use crate::language::SupportedLanguage;
use crate::tree::SyntaxTree;

/// Tree-sitter parser configured for one language.
pub struct Parser {
    inner: tree_sitter::Parser,
    language: SupportedLanguage,
}

impl Parser {
    /// Creates a new parser for the given language.
    ///
    /// # Errors
    ///
    /// Returns an error if the grammar's ABI is incompatible with the linked
    /// tree-sitter runtime.
    pub fn new(language: SupportedLanguage) -> Result<Self, TreeError> {
        let mut inner = tree_sitter::Parser::new();
        inner
            .set_language(&language.tree_sitter_language())
            .map_err(|err| TreeError::ParserInit {
                language: language.to_string(),
                message: err.to_string(),
            })?;

        Ok(Self { inner, language })
    }

    /// Returns the language this parser is configured for.
    #[must_use]
    pub const fn language(&self) -> SupportedLanguage {
        self.language
    }

    /// Parses `source` into a syntax tree.
    ///
    /// # Errors
    ///
    /// Returns an error if tree-sitter fails to produce a tree at all.
    pub fn parse(&mut self, source: &str) -> Result<SyntaxTree, TreeError> {
        let tree = self
            .inner
            .parse(source, None)
            .ok_or_else(|| TreeError::Parse {
                language: self.language.to_string(),
                message: String::from("parsing failed"),
            })?;

        let syntax = SyntaxTree::from_tree_sitter(&tree, source)?;
        tracing::debug!(
            language = %self.language,
            nodes = syntax.len(),
            anomalies = syntax.anomalies().count(),
            "parsed source"
        );
        Ok(syntax.with_language(self.language.as_str()))
    }
}
