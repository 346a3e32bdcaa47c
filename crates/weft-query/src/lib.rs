//! Declarative tree queries for editor features.
//!
//! Rule files written in the tree-sitter S-expression query dialect are
//! compiled into a [`RuleSet`], matched against a [`SyntaxTree`] by the
//! [`Matcher`], and the resulting captures are read by feature-specific
//! resolvers:
//!
//! - **Highlights** via [`HighlightMap`]: one tag per node, earliest rule wins
//! - **Indents** via [`IndentMarkers`] and [`IndentScan`]
//! - **Injections** via [`InjectionMap`] and [`InjectionResolver`], recursing
//!   into embedded languages
//! - **Brackets** via [`BracketPairs`] over the tree and [`BracketTable`] over
//!   raw text
//! - **Text objects** via [`TextObjects`]
//!
//! Rule files are found by a [`QueryLoader`] and cached per language and
//! feature in a [`LanguageRegistry`]; [`Engine`] ties the pieces together.
//!
//! # Example
//!
//! ```
//! use weft_query::{CancellationToken, Parser, RuleSet, SupportedLanguage};
//!
//! let rules = RuleSet::compile("(function_item name: (identifier) @function)")?;
//! let tree = Parser::new(SupportedLanguage::Rust)?.parse("fn main() {}")?;
//!
//! let result = rules.matches(&tree, &CancellationToken::new())?;
//! let names: Vec<&str> = result
//!     .captures_named("function")
//!     .filter_map(|capture| tree.node(capture.node()))
//!     .map(|node| node.text())
//!     .collect();
//! assert_eq!(names, ["main"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cancel;
mod config;
mod diagnostic;
mod engine;
mod error;
mod language;
mod loader;
mod matcher;
mod parser;
mod position;
mod query;
mod resolve;
mod tree;

pub use cancel::CancellationToken;
pub use config::EngineConfig;
pub use diagnostic::{Diagnostic, DiagnosticCode, DiagnosticReport, SourceSpan};
pub use engine::Engine;
pub use error::{EngineError, LoadError, MatchError, QueryError, RuleLocation, TreeError};
pub use language::{LanguageParseError, SupportedLanguage};
pub use loader::{Feature, FeatureParseError, LanguageRegistry, QueryLoader, QuerySource, RuleSetStatus};
pub use matcher::{Capture, MatchResult, MatchWarning, Matcher, QueryMatch, is_private_capture};
pub use parser::Parser;
pub use position::{LineIndex, Point};
pub use query::{
    CaptureId, ChildPattern, Directive, DirectiveArg, NamedShape, Operand, Pattern, Predicate, Property,
    Quantifier, Rule, RuleSet, Sequence, Shape,
};
pub use resolve::{
    BracketMatch, BracketPair, BracketPairs, BracketScan, BracketTable, HighlightMap, HighlightSpan,
    HighlightTag, IndentDirection, IndentMarker, IndentMarkers, IndentScan, IndentStep, Injection,
    InjectionLayer, InjectionLayers, InjectionMap, InjectionResolver, InjectionState, NodeBracketPair,
    RuleSetProvider, TextObject, TextObjectVariant, TextObjects,
};
pub use tree::{Anomaly, Node, NodeId, SyntaxTree, TreeBuilder, Validation};

#[cfg(test)]
mod tests;
