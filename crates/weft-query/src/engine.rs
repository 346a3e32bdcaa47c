//! One entry point over the registry, matcher and resolvers.

use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::diagnostic::DiagnosticReport;
use crate::error::{EngineError, LoadError, QueryError};
use crate::loader::{Feature, LanguageRegistry, QueryLoader};
use crate::matcher::{MatchResult, Matcher};
use crate::query::RuleSet;
use crate::resolve::{
    BracketPairs, BracketTable, HighlightMap, IndentMarkers, InjectionLayers, InjectionMap,
    InjectionResolver, TextObjects,
};
use crate::tree::SyntaxTree;

/// Runs the rule sets of a [`LanguageRegistry`] and resolves their captures.
///
/// An `Engine` is read-only once loaded; wrap it in an [`Arc`] to share it
/// between worker threads.
///
/// # Example
///
/// ```
/// use weft_query::{CancellationToken, Engine, EngineConfig, Parser, QueryLoader, SupportedLanguage};
///
/// let mut engine = Engine::new(EngineConfig::default());
/// let report = engine.load(&QueryLoader::new())?;
/// assert!(report.is_empty());
///
/// let tree = Parser::new(SupportedLanguage::Rust)?.parse("fn main() {}")?;
/// let highlights = engine.highlights("rust", &tree, &CancellationToken::new())?;
/// assert!(!highlights.is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
    registry: LanguageRegistry,
}

impl Engine {
    /// Creates an engine with an empty registry.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: LanguageRegistry::new(),
        }
    }

    /// Creates an engine over an existing registry.
    #[must_use]
    pub const fn with_registry(config: EngineConfig, registry: LanguageRegistry) -> Self {
        Self { config, registry }
    }

    /// Loads every language `loader` knows about, replacing the registry.
    ///
    /// Per-file problems are returned in the report rather than failing the
    /// load.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when a search directory cannot be listed.
    pub fn load(&mut self, loader: &QueryLoader) -> Result<DiagnosticReport, LoadError> {
        let languages = loader.languages()?;
        let (registry, report) = LanguageRegistry::load(loader, &languages);
        self.registry = registry;
        Ok(report)
    }

    /// Compiles and registers rule text for one language and feature.
    ///
    /// # Errors
    ///
    /// Returns the compile error; the feature then reports
    /// [`EngineError::FeatureUnavailable`] until it is replaced.
    pub fn compile(&mut self, language: &str, feature: Feature, source: &str) -> Result<Arc<RuleSet>, QueryError> {
        self.registry.compile(language, feature, source)
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Returns the limits every pass runs under.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the rule set for `language` and `feature`.
    ///
    /// # Errors
    ///
    /// As [`LanguageRegistry::get`].
    pub fn rules(&self, language: &str, feature: Feature) -> Result<Arc<RuleSet>, EngineError> {
        self.registry.get(language, feature).inspect_err(|err| {
            if matches!(err, EngineError::FeatureUnavailable { .. }) {
                tracing::warn!(language, %feature, error = %err, "feature degraded");
            }
        })
    }

    /// Runs one feature's rules over `tree`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the rules are unavailable or the pass is
    /// cancelled.
    pub fn matches(
        &self,
        language: &str,
        feature: Feature,
        tree: &SyntaxTree,
        cancel: &CancellationToken,
    ) -> Result<MatchResult, EngineError> {
        let rules = self.rules(language, feature)?;
        Ok(Matcher::new(&rules, &self.config).run(tree, cancel)?)
    }

    /// Resolves one highlight tag per node.
    ///
    /// # Errors
    ///
    /// As [`Self::matches`].
    pub fn highlights(
        &self,
        language: &str,
        tree: &SyntaxTree,
        cancel: &CancellationToken,
    ) -> Result<HighlightMap, EngineError> {
        let result = self.matches(language, Feature::Highlights, tree, cancel)?;
        Ok(HighlightMap::resolve(&result))
    }

    /// Resolves indent markers.
    ///
    /// # Errors
    ///
    /// As [`Self::matches`].
    pub fn indents(
        &self,
        language: &str,
        tree: &SyntaxTree,
        cancel: &CancellationToken,
    ) -> Result<IndentMarkers, EngineError> {
        let result = self.matches(language, Feature::Indents, tree, cancel)?;
        Ok(IndentMarkers::resolve(tree, &result))
    }

    /// Resolves injected regions. Regions that ask for recursion are reparsed
    /// with their target grammar and `feature` runs over the result.
    ///
    /// # Errors
    ///
    /// As [`Self::matches`], for the host language's injection rules.
    pub fn injections(
        &self,
        language: &str,
        feature: Feature,
        tree: &SyntaxTree,
        cancel: &CancellationToken,
    ) -> Result<InjectionLayers, EngineError> {
        let rules = self.rules(language, Feature::Injections)?;
        let result = Matcher::new(&rules, &self.config).run(tree, cancel)?;
        let host = InjectionMap::resolve(tree, &rules, &result);
        Ok(InjectionResolver::new(&self.registry, &self.config).resolve(tree, &host, feature, cancel)?)
    }

    /// Pairs bracket nodes captured by the same match.
    ///
    /// # Errors
    ///
    /// As [`Self::matches`].
    pub fn brackets(
        &self,
        language: &str,
        tree: &SyntaxTree,
        cancel: &CancellationToken,
    ) -> Result<BracketPairs, EngineError> {
        let result = self.matches(language, Feature::Brackets, tree, cancel)?;
        Ok(BracketPairs::resolve(tree, &result))
    }

    /// Returns the delimiter pairs declared by `language`'s bracket rules,
    /// or the markup defaults when the language declares none.
    #[must_use]
    pub fn bracket_table(&self, language: &str) -> BracketTable {
        self.registry
            .get(language, Feature::Brackets)
            .map(|rules| BracketTable::from_rule_set(&rules))
            .ok()
            .filter(|table| !table.is_empty())
            .unwrap_or_else(BracketTable::markup)
    }

    /// Resolves text objects.
    ///
    /// # Errors
    ///
    /// As [`Self::matches`].
    pub fn text_objects(
        &self,
        language: &str,
        tree: &SyntaxTree,
        cancel: &CancellationToken,
    ) -> Result<TextObjects, EngineError> {
        let result = self.matches(language, Feature::TextObjects, tree, cancel)?;
        Ok(TextObjects::resolve(tree, &result))
    }
}
