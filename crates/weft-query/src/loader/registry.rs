//! Compiled rule sets keyed by language and feature.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Feature, QueryLoader, QuerySource};
use crate::diagnostic::DiagnosticReport;
use crate::error::{EngineError, QueryError};
use crate::query::RuleSet;
use crate::resolve::RuleSetProvider;

/// Outcome of compiling one rule file.
#[derive(Debug, Clone)]
pub enum RuleSetStatus {
    /// The rule set compiled and is shared by every consumer.
    Ready(Arc<RuleSet>),
    /// Compilation failed; only this language and feature are degraded.
    Failed(QueryError),
}

impl RuleSetStatus {
    /// Returns the rule set if it compiled.
    #[must_use]
    pub fn rule_set(&self) -> Option<&Arc<RuleSet>> {
        match self {
            Self::Ready(rules) => Some(rules),
            Self::Failed(_) => None,
        }
    }
}

/// Every compiled rule set, keyed by `(language, feature)`.
///
/// A registry is immutable once built and cheap to clone, so one instance can
/// back any number of concurrent match passes.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    entries: BTreeMap<(String, Feature), RuleSetStatus>,
}

impl LanguageRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an already compiled rule set, replacing any previous entry.
    pub fn insert(&mut self, language: impl Into<String>, feature: Feature, rules: RuleSet) {
        self.entries
            .insert((language.into(), feature), RuleSetStatus::Ready(Arc::new(rules)));
    }

    /// Compiles `source` and records the outcome.
    ///
    /// # Errors
    ///
    /// Returns the compile error, which is also recorded so later lookups
    /// report the feature as unavailable.
    pub fn compile(
        &mut self,
        language: &str,
        feature: Feature,
        source: &str,
    ) -> Result<Arc<RuleSet>, QueryError> {
        let key = (language.to_owned(), feature);
        match RuleSet::compile(source) {
            Ok(rules) => {
                let rules = Arc::new(rules);
                self.entries.insert(key, RuleSetStatus::Ready(Arc::clone(&rules)));
                Ok(rules)
            }
            Err(err) => {
                tracing::warn!(language, %feature, error = %err, "rule set failed to compile");
                self.entries.insert(key, RuleSetStatus::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Loads and compiles every feature of `languages` through `loader`.
    ///
    /// Missing rule files are skipped. Compile failures, dropped rules and
    /// unreadable files are collected into the returned report; none of them
    /// stops the remaining files from loading.
    #[must_use]
    pub fn load(loader: &QueryLoader, languages: &[String]) -> (Self, DiagnosticReport) {
        let mut registry = Self::new();
        let mut report = DiagnosticReport::default();
        for language in languages {
            for feature in Feature::all().iter().copied() {
                match loader.read(language, feature) {
                    Ok(Some(source)) => registry.load_source(language, feature, &source, &mut report),
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(language = %language, %feature, error = %err, "rule file unreadable");
                        report.push(err.diagnostic());
                    }
                }
            }
        }
        tracing::info!(
            rule_sets = registry.entries.len(),
            diagnostics = report.len(),
            "loaded rule sets"
        );
        (registry, report)
    }

    fn load_source(
        &mut self,
        language: &str,
        feature: Feature,
        source: &QuerySource,
        report: &mut DiagnosticReport,
    ) {
        let label = source
            .path
            .as_ref()
            .map_or_else(|| format!("builtin:{language}/{}", feature.file_name()), ToString::to_string);
        match self.compile(language, feature, &source.text) {
            Ok(rules) => report.extend(
                rules
                    .rejected()
                    .iter()
                    .cloned()
                    .map(|diagnostic| diagnostic.with_uri(label.clone())),
            ),
            Err(err) => report.push(err.diagnostic().with_uri(label)),
        }
    }

    /// Returns the rule set for `language` and `feature`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::FeatureUnavailable`] when the rule file failed
    /// to compile and [`EngineError::NotLoaded`] when none was registered.
    pub fn get(&self, language: &str, feature: Feature) -> Result<Arc<RuleSet>, EngineError> {
        match self.entries.get(&(language.to_owned(), feature)) {
            Some(RuleSetStatus::Ready(rules)) => Ok(Arc::clone(rules)),
            Some(RuleSetStatus::Failed(source)) => Err(EngineError::FeatureUnavailable {
                language: language.to_owned(),
                feature,
                source: source.clone(),
            }),
            None => Err(EngineError::NotLoaded {
                language: language.to_owned(),
                feature,
            }),
        }
    }

    /// Returns the recorded status for `language` and `feature`.
    #[must_use]
    pub fn status(&self, language: &str, feature: Feature) -> Option<&RuleSetStatus> {
        self.entries.get(&(language.to_owned(), feature))
    }

    /// Returns every language with at least one entry, sorted.
    #[must_use]
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.entries.keys().map(|(language, _)| language.as_str()).collect();
        languages.dedup();
        languages
    }

    /// Returns the number of entries, failed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RuleSetProvider for LanguageRegistry {
    fn rule_set(&self, language: &str, feature: Feature) -> Option<Arc<RuleSet>> {
        self.get(language, feature).ok()
    }
}
