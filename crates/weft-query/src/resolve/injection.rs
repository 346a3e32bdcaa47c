//! Language injections.
//!
//! [`InjectionMap`] reads injection captures and properties off one match
//! pass. [`InjectionResolver`] then drives every injected node through the
//! state machine `Unvisited -> Injected(language) -> Recursed`: a region whose
//! rule sets `injection.include-children` is reparsed with the target grammar
//! and matched again with the target language's rules, and any regions nested
//! inside it become layers of their own.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::ops::Range;
use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::error::{MatchError, TreeError};
use crate::language::SupportedLanguage;
use crate::loader::Feature;
use crate::matcher::{MatchResult, Matcher, QueryMatch};
use crate::parser::Parser;
use crate::query::{CaptureId, Rule, RuleSet};
use crate::tree::{NodeId, SyntaxTree};

const CONTENT: [&str; 2] = ["injection.content", "content"];
const LANGUAGE: [&str; 2] = ["injection.language", "language"];

/// One region assigned to another grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    /// The content node.
    pub node: NodeId,
    /// Byte range of the content node.
    pub range: Range<usize>,
    /// Target language label.
    pub language: String,
    /// Re-run matching over the region's descendants.
    pub include_children: bool,
    /// All regions of this rule form one document.
    pub combined: bool,
    /// Rank of the rule that produced the injection.
    pub rank: usize,
}

/// Injections keyed by content node; the lowest rank wins per node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectionMap {
    injections: BTreeMap<NodeId, Injection>,
}

impl InjectionMap {
    /// Reads the injections out of a pass of `rules` over `tree`.
    ///
    /// Matches whose language can be found neither in a captured node nor in
    /// an `injection.language` property are ignored.
    #[must_use]
    pub fn resolve(tree: &SyntaxTree, rules: &RuleSet, result: &MatchResult) -> Self {
        let mut injections: BTreeMap<NodeId, Injection> = BTreeMap::new();
        for found in result.matches() {
            let Some(rule) = rules.rule(found.rank()) else {
                continue;
            };
            for (name, node) in content_nodes(found) {
                let content = rules.capture_id(name);
                let Some(language) = language_for(tree, rule, found, content) else {
                    tracing::debug!(node = %node, rule = found.rank(), "injection without a language");
                    continue;
                };
                let Some(range) = tree.node(node).map(|node| node.byte_range()) else {
                    continue;
                };
                let candidate = Injection {
                    node,
                    range,
                    language,
                    include_children: rule.property(content, "injection.include-children").is_some(),
                    combined: rule.property(content, "injection.combined").is_some(),
                    rank: found.rank(),
                };
                match injections.entry(node) {
                    Entry::Occupied(mut entry) => {
                        if candidate.rank < entry.get().rank {
                            entry.insert(candidate);
                        }
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(candidate);
                    }
                }
            }
        }
        Self { injections }
    }

    /// Returns the injection whose content node is `node`.
    #[must_use]
    pub fn get(&self, node: NodeId) -> Option<&Injection> {
        self.injections.get(&node)
    }

    /// Iterates over injections in node order.
    pub fn iter(&self) -> impl Iterator<Item = &Injection> {
        self.injections.values()
    }

    /// Returns the number of injected nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.injections.len()
    }

    /// Returns `true` if nothing is injected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.injections.is_empty()
    }
}

fn content_nodes(found: &QueryMatch) -> impl Iterator<Item = (&'static str, NodeId)> + '_ {
    CONTENT
        .into_iter()
        .flat_map(move |name| found.nodes_for(name).map(move |node| (name, node)))
}

fn language_for(
    tree: &SyntaxTree,
    rule: &Rule,
    found: &QueryMatch,
    content: Option<CaptureId>,
) -> Option<String> {
    LANGUAGE
        .into_iter()
        .find_map(|name| found.first(name))
        .and_then(|node| tree.node(node))
        .map(|node| node.text().trim().to_owned())
        .filter(|language| !language.is_empty())
        .or_else(|| {
            rule.property(content, "injection.language")
                .and_then(|property| property.value.clone())
        })
}

/// Per-node progress through injection resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InjectionState {
    /// Not injected.
    #[default]
    Unvisited,
    /// Assigned to a language; the region was not matched again.
    Injected(String),
    /// Assigned to a language, reparsed with its grammar and matched again
    /// with its rules.
    Recursed,
}

/// Supplies compiled rule sets and grammars by language.
pub trait RuleSetProvider {
    /// Returns the rule set for `language` and `feature`, if one is loaded.
    fn rule_set(&self, language: &str, feature: Feature) -> Option<Arc<RuleSet>>;

    /// Parses the text of an injected region.
    ///
    /// Returns `None` when no grammar is known for `language`. The default
    /// maps the label onto a bundled grammar.
    fn parse_region(&self, language: &str, text: &str) -> Option<Result<SyntaxTree, TreeError>> {
        SupportedLanguage::from_label(language)
            .map(|grammar| Parser::new(grammar).and_then(|mut parser| parser.parse(text)))
    }
}

/// One resolved injection region.
///
/// `injection.range` is always in host bytes. `injection.node` belongs to the
/// tree the region was found in: the host tree for top-level layers, the
/// parent layer's tree otherwise.
#[derive(Debug, Clone)]
pub struct InjectionLayer {
    /// The injection that created the layer.
    pub injection: Injection,
    /// Nesting depth; regions of the host tree start at 1.
    pub depth: usize,
    /// Final state of the region.
    pub state: InjectionState,
    /// The region reparsed with the target grammar, when recursed.
    pub tree: Option<Arc<SyntaxTree>>,
    /// The target language's matches over [`Self::tree`], when recursed.
    pub result: Option<MatchResult>,
    /// Index of the enclosing layer in [`InjectionLayers::layers`].
    pub parent: Option<usize>,
}

impl InjectionLayer {
    /// Host byte offset of the start of [`Self::tree`].
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.injection.range.start
    }

    /// Maps a byte range of [`Self::tree`] onto the host source.
    #[must_use]
    pub const fn host_range(&self, range: Range<usize>) -> Range<usize> {
        let offset = self.offset();
        range.start + offset..range.end + offset
    }
}

/// Every injection layer of one tree, outermost first.
#[derive(Debug, Clone, Default)]
pub struct InjectionLayers {
    layers: Vec<InjectionLayer>,
    states: BTreeMap<NodeId, InjectionState>,
}

impl InjectionLayers {
    /// Returns the layers in pre-order of their regions.
    #[must_use]
    pub fn layers(&self) -> &[InjectionLayer] {
        &self.layers
    }

    /// Returns the state of a host tree node.
    #[must_use]
    pub fn state(&self, node: NodeId) -> InjectionState {
        self.states.get(&node).cloned().unwrap_or_default()
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if there are no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Resolves nested injections against the rule sets of a provider.
#[derive(Clone, Copy)]
pub struct InjectionResolver<'p> {
    provider: &'p dyn RuleSetProvider,
    config: EngineConfig,
}

/// State shared by one resolution pass.
struct Walk<'a> {
    source: &'a str,
    feature: Feature,
    cancel: &'a CancellationToken,
    visited: BTreeMap<(usize, usize), usize>,
    out: InjectionLayers,
}

impl<'p> InjectionResolver<'p> {
    /// Creates a resolver that looks up target rules in `provider`.
    #[must_use]
    pub const fn new(provider: &'p dyn RuleSetProvider, config: &EngineConfig) -> Self {
        Self {
            provider,
            config: *config,
        }
    }

    /// Walks the host injections and every region nested inside them.
    ///
    /// A region with `injection.include-children` is reparsed with its
    /// target grammar; the target language's rules for `feature` and its
    /// injection rules then run over that tree, and the regions they find
    /// become layers of their own. Layers come out in pre-order. A region is
    /// never entered twice and recursion stops below `max_injection_depth`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Cancelled`] if `cancel` is raised.
    pub fn resolve(
        &self,
        tree: &SyntaxTree,
        host: &InjectionMap,
        feature: Feature,
        cancel: &CancellationToken,
    ) -> Result<InjectionLayers, MatchError> {
        let mut walk = Walk {
            source: tree.source(),
            feature,
            cancel,
            visited: BTreeMap::new(),
            out: InjectionLayers::default(),
        };
        let mut enclosing: Vec<usize> = Vec::new();

        for injection in host.iter() {
            while let Some(&top) = enclosing.last() {
                let contains = walk
                    .out
                    .layers
                    .get(top)
                    .is_some_and(|outer| encloses(&outer.injection.range, &injection.range));
                if contains {
                    break;
                }
                enclosing.pop();
            }
            let node = injection.node;
            let Some(index) = self.visit(&mut walk, injection.clone(), enclosing.last().copied())? else {
                continue;
            };
            if let Some(layer) = walk.out.layers.get(index) {
                walk.out.states.insert(node, layer.state.clone());
            }
            enclosing.push(index);
        }
        tracing::debug!(layers = walk.out.layers.len(), "resolved injections");
        Ok(walk.out)
    }

    /// Adds the layer for `injection` and, depth first, the layers nested in
    /// it. Returns the index of the layer covering the region, if any.
    fn visit(
        &self,
        walk: &mut Walk<'_>,
        injection: Injection,
        parent: Option<usize>,
    ) -> Result<Option<usize>, MatchError> {
        if walk.cancel.is_cancelled() {
            return Err(MatchError::Cancelled);
        }
        let region = (injection.range.start, injection.range.end);
        if let Some(&seen) = walk.visited.get(&region) {
            return Ok(Some(seen));
        }
        let depth = parent
            .and_then(|outer| walk.out.layers.get(outer))
            .map_or(1, |layer| layer.depth + 1);
        if depth > self.config.max_injection_depth() {
            tracing::debug!(node = %injection.node, depth, "injection depth limit reached");
            return Ok(None);
        }

        let index = walk.out.layers.len();
        walk.visited.insert(region, index);
        let mut layer = InjectionLayer {
            state: InjectionState::Injected(injection.language.clone()),
            injection,
            depth,
            tree: None,
            result: None,
            parent,
        };
        let nested = if layer.injection.include_children {
            self.reparse(&mut layer, walk)?
        } else {
            Vec::new()
        };
        walk.out.layers.push(layer);
        for inner in nested {
            self.visit(walk, inner, Some(index))?;
        }
        Ok(Some(index))
    }

    /// Parses the layer's region and runs the target rules over it, returning
    /// the regions nested inside it in host bytes.
    fn reparse(&self, layer: &mut InjectionLayer, walk: &Walk<'_>) -> Result<Vec<Injection>, MatchError> {
        let language = layer.injection.language.as_str();
        let Some(text) = walk.source.get(layer.injection.range.clone()) else {
            return Ok(Vec::new());
        };
        let child = match self.provider.parse_region(language, text) {
            Some(Ok(child)) => child,
            Some(Err(err)) => {
                tracing::warn!(language, error = %err, "injected region failed to parse");
                return Ok(Vec::new());
            }
            None => {
                tracing::debug!(language, "no grammar for injected language");
                return Ok(Vec::new());
            }
        };

        let mut ran = false;
        match self.provider.rule_set(language, walk.feature) {
            Some(rules) => {
                layer.result = Some(Matcher::new(&rules, &self.config).run(&child, walk.cancel)?);
                ran = true;
            }
            None => tracing::debug!(language, feature = %walk.feature, "no rules for injected language"),
        }
        let mut nested = Vec::new();
        if let Some(rules) = self.provider.rule_set(language, Feature::Injections) {
            let found = Matcher::new(&rules, &self.config).run(&child, walk.cancel)?;
            nested = InjectionMap::resolve(&child, &rules, &found)
                .injections
                .into_values()
                .map(|mut inner| {
                    inner.range = layer.host_range(inner.range);
                    inner
                })
                .collect();
            ran = true;
        }
        if ran {
            layer.state = InjectionState::Recursed;
        }
        layer.tree = Some(Arc::new(child));
        Ok(nested)
    }
}

fn encloses(outer: &Range<usize>, inner: &Range<usize>) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}
