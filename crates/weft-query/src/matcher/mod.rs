//! The tree matcher.
//!
//! A [`Matcher`] walks a [`SyntaxTree`] in pre-order and tries every rule of
//! a [`RuleSet`] at every node, in rank order. A rule contributes at most one
//! match per node. Traversal always continues into children, so overlapping
//! constructs collect matches at every level.
//!
//! Nodes the parser flagged as error, missing or malformed are not used as
//! match roots unless a rule names `ERROR` or `MISSING` explicitly. Such
//! nodes are reported as [`MatchWarning`]s and never abort the pass.

mod result;
mod unify;

use std::ops::Range;
use std::sync::Arc;

pub use result::{Capture, MatchResult, MatchWarning, QueryMatch, is_private_capture};

use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::error::MatchError;
use crate::query::{CaptureId, Rule, RuleSet};
use crate::tree::{Node, NodeId, SyntaxTree};
use unify::Attempt;

/// Applies one rule set to syntax trees.
///
/// # Example
///
/// ```
/// use weft_query::{CancellationToken, EngineConfig, Matcher, RuleSet, TreeBuilder};
///
/// let mut builder = TreeBuilder::new("a b");
/// builder.start_node("list", 0);
/// builder.leaf("item", 0..1)?;
/// builder.leaf("item", 2..3)?;
/// builder.finish_node(3)?;
/// let tree = builder.build()?;
///
/// let rules = RuleSet::compile("(item) @item")?;
/// let config = EngineConfig::default();
/// let result = Matcher::new(&rules, &config).run(&tree, &CancellationToken::new())?;
/// assert_eq!(result.len(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'r> {
    rules: &'r RuleSet,
    config: EngineConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

impl<'r> Matcher<'r> {
    /// Creates a matcher for `rules` under the given limits.
    #[must_use]
    pub const fn new(rules: &'r RuleSet, config: &EngineConfig) -> Self {
        Self {
            rules,
            config: *config,
        }
    }

    /// Matches every node of `tree`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Cancelled`] if `cancel` is raised before the
    /// pass completes; no partial result is returned.
    pub fn run(&self, tree: &SyntaxTree, cancel: &CancellationToken) -> Result<MatchResult, MatchError> {
        self.walk(tree, 0..tree.len(), None, cancel)
    }

    /// Matches `node` and its descendants only.
    ///
    /// An id that does not belong to `tree` yields an empty result.
    ///
    /// # Errors
    ///
    /// As [`Self::run`].
    pub fn run_scoped(
        &self,
        tree: &SyntaxTree,
        node: NodeId,
        cancel: &CancellationToken,
    ) -> Result<MatchResult, MatchError> {
        let Some(root) = tree.node(node) else {
            return Ok(MatchResult::default());
        };
        self.walk(tree, node.index()..root.subtree_end().index(), None, cancel)
    }

    /// Matches the nodes whose spans intersect `range`.
    ///
    /// An empty range selects the nodes touching that offset.
    ///
    /// # Errors
    ///
    /// As [`Self::run`].
    pub fn run_in_range(
        &self,
        tree: &SyntaxTree,
        range: Range<usize>,
        cancel: &CancellationToken,
    ) -> Result<MatchResult, MatchError> {
        self.walk(tree, 0..tree.len(), Some(range), cancel)
    }

    fn walk(
        &self,
        tree: &SyntaxTree,
        ids: Range<usize>,
        range: Option<Range<usize>>,
        cancel: &CancellationToken,
    ) -> Result<MatchResult, MatchError> {
        let mut result = MatchResult::default();
        let mut index = ids.start;
        while index < ids.end {
            if cancel.is_cancelled() {
                tracing::debug!(node = index, "match pass cancelled");
                return Err(MatchError::Cancelled);
            }
            let Some(node) = tree.node(NodeId::from_index(index)) else {
                break;
            };
            if range
                .as_ref()
                .is_some_and(|range| !intersects(&node.byte_range(), range))
            {
                index = node.subtree_end().index().max(index + 1);
                continue;
            }
            index += 1;
            if self.visit(node, &mut result) == Flow::Stop {
                break;
            }
        }
        let result = result.finish();
        tracing::debug!(
            rules = self.rules.len(),
            matches = result.len(),
            warnings = result.warnings().len(),
            "match pass finished"
        );
        Ok(result)
    }

    fn visit(&self, node: Node<'_>, result: &mut MatchResult) -> Flow {
        let anomaly = node.anomaly();
        if let Some(anomaly) = anomaly {
            tracing::debug!(node = %node.id(), kind = node.kind(), %anomaly, "skipping node as match root");
            result.push_warning(MatchWarning::SkippedNode {
                node: node.id(),
                kind: node.kind().to_owned(),
                anomaly,
            });
        }
        for rule in self.rules.rules() {
            let root = rule.root_test();
            if (anomaly.is_some() && !root.targets_anomalies()) || !root.admits(node) {
                continue;
            }
            let Some(bindings) = self.attempt(rule, node, result) else {
                continue;
            };
            if result.len() >= self.config.max_matches() {
                tracing::debug!(limit = self.config.max_matches(), "match limit reached");
                result.push_warning(MatchWarning::Truncated {
                    limit: self.config.max_matches(),
                });
                return Flow::Stop;
            }
            let captures = bindings.into_iter().filter_map(|(capture, bound)| {
                self.rules
                    .capture_name_arc(capture)
                    .map(|name| (Arc::clone(name), capture, bound))
            });
            result.push_match(rule.rank(), node.id(), captures);
        }
        Flow::Continue
    }

    /// Runs one rule at one node; predicates are checked once, without
    /// retrying other structural assignments.
    fn attempt(
        &self,
        rule: &Rule,
        node: Node<'_>,
        result: &mut MatchResult,
    ) -> Option<Vec<(CaptureId, NodeId)>> {
        let mut attempt = Attempt::new(self.config.max_sequence_steps());
        if !attempt.pattern(node, rule.pattern()) {
            if attempt.exhausted() {
                tracing::debug!(node = %node.id(), rule = rule.rank(), "step budget exhausted");
                result.push_warning(MatchWarning::BudgetExhausted {
                    node: node.id(),
                    rank: rule.rank(),
                });
            }
            return None;
        }
        let tree = node.tree();
        rule.predicates()
            .iter()
            .all(|predicate| predicate.holds(attempt.bindings(), tree))
            .then(|| attempt.into_bindings())
    }
}

fn intersects(node: &Range<usize>, range: &Range<usize>) -> bool {
    if range.is_empty() {
        node.start <= range.start && range.start <= node.end
    } else {
        node.start < range.end && range.start < node.end
    }
}

impl RuleSet {
    /// Matches the whole tree with default limits.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Cancelled`] if `cancel` is raised mid-pass.
    pub fn matches(&self, tree: &SyntaxTree, cancel: &CancellationToken) -> Result<MatchResult, MatchError> {
        Matcher::new(self, &EngineConfig::default()).run(tree, cancel)
    }
}
