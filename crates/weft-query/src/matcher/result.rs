//! Match results: matches in discovery order plus a node-keyed capture index.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::query::CaptureId;
use crate::tree::{Anomaly, NodeId};

/// Returns `true` for capture names that only feed predicates.
#[must_use]
pub fn is_private_capture(name: &str) -> bool {
    name.starts_with('_')
}

/// A capture bound by one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    name: Arc<str>,
    id: CaptureId,
    node: NodeId,
    rank: usize,
    match_index: usize,
}

impl Capture {
    /// Returns the capture name without the `@`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Returns the capture id within the rule set.
    #[must_use]
    pub const fn id(&self) -> CaptureId {
        self.id
    }

    /// Returns the captured node.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// Returns the rank of the rule that produced the capture.
    #[must_use]
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Returns the index of the producing match in [`MatchResult::matches`].
    #[must_use]
    pub const fn match_index(&self) -> usize {
        self.match_index
    }

    /// Returns `true` if the capture is private (`@_name`).
    #[must_use]
    pub fn is_private(&self) -> bool {
        is_private_capture(&self.name)
    }
}

/// One successful rule application at one root node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMatch {
    index: usize,
    rank: usize,
    root: NodeId,
    captures: Vec<Capture>,
}

impl QueryMatch {
    /// Returns the position of this match in discovery order.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns the rank of the matching rule.
    #[must_use]
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Returns the node the rule's root pattern matched.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the captures in binding order.
    #[must_use]
    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    /// Iterates over the nodes bound to `name`.
    pub fn nodes_for<'m>(&'m self, name: &'m str) -> impl Iterator<Item = NodeId> + 'm {
        self.captures
            .iter()
            .filter(move |capture| capture.name() == name)
            .map(Capture::node)
    }

    /// Returns the first node bound to `name`.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<NodeId> {
        self.nodes_for(name).next()
    }
}

/// A per-node anomaly observed during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchWarning {
    /// An error, missing or malformed node was not used as a match root.
    SkippedNode {
        /// The skipped node.
        node: NodeId,
        /// Its kind.
        kind: String,
        /// Why it was skipped.
        anomaly: Anomaly,
    },
    /// A rule attempt ran out of matching steps and was abandoned.
    BudgetExhausted {
        /// The candidate root.
        node: NodeId,
        /// The abandoned rule.
        rank: usize,
    },
    /// Collection stopped at the configured match cap.
    Truncated {
        /// The cap that was reached.
        limit: usize,
    },
}

impl fmt::Display for MatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SkippedNode {
                node,
                kind,
                anomaly,
            } => write!(f, "skipped {anomaly} node `{kind}` ({node})"),
            Self::BudgetExhausted { node, rank } => {
                write!(f, "rule {rank} exhausted its step budget at {node}")
            }
            Self::Truncated { limit } => write!(f, "stopped after {limit} matches"),
        }
    }
}

/// Everything one match pass produced.
///
/// Captures are indexed per node; the list for a node is ordered by rule rank,
/// then discovery. Two passes over the same rules and tree compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    matches: Vec<QueryMatch>,
    by_node: BTreeMap<NodeId, Vec<Capture>>,
    warnings: Vec<MatchWarning>,
}

impl MatchResult {
    /// Returns matches in discovery order (pre-order, then rank).
    #[must_use]
    pub fn matches(&self) -> &[QueryMatch] {
        &self.matches
    }

    /// Returns the captures bound to `node`, lowest rank first.
    #[must_use]
    pub fn captures_for(&self, node: NodeId) -> &[Capture] {
        self.by_node.get(&node).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterates over every capture named `name` in discovery order.
    pub fn captures_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Capture> + 'a {
        self.matches
            .iter()
            .flat_map(|found| found.captures.iter())
            .filter(move |capture| capture.name() == name)
    }

    /// Iterates over captured nodes in id order with their captures.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &[Capture])> {
        self.by_node
            .iter()
            .map(|(node, captures)| (*node, captures.as_slice()))
    }

    /// Returns the warnings raised during the pass.
    #[must_use]
    pub fn warnings(&self) -> &[MatchWarning] {
        &self.warnings
    }

    /// Returns `true` if the match cap cut the pass short.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.warnings
            .iter()
            .any(|warning| matches!(warning, MatchWarning::Truncated { .. }))
    }

    /// Returns the number of matches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Returns `true` if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub(crate) fn push_match(
        &mut self,
        rank: usize,
        root: NodeId,
        bindings: impl IntoIterator<Item = (Arc<str>, CaptureId, NodeId)>,
    ) {
        let index = self.matches.len();
        let captures = bindings
            .into_iter()
            .map(|(name, id, node)| Capture {
                name,
                id,
                node,
                rank,
                match_index: index,
            })
            .collect();
        self.matches.push(QueryMatch {
            index,
            rank,
            root,
            captures,
        });
    }

    pub(crate) fn push_warning(&mut self, warning: MatchWarning) {
        self.warnings.push(warning);
    }

    /// Builds the node index once all matches are in.
    pub(crate) fn finish(mut self) -> Self {
        let mut by_node: BTreeMap<NodeId, Vec<Capture>> = BTreeMap::new();
        for found in &self.matches {
            for capture in &found.captures {
                by_node.entry(capture.node).or_default().push(capture.clone());
            }
        }
        for captures in by_node.values_mut() {
            captures.sort_by_key(|capture| (capture.rank, capture.match_index));
        }
        self.by_node = by_node;
        self
    }
}
