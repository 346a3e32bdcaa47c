//! Single-tag highlight view.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use crate::matcher::MatchResult;
use crate::tree::{NodeId, SyntaxTree};

/// The winning tag for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightTag {
    name: Arc<str>,
    rank: usize,
}

impl HighlightTag {
    /// Returns the capture name, for example `function.builtin`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the rank of the rule that supplied the tag.
    #[must_use]
    pub const fn rank(&self) -> usize {
        self.rank
    }
}

/// A highlighted byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    /// Byte range of the tagged node.
    pub range: Range<usize>,
    /// The tagged node.
    pub node: NodeId,
    /// The winning tag.
    pub tag: HighlightTag,
}

/// One tag per node, chosen by rule precedence.
///
/// The lowest-ranked non-private capture on a node wins, so earlier rules in
/// a highlight file override later, more general ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightMap {
    tags: BTreeMap<NodeId, HighlightTag>,
}

impl HighlightMap {
    /// Collapses `result` to one tag per node.
    #[must_use]
    pub fn resolve(result: &MatchResult) -> Self {
        let tags = result
            .nodes()
            .filter_map(|(node, captures)| {
                captures
                    .iter()
                    .find(|capture| !capture.is_private())
                    .map(|capture| {
                        (
                            node,
                            HighlightTag {
                                name: capture.shared_name(),
                                rank: capture.rank(),
                            },
                        )
                    })
            })
            .collect();
        Self { tags }
    }

    /// Returns the tag for `node`.
    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&HighlightTag> {
        self.tags.get(&node)
    }

    /// Iterates over tagged nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &HighlightTag)> {
        self.tags.iter().map(|(node, tag)| (*node, tag))
    }

    /// Returns the number of tagged nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` if no node is tagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Returns tagged ranges ordered by start, wider ranges first.
    ///
    /// Nested spans follow their enclosing span, so a renderer can apply
    /// them in order and let inner tags override outer ones.
    #[must_use]
    pub fn spans(&self, tree: &SyntaxTree) -> Vec<HighlightSpan> {
        let mut spans: Vec<HighlightSpan> = self
            .iter()
            .filter_map(|(id, tag)| {
                tree.node(id).map(|node| HighlightSpan {
                    range: node.byte_range(),
                    node: id,
                    tag: tag.clone(),
                })
            })
            .collect();
        spans.sort_by(|left, right| {
            left.range
                .start
                .cmp(&right.range.start)
                .then_with(|| right.range.end.cmp(&left.range.end))
                .then_with(|| left.node.cmp(&right.node))
        });
        spans
    }
}
