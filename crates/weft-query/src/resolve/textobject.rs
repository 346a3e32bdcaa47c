//! Selectable text objects.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::ops::Range;

use crate::matcher::MatchResult;
use crate::tree::{NodeId, SyntaxTree};

/// Which part of a construct a text object selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextObjectVariant {
    /// The whole construct (`<object>.around`).
    Around,
    /// The construct's body (`<object>.inside`).
    Inside,
}

impl TextObjectVariant {
    /// Returns the capture suffix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Around => "around",
            Self::Inside => "inside",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "around" => Some(Self::Around),
            "inside" => Some(Self::Inside),
            _ => None,
        }
    }
}

impl fmt::Display for TextObjectVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selectable range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextObject {
    /// Object name, such as `function` or `class`.
    pub object: String,
    /// Around or inside.
    pub variant: TextObjectVariant,
    /// First node bound to the capture.
    pub node: NodeId,
    /// Span of every node bound to the capture in the match.
    pub range: Range<usize>,
    /// Rank of the producing rule.
    pub rank: usize,
}

/// Every text object of one tree, ordered by start, wider objects first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextObjects {
    objects: Vec<TextObject>,
}

impl TextObjects {
    /// Reads `<object>.around` and `<object>.inside` captures.
    ///
    /// Several nodes bound to one capture in one match (for example a run of
    /// comments) form a single object spanning all of them. A repeated
    /// `(node, object, variant)` keeps its lowest-ranked rule.
    #[must_use]
    pub fn resolve(tree: &SyntaxTree, result: &MatchResult) -> Self {
        let mut found_objects: BTreeMap<(NodeId, String, TextObjectVariant), TextObject> = BTreeMap::new();
        for found in result.matches() {
            let mut per_capture: BTreeMap<&str, (NodeId, Range<usize>)> = BTreeMap::new();
            for capture in found.captures() {
                if capture.is_private() {
                    continue;
                }
                let Some(range) = tree.node(capture.node()).map(|node| node.byte_range()) else {
                    continue;
                };
                per_capture
                    .entry(capture.name())
                    .and_modify(|(_, span)| {
                        span.start = span.start.min(range.start);
                        span.end = span.end.max(range.end);
                    })
                    .or_insert((capture.node(), range));
            }
            for (name, (node, range)) in per_capture {
                let Some((object, variant)) = name
                    .rsplit_once('.')
                    .and_then(|(object, suffix)| Some((object, TextObjectVariant::from_suffix(suffix)?)))
                else {
                    continue;
                };
                let candidate = TextObject {
                    object: object.to_owned(),
                    variant,
                    node,
                    range,
                    rank: found.rank(),
                };
                match found_objects.entry((node, candidate.object.clone(), variant)) {
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
        let mut objects: Vec<TextObject> = found_objects.into_values().collect();
        objects.sort_by(|left, right| {
            left.range
                .start
                .cmp(&right.range.start)
                .then_with(|| right.range.end.cmp(&left.range.end))
                .then_with(|| left.rank.cmp(&right.rank))
                .then_with(|| left.node.cmp(&right.node))
        });
        Self { objects }
    }

    /// Returns every object.
    #[must_use]
    pub fn objects(&self) -> &[TextObject] {
        &self.objects
    }

    /// Returns the number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if there are no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn of_kind<'s, 'o>(
        &'s self,
        object: &'o str,
        variant: TextObjectVariant,
    ) -> impl Iterator<Item = &'s TextObject> + use<'s, 'o> {
        self.objects
            .iter()
            .filter(move |candidate| candidate.object == object && candidate.variant == variant)
    }

    /// Returns the smallest object that encloses `range`; the lowest rank
    /// wins between objects of equal size.
    #[must_use]
    pub fn select(&self, object: &str, variant: TextObjectVariant, range: Range<usize>) -> Option<&TextObject> {
        self.of_kind(object, variant)
            .filter(|candidate| candidate.range.start <= range.start && range.end <= candidate.range.end)
            .min_by_key(|candidate| (candidate.range.len(), candidate.rank))
    }

    /// Returns the first object starting after `byte`.
    #[must_use]
    pub fn next_after(&self, object: &str, variant: TextObjectVariant, byte: usize) -> Option<&TextObject> {
        self.of_kind(object, variant)
            .find(|candidate| candidate.range.start > byte)
    }

    /// Returns the last object starting before `byte`.
    #[must_use]
    pub fn previous_before(&self, object: &str, variant: TextObjectVariant, byte: usize) -> Option<&TextObject> {
        self.of_kind(object, variant)
            .filter(|candidate| candidate.range.start < byte)
            .last()
    }
}
