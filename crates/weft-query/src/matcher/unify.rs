//! Structural unification of one pattern against one candidate node.
//!
//! Child sequences are matched greedily with backtracking. Every pattern
//! test costs one step; once the budget is spent every further test fails and
//! the attempt reports itself exhausted.

use std::ops::Range;

use crate::query::{
    CaptureId, ChildPattern, NamedShape, Pattern, Sequence, Shape, named_kind_matches,
};
use crate::tree::{Node, NodeId};

/// State of a single rule attempt at a single root.
#[derive(Debug)]
pub(crate) struct Attempt {
    budget: usize,
    steps: usize,
    exhausted: bool,
    bindings: Vec<(CaptureId, NodeId)>,
}

impl Attempt {
    pub(crate) const fn new(budget: usize) -> Self {
        Self {
            budget,
            steps: 0,
            exhausted: false,
            bindings: Vec::new(),
        }
    }

    pub(crate) const fn exhausted(&self) -> bool {
        self.exhausted
    }

    pub(crate) fn bindings(&self) -> &[(CaptureId, NodeId)] {
        &self.bindings
    }

    pub(crate) fn into_bindings(self) -> Vec<(CaptureId, NodeId)> {
        self.bindings
    }

    const fn tick(&mut self) -> bool {
        if self.steps >= self.budget {
            self.exhausted = true;
            return false;
        }
        self.steps += 1;
        true
    }

    /// Matches `pattern` at `node`, binding its captures on success.
    pub(crate) fn pattern(&mut self, node: Node<'_>, pattern: &Pattern) -> bool {
        if !self.tick() {
            return false;
        }
        let mark = self.bindings.len();
        self.bindings
            .extend(pattern.captures.iter().map(|capture| (*capture, node.id())));
        let matched = match &pattern.shape {
            Shape::Wildcard => true,
            Shape::Anonymous(text) => !node.is_named() && node.kind() == text,
            Shape::Named(shape) => self.named(node, shape),
            Shape::Alternation(alternatives) => alternatives
                .iter()
                .any(|alternative| self.pattern(node, alternative)),
            Shape::Group(sequence) => self.sequence(node, sequence),
        };
        if !matched {
            self.bindings.truncate(mark);
        }
        matched
    }

    fn named(&mut self, node: Node<'_>, shape: &NamedShape) -> bool {
        let kind_matches = shape
            .kind
            .as_deref()
            .map_or_else(|| node.is_named(), |kind| named_kind_matches(kind, node));
        if !kind_matches || shape.negated_fields.iter().any(|field| node.has_field(field)) {
            return false;
        }
        self.sequence(node, &shape.children)
    }

    fn sequence(&mut self, parent: Node<'_>, sequence: &Sequence) -> bool {
        if sequence.items.is_empty() && !sequence.anchored_end {
            return true;
        }
        let children: Vec<Node<'_>> = parent.children().collect();
        self.items(&children, sequence, 0, 0)
    }

    /// Places items `item..` onto `children[next..]`.
    fn items(&mut self, children: &[Node<'_>], sequence: &Sequence, item: usize, next: usize) -> bool {
        if sequence.items.get(item).is_none() {
            return !sequence.anchored_end || children.iter().skip(next).all(|child| !child.is_named());
        }
        self.repeat(children, sequence, item, next, 0)
    }

    /// Places one more repetition of `item`, or moves on once the quantifier
    /// is satisfied. More repetitions are tried before fewer.
    fn repeat(
        &mut self,
        children: &[Node<'_>],
        sequence: &Sequence,
        item: usize,
        next: usize,
        count: usize,
    ) -> bool {
        let Some(child) = sequence.items.get(item) else {
            return false;
        };
        let quantifier = child.quantifier;
        let saturated = !quantifier.repeats() && count == 1;
        if !saturated {
            // Repetitions after the first are consecutive siblings.
            let anchored = child.anchored || count > 0;
            for index in candidates(children, child, next, anchored) {
                let Some(candidate) = children.get(index).copied() else {
                    continue;
                };
                let mark = self.bindings.len();
                if self.child(candidate, child)
                    && self.repeat(children, sequence, item, index + 1, count + 1)
                {
                    return true;
                }
                self.bindings.truncate(mark);
                if self.exhausted {
                    return false;
                }
            }
        }
        count >= quantifier.min() && self.items(children, sequence, item + 1, next)
    }

    fn child(&mut self, node: Node<'_>, child: &ChildPattern) -> bool {
        if child
            .field
            .as_deref()
            .is_some_and(|field| node.field_name() != Some(field))
        {
            return false;
        }
        self.pattern(node, &child.pattern)
    }
}

/// Child indices an item may occupy when placed at or after `next`.
///
/// An anchored item must take the next named child; an anchored anonymous
/// literal must take the very next child.
fn candidates(children: &[Node<'_>], child: &ChildPattern, next: usize, anchored: bool) -> Range<usize> {
    if !anchored {
        return next..children.len();
    }
    let index = if matches!(child.pattern.shape, Shape::Anonymous(_)) {
        Some(next).filter(|index| *index < children.len())
    } else {
        (next..children.len()).find(|index| children.get(*index).is_some_and(|node| node.is_named()))
    };
    index.map_or(0..0, |index| index..index + 1)
}

