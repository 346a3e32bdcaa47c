//! Incremental construction of [`SyntaxTree`] values.

use std::ops::Range;

use super::{Interner, NodeFlags, NodeId, NodeRecord, SyntaxTree};
use crate::error::TreeError;
use crate::position::{LineIndex, clamp_u32};

/// How the builder treats spans that break the tree invariants.
///
/// The invariants are: sibling spans do not overlap, and every child span lies
/// within its parent span. A wrapper node may share its only child's span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Validation {
    /// Reject the offending node with [`TreeError::InvalidSpan`].
    #[default]
    Strict,
    /// Keep the node but flag it as malformed.
    Lenient,
}

#[derive(Debug)]
struct OpenNode {
    id: NodeId,
    children: Vec<NodeId>,
}

/// Builds a [`SyntaxTree`] node by node in document order.
///
/// Interior nodes are bracketed by `start_node`/`finish_node`; leaves are
/// added in one call. Positions are derived from the source text.
///
/// # Example
///
/// ```
/// use weft_query::TreeBuilder;
///
/// let mut builder = TreeBuilder::new("{ a }");
/// builder.start_node("block", 0);
/// builder.token(0..1)?;
/// builder.leaf("identifier", 2..3)?;
/// builder.token(4..5)?;
/// builder.finish_node(5)?;
/// let tree = builder.build()?;
/// assert_eq!(tree.root().child_count(), 3);
/// # Ok::<(), weft_query::TreeError>(())
/// ```
#[derive(Debug)]
pub struct TreeBuilder {
    source: String,
    lines: LineIndex,
    validation: Validation,
    nodes: Vec<NodeRecord>,
    child_table: Vec<NodeId>,
    kinds: Interner,
    fields: Interner,
    stack: Vec<OpenNode>,
    deferred: Option<TreeError>,
}

impl TreeBuilder {
    /// Creates a strict builder over `source`.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let lines = LineIndex::new(&source);
        Self {
            source,
            lines,
            validation: Validation::Strict,
            nodes: Vec::new(),
            child_table: Vec::new(),
            kinds: Interner::default(),
            fields: Interner::default(),
            stack: Vec::new(),
            deferred: None,
        }
    }

    /// Selects how span violations are handled.
    #[must_use]
    pub const fn validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    /// Opens a named node starting at `start_byte`.
    pub fn start_node(&mut self, kind: &str, start_byte: usize) -> NodeId {
        self.open(kind, true, None, start_byte)
    }

    /// Opens a named node that sits under `field` in its parent.
    pub fn start_field_node(&mut self, field: &str, kind: &str, start_byte: usize) -> NodeId {
        self.open(kind, true, Some(field), start_byte)
    }

    /// Closes the innermost open node at `end_byte`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::UnbalancedFinish`] when no node is open, and
    /// [`TreeError::InvalidSpan`] in strict mode when the node or one of its
    /// children breaks the span invariants.
    pub fn finish_node(&mut self, end_byte: usize) -> Result<NodeId, TreeError> {
        let open = self.stack.pop().ok_or(TreeError::UnbalancedFinish)?;
        let start = self.record(open.id).map_or(0, |record| record.bytes.start);
        let end = self.checked_end(open.id, start, end_byte)?;
        let end_point = self.lines.point_at(end);
        if let Some(record) = self.nodes.get_mut(open.id.index()) {
            record.bytes = start..end;
            record.end = end_point;
        }

        self.check_children(&open.children, start..end)?;

        let first = clamp_u32(self.child_table.len());
        self.child_table.extend(open.children.iter().copied());
        let last = clamp_u32(self.child_table.len());
        let subtree_end = clamp_u32(self.nodes.len());
        if let Some(record) = self.nodes.get_mut(open.id.index()) {
            record.children = first..last;
            record.subtree_end = subtree_end;
        }
        Ok(open.id)
    }

    /// Adds a named leaf.
    ///
    /// # Errors
    ///
    /// See [`Self::finish_node`].
    pub fn leaf(&mut self, kind: &str, range: Range<usize>) -> Result<NodeId, TreeError> {
        self.open(kind, true, None, range.start);
        self.finish_node(range.end)
    }

    /// Adds a named leaf under `field`.
    ///
    /// # Errors
    ///
    /// See [`Self::finish_node`].
    pub fn field_leaf(
        &mut self,
        field: &str,
        kind: &str,
        range: Range<usize>,
    ) -> Result<NodeId, TreeError> {
        self.open(kind, true, Some(field), range.start);
        self.finish_node(range.end)
    }

    /// Adds an anonymous token whose kind is its own source text.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidSpan`] when `range` does not address the
    /// source text, plus the errors of [`Self::finish_node`].
    pub fn token(&mut self, range: Range<usize>) -> Result<NodeId, TreeError> {
        let text = self.token_text(&range)?;
        self.open(&text, false, None, range.start);
        self.finish_node(range.end)
    }

    /// Adds an anonymous token under `field`.
    ///
    /// # Errors
    ///
    /// See [`Self::token`].
    pub fn field_token(&mut self, field: &str, range: Range<usize>) -> Result<NodeId, TreeError> {
        let text = self.token_text(&range)?;
        self.open(&text, false, Some(field), range.start);
        self.finish_node(range.end)
    }

    /// Flags a node as a parse error.
    pub fn mark_error(&mut self, id: NodeId) {
        if let Some(record) = self.nodes.get_mut(id.index()) {
            record.flags.error = true;
        }
    }

    /// Flags a node as inserted by error recovery.
    pub fn mark_missing(&mut self, id: NodeId) {
        if let Some(record) = self.nodes.get_mut(id.index()) {
            record.flags.missing = true;
        }
    }

    /// Finishes construction.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::EmptyTree`], [`TreeError::UnclosedNode`] or
    /// [`TreeError::MultipleRoots`] when the node sequence is not a single
    /// closed tree.
    pub fn build(self) -> Result<SyntaxTree, TreeError> {
        if let Some(error) = self.deferred {
            return Err(error);
        }
        if let Some(open) = self.stack.last() {
            let kind = self
                .nodes
                .get(open.id.index())
                .map(|record| self.kinds.resolve(record.kind).to_owned())
                .unwrap_or_default();
            return Err(TreeError::UnclosedNode { kind });
        }
        if self.nodes.is_empty() {
            return Err(TreeError::EmptyTree);
        }
        Ok(SyntaxTree {
            source: self.source,
            language: None,
            nodes: self.nodes,
            child_table: self.child_table,
            kinds: self.kinds,
            fields: self.fields,
        })
    }

    pub(crate) fn open(
        &mut self,
        kind: &str,
        named: bool,
        field: Option<&str>,
        start_byte: usize,
    ) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        let parent = self.stack.last().map(|open| open.id);
        if parent.is_none() && !self.nodes.is_empty() && self.deferred.is_none() {
            self.deferred = Some(TreeError::MultipleRoots);
        }
        let kind = self.kinds.intern(kind);
        let field = field.map(|name| self.fields.intern(name));
        let start = self.lines.point_at(start_byte.min(self.source.len()));
        self.nodes.push(NodeRecord {
            kind,
            named,
            field,
            bytes: start_byte..start_byte,
            start,
            end: start,
            parent,
            children: 0..0,
            subtree_end: id.0.saturating_add(1),
            depth: clamp_u32(self.stack.len()),
            flags: NodeFlags::default(),
        });
        if let Some(open) = self.stack.last_mut() {
            open.children.push(id);
        }
        self.stack.push(OpenNode {
            id,
            children: Vec::new(),
        });
        id
    }

    fn record(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id.index())
    }

    fn kind_of(&self, id: NodeId) -> String {
        self.record(id)
            .map(|record| self.kinds.resolve(record.kind).to_owned())
            .unwrap_or_default()
    }

    fn token_text(&self, range: &Range<usize>) -> Result<String, TreeError> {
        self.source
            .get(range.clone())
            .map(str::to_owned)
            .ok_or_else(|| {
                TreeError::invalid_span("token", range.clone(), "range does not address the source")
            })
    }

    fn checked_end(&mut self, id: NodeId, start: usize, end: usize) -> Result<usize, TreeError> {
        let reason = if end < start {
            Some("node ends before it starts")
        } else if end > self.source.len() {
            Some("node extends past the end of the source")
        } else if !self.source.is_char_boundary(start) || !self.source.is_char_boundary(end) {
            Some("node boundary splits a character")
        } else {
            None
        };
        let Some(reason) = reason else {
            return Ok(end);
        };
        match self.validation {
            Validation::Strict => Err(TreeError::invalid_span(self.kind_of(id), start..end, reason)),
            Validation::Lenient => {
                self.mark_malformed(id);
                Ok(end.clamp(start.min(self.source.len()), self.source.len()))
            }
        }
    }

    fn check_children(&mut self, children: &[NodeId], parent: Range<usize>) -> Result<(), TreeError> {
        let mut previous_end = parent.start;
        for child in children {
            let Some(bytes) = self.record(*child).map(|record| record.bytes.clone()) else {
                continue;
            };
            let reason = if bytes.start < parent.start || bytes.end > parent.end {
                Some("child lies outside its parent")
            } else if bytes.start < previous_end {
                Some("child overlaps its previous sibling")
            } else {
                None
            };
            previous_end = previous_end.max(bytes.end);
            let Some(reason) = reason else {
                continue;
            };
            match self.validation {
                Validation::Strict => {
                    return Err(TreeError::invalid_span(self.kind_of(*child), bytes, reason));
                }
                Validation::Lenient => self.mark_malformed(*child),
            }
        }
        Ok(())
    }

    fn mark_malformed(&mut self, id: NodeId) {
        if let Some(record) = self.nodes.get_mut(id.index()) {
            record.flags.malformed = true;
        }
    }
}
