//! Arena-backed syntax trees.
//!
//! A [`SyntaxTree`] owns its source text and stores every node in one flat
//! vector addressed by [`NodeId`]. Ids are assigned in pre-order, so the
//! descendants of a node occupy the contiguous id range that follows it. Nodes
//! are read through the [`Node`] view, which is `Copy` and borrows the tree.
//!
//! Trees come from the tree-sitter adapter ([`crate::Parser`],
//! [`SyntaxTree::from_tree_sitter`]) or are built by hand with
//! [`TreeBuilder`].

mod builder;
mod sitter;

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

pub use builder::{TreeBuilder, Validation};

use crate::position::Point;

/// Index of a node within its [`SyntaxTree`].
///
/// Ids are only meaningful for the tree that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a node is unsuitable as a match root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anomaly {
    /// The parser could not fit the text into the grammar.
    Error,
    /// The parser inserted a zero-width placeholder.
    Missing,
    /// The node's span breaks sibling ordering or parent containment.
    Malformed,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Missing => "missing",
            Self::Malformed => "malformed",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct NodeFlags {
    pub(crate) error: bool,
    pub(crate) missing: bool,
    pub(crate) malformed: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeRecord {
    kind: u32,
    named: bool,
    field: Option<u32>,
    bytes: Range<usize>,
    start: Point,
    end: Point,
    parent: Option<NodeId>,
    children: Range<u32>,
    subtree_end: u32,
    depth: u32,
    flags: NodeFlags,
}

// Ids handed out by a tree are always in bounds; lookups fall back to this
// record rather than panicking.
static DETACHED: NodeRecord = NodeRecord {
    kind: 0,
    named: false,
    field: None,
    bytes: 0..0,
    start: Point::new(0, 0),
    end: Point::new(0, 0),
    parent: None,
    children: 0..0,
    subtree_end: 0,
    depth: 0,
    flags: NodeFlags {
        error: false,
        missing: false,
        malformed: false,
    },
};

/// String interner for node kinds and field names.
#[derive(Debug, Clone, Default)]
pub(crate) struct Interner {
    names: Vec<Box<str>>,
    lookup: HashMap<Box<str>, u32>,
}

impl Interner {
    pub(crate) fn intern(&mut self, name: &str) -> u32 {
        if let Some(symbol) = self.lookup.get(name) {
            return *symbol;
        }
        let symbol = u32::try_from(self.names.len()).unwrap_or(u32::MAX);
        self.names.push(name.into());
        self.lookup.insert(name.into(), symbol);
        symbol
    }

    fn get(&self, name: &str) -> Option<u32> {
        self.lookup.get(name).copied()
    }

    fn resolve(&self, symbol: u32) -> &str {
        self.names
            .get(symbol as usize)
            .map_or("", |name| name.as_ref())
    }
}

/// An immutable, rooted syntax tree over owned source text.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    language: Option<String>,
    nodes: Vec<NodeRecord>,
    child_table: Vec<NodeId>,
    kinds: Interner,
    fields: Interner,
}

impl SyntaxTree {
    /// Returns the root node.
    #[must_use]
    pub const fn root(&self) -> Node<'_> {
        Node {
            tree: self,
            id: NodeId(0),
        }
    }

    /// Returns the node with the given id, if it belongs to this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        self.contains(id).then_some(Node { tree: self, id })
    }

    /// Returns `true` if `id` addresses a node of this tree.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Returns the source text the tree was built over.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the language label, when the tree came from a known grammar.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Labels the tree with a language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree has no nodes. Built trees always have a root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over every node in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = Node<'_>> {
        (0..self.nodes.len()).map(|index| Node {
            tree: self,
            id: NodeId::from_index(index),
        })
    }

    /// Returns the nodes flagged as error, missing or malformed, in pre-order.
    pub fn anomalies(&self) -> impl Iterator<Item = Node<'_>> {
        self.nodes().filter(|node| node.anomaly().is_some())
    }

    /// Returns `true` if any node is flagged as error, missing or malformed.
    #[must_use]
    pub fn has_anomalies(&self) -> bool {
        self.anomalies().next().is_some()
    }

    /// Returns the smallest node whose span contains `range`.
    #[must_use]
    pub fn smallest_enclosing(&self, range: Range<usize>) -> Option<Node<'_>> {
        let mut current = self.root();
        if !current.covers(&range) {
            return None;
        }
        'descend: loop {
            for child in current.children() {
                if child.covers(&range) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// Returns `true` if the interned kinds include `kind`.
    ///
    /// Lets callers skip whole rule sets whose root kinds never occur.
    #[must_use]
    pub fn has_kind(&self, kind: &str) -> bool {
        self.kinds.get(kind).is_some()
    }

    fn record(&self, id: NodeId) -> &NodeRecord {
        self.nodes.get(id.index()).unwrap_or(&DETACHED)
    }

    fn child_ids(&self, record: &NodeRecord) -> &[NodeId] {
        self.child_table
            .get(record.children.start as usize..record.children.end as usize)
            .unwrap_or(&[])
    }
}

/// A borrowed view of one node.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.tree, other.tree)
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("range", &self.byte_range())
            .finish()
    }
}

impl<'t> Node<'t> {
    fn record(&self) -> &'t NodeRecord {
        self.tree.record(self.id)
    }

    const fn at(&self, id: NodeId) -> Self {
        Self {
            tree: self.tree,
            id,
        }
    }

    /// Returns the node's id.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the tree this node belongs to.
    #[must_use]
    pub const fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    /// Returns the node's type tag.
    #[must_use]
    pub fn kind(&self) -> &'t str {
        self.tree.kinds.resolve(self.record().kind)
    }

    /// Returns `true` for named nodes, `false` for anonymous tokens.
    #[must_use]
    pub fn is_named(&self) -> bool {
        self.record().named
    }

    /// Returns the field this node occupies under its parent.
    #[must_use]
    pub fn field_name(&self) -> Option<&'t str> {
        self.record()
            .field
            .map(|field| self.tree.fields.resolve(field))
    }

    /// Returns the byte range.
    #[must_use]
    pub fn byte_range(&self) -> Range<usize> {
        self.record().bytes.clone()
    }

    /// Returns the start byte.
    #[must_use]
    pub fn start_byte(&self) -> usize {
        self.record().bytes.start
    }

    /// Returns the end byte (exclusive).
    #[must_use]
    pub fn end_byte(&self) -> usize {
        self.record().bytes.end
    }

    /// Returns the zero-based start position.
    #[must_use]
    pub fn start_position(&self) -> Point {
        self.record().start
    }

    /// Returns the zero-based end position.
    #[must_use]
    pub fn end_position(&self) -> Point {
        self.record().end
    }

    /// Returns the source text covered by the node.
    #[must_use]
    pub fn text(&self) -> &'t str {
        self.tree.source.get(self.byte_range()).unwrap_or("")
    }

    /// Returns the parent node.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.record().parent.map(|id| self.at(id))
    }

    /// Returns the number of children, named and anonymous.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.tree.child_ids(self.record()).len()
    }

    /// Returns the child at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<Self> {
        self.tree
            .child_ids(self.record())
            .get(index)
            .map(|id| self.at(*id))
    }

    /// Iterates over all children in order.
    pub fn children(self) -> impl Iterator<Item = Node<'t>> + 't {
        self.tree
            .child_ids(self.record())
            .iter()
            .map(move |id| self.at(*id))
    }

    /// Iterates over named children in order.
    pub fn named_children(self) -> impl Iterator<Item = Node<'t>> + 't {
        self.children().filter(Node::is_named)
    }

    /// Returns the first child under `field`.
    #[must_use]
    pub fn child_by_field_name(&self, field: &str) -> Option<Self> {
        self.children_by_field_name(field).next()
    }

    /// Iterates over every child under `field`.
    pub fn children_by_field_name(self, field: &str) -> impl Iterator<Item = Node<'t>> + use<'t> {
        let symbol = self.tree.fields.get(field);
        self.children()
            .filter(move |child| symbol.is_some() && child.record().field == symbol)
    }

    /// Returns `true` if some child sits under `field`.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.child_by_field_name(field).is_some()
    }

    /// Returns `true` if the parser flagged this node as an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.record().flags.error
    }

    /// Returns `true` if the parser inserted this node as missing.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.record().flags.missing
    }

    /// Returns `true` if the node's span broke the tree's structural rules.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.record().flags.malformed
    }

    /// Returns the first anomaly flagged on this node.
    #[must_use]
    pub fn anomaly(&self) -> Option<Anomaly> {
        let flags = self.record().flags;
        if flags.error {
            Some(Anomaly::Error)
        } else if flags.missing {
            Some(Anomaly::Missing)
        } else if flags.malformed {
            Some(Anomaly::Malformed)
        } else {
            None
        }
    }

    /// Iterates over this node and all its descendants in pre-order.
    pub fn descendants(self) -> impl Iterator<Item = Node<'t>> + 't {
        (self.id.0..self.record().subtree_end).map(move |raw| self.at(NodeId(raw)))
    }

    /// Returns the id one past the last descendant.
    pub(crate) fn subtree_end(&self) -> NodeId {
        NodeId(self.record().subtree_end)
    }

    /// Returns the number of ancestors.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.record().depth as usize
    }

    /// Returns `true` if `other` is this node or one of its descendants.
    #[must_use]
    pub fn is_ancestor_of(&self, other: NodeId) -> bool {
        self.id <= other && other.0 < self.record().subtree_end
    }

    fn covers(&self, range: &Range<usize>) -> bool {
        let bytes = &self.record().bytes;
        bytes.start <= range.start && range.end <= bytes.end
    }
}

#[cfg(test)]
mod tests;
