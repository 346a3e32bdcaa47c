//! Compiled pattern shapes.
//!
//! Patterns are immutable tagged variants built once by the rule parser. The
//! matcher walks them directly; there is no dynamic dispatch at match time.

use crate::tree::Node;

/// Identifies a capture name within one [`crate::RuleSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureId(pub(crate) u32);

impl CaptureId {
    /// Returns the index into the rule set's capture name table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// How many consecutive matches a child pattern accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quantifier {
    /// Exactly one.
    #[default]
    One,
    /// `?`: zero or one.
    ZeroOrOne,
    /// `*`: zero or more.
    ZeroOrMore,
    /// `+`: one or more.
    OneOrMore,
}

impl Quantifier {
    pub(crate) const fn min(self) -> usize {
        match self {
            Self::One | Self::OneOrMore => 1,
            Self::ZeroOrOne | Self::ZeroOrMore => 0,
        }
    }

    pub(crate) const fn repeats(self) -> bool {
        matches!(self, Self::ZeroOrMore | Self::OneOrMore)
    }
}

/// A pattern together with the captures it binds on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// The node test.
    pub shape: Shape,
    /// Captures bound to the matched node.
    pub captures: Vec<CaptureId>,
}

/// The node test performed by a [`Pattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// `(kind ...)` or `(_ ...)`.
    Named(NamedShape),
    /// `"text"`: an anonymous node whose kind is the literal.
    Anonymous(String),
    /// `_`: any node.
    Wildcard,
    /// `[a b]`: the first alternative that matches.
    Alternation(Vec<Pattern>),
    /// `((a) (b))`: a sibling sequence matched against a root's children.
    Group(Sequence),
}

/// A named node test with child constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedShape {
    /// Required kind; `None` accepts any named node.
    pub kind: Option<String>,
    /// Fields that must be absent.
    pub negated_fields: Vec<String>,
    /// Ordered child constraints.
    pub children: Sequence,
}

/// An ordered list of child constraints.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sequence {
    /// Child constraints in order.
    pub items: Vec<ChildPattern>,
    /// A trailing `.` pins the last item to the last named child.
    pub anchored_end: bool,
}

/// One child constraint within a [`Sequence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildPattern {
    /// Field the child must occupy.
    pub field: Option<String>,
    /// The child's pattern.
    pub pattern: Pattern,
    /// Repetition.
    pub quantifier: Quantifier,
    /// A preceding `.`: the child must immediately follow the previous match
    /// (or be the first named child when it leads the sequence).
    pub anchored: bool,
}

/// A cheap pre-filter on candidate root nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RootTest {
    Any,
    AnyNamed,
    Named(String),
    Anonymous(String),
    OneOf(Vec<RootTest>),
}

impl RootTest {
    pub(crate) fn for_pattern(pattern: &Pattern) -> Self {
        match &pattern.shape {
            Shape::Named(named) => named
                .kind
                .clone()
                .map_or(Self::AnyNamed, Self::Named),
            Shape::Anonymous(text) => Self::Anonymous(text.clone()),
            Shape::Wildcard | Shape::Group(_) => Self::Any,
            Shape::Alternation(alternatives) => {
                Self::OneOf(alternatives.iter().map(Self::for_pattern).collect())
            }
        }
    }

    pub(crate) fn admits(&self, node: Node<'_>) -> bool {
        match self {
            Self::Any => true,
            Self::AnyNamed => node.is_named(),
            Self::Named(kind) => named_kind_matches(kind, node),
            Self::Anonymous(text) => !node.is_named() && node.kind() == text,
            Self::OneOf(tests) => tests.iter().any(|test| test.admits(node)),
        }
    }

    /// Returns `true` if the rule explicitly targets error or missing nodes.
    pub(crate) fn targets_anomalies(&self) -> bool {
        match self {
            Self::Named(kind) => kind == "ERROR" || kind == "MISSING",
            Self::OneOf(tests) => tests.iter().any(Self::targets_anomalies),
            Self::Any | Self::AnyNamed | Self::Anonymous(_) => false,
        }
    }
}

/// Tests a named node against a kind, treating `ERROR` and `MISSING` as
/// tests on the parser's anomaly flags.
pub(crate) fn named_kind_matches(kind: &str, node: Node<'_>) -> bool {
    match kind {
        "ERROR" => node.is_error(),
        "MISSING" => node.is_missing(),
        _ => node.is_named() && node.kind() == kind,
    }
}

impl Pattern {
    /// Visits this pattern and every nested pattern in source order.
    pub fn walk<'p>(&'p self, visit: &mut impl FnMut(&'p Self)) {
        visit(self);
        match &self.shape {
            Shape::Named(named) => named.children.walk(visit),
            Shape::Group(sequence) => sequence.walk(visit),
            Shape::Alternation(alternatives) => {
                for alternative in alternatives {
                    alternative.walk(visit);
                }
            }
            Shape::Anonymous(_) | Shape::Wildcard => {}
        }
    }
}

impl Sequence {
    fn walk<'p>(&'p self, visit: &mut impl FnMut(&'p Pattern)) {
        for item in &self.items {
            item.pattern.walk(visit);
        }
    }
}
