//! Rule compilation.
//!
//! A [`RuleSet`] is compiled from S-expression rule text. Every top-level
//! pattern becomes one [`Rule`] whose rank is its zero-based position in the
//! source; ranks decide precedence wherever consumers need a single winner.
//!
//! # Example
//!
//! ```
//! use weft_query::RuleSet;
//!
//! let rules = RuleSet::compile(r#"
//!     ((identifier) @constant (#match? @constant "^[A-Z]"))
//!     (identifier) @variable
//! "#)?;
//! assert_eq!(rules.len(), 2);
//! assert_eq!(rules.rule(1).map(|rule| rule.rank()), Some(1));
//! # Ok::<(), weft_query::QueryError>(())
//! ```

mod lexer;
mod parser;
mod pattern;
mod predicate;

use std::sync::Arc;

pub use pattern::{CaptureId, ChildPattern, NamedShape, Pattern, Quantifier, Sequence, Shape};
pub use predicate::{Directive, DirectiveArg, Operand, Predicate, Property};

pub(crate) use pattern::{RootTest, named_kind_matches};

use crate::diagnostic::Diagnostic;
use crate::error::QueryError;
use parser::{CaptureTable, RuleParser};
use predicate::AnnotationCompiler;

/// One compiled top-level pattern.
#[derive(Debug, Clone)]
pub struct Rule {
    rank: usize,
    line: u32,
    pattern: Pattern,
    root: RootTest,
    captures: Vec<CaptureId>,
    predicates: Vec<Predicate>,
    properties: Vec<Property>,
    directives: Vec<Directive>,
}

impl Rule {
    /// Returns the rule's rank: its position among all rules in the source.
    #[must_use]
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Returns the one-based line the rule starts on.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Returns the compiled pattern.
    #[must_use]
    pub const fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Returns the distinct captures the pattern binds.
    #[must_use]
    pub fn captures(&self) -> &[CaptureId] {
        &self.captures
    }

    /// Returns the match-time predicates.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Returns every `#set!` property.
    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Returns the generic directives.
    #[must_use]
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Returns the property for `key`, preferring one scoped to `capture`
    /// over a rule-level one.
    #[must_use]
    pub fn property(&self, capture: Option<CaptureId>, key: &str) -> Option<&Property> {
        let scoped = capture.and_then(|id| {
            self.properties
                .iter()
                .find(|property| property.capture == Some(id) && property.key == key)
        });
        scoped.or_else(|| {
            self.properties
                .iter()
                .find(|property| property.capture.is_none() && property.key == key)
        })
    }

    pub(crate) const fn root_test(&self) -> &RootTest {
        &self.root
    }
}

/// An ordered, immutable list of compiled rules.
///
/// Rule sets are `Send + Sync` and are shared between worker threads behind
/// an `Arc`.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    capture_table: CaptureTable,
    rejected: Vec<Diagnostic>,
    declared: usize,
}

impl RuleSet {
    /// Compiles rule text, dropping only rules that reference undefined
    /// captures.
    ///
    /// Dropped rules keep their rank slot (later rules are not renumbered) and
    /// are reported through [`Self::rejected`].
    ///
    /// # Errors
    ///
    /// Returns an error for malformed syntax, unknown predicates, bad
    /// predicate arguments and invalid regexes; any of these rejects the
    /// whole rule set.
    pub fn compile(source: &str) -> Result<Self, QueryError> {
        Self::compile_with(source, false)
    }

    /// Compiles rule text, failing on the first undefined capture reference.
    ///
    /// # Errors
    ///
    /// As [`Self::compile`], plus [`QueryError::UnknownCapture`].
    pub fn compile_strict(source: &str) -> Result<Self, QueryError> {
        Self::compile_with(source, true)
    }

    fn compile_with(source: &str, strict: bool) -> Result<Self, QueryError> {
        let mut capture_table = CaptureTable::default();
        let mut parser = RuleParser::new(lexer::tokenize(source), &mut capture_table);
        let mut rules = Vec::new();
        let mut rejected = Vec::new();
        let mut rank = 0;

        while let Some(parsed) = parser.next_rule(rank)? {
            let compiler = AnnotationCompiler {
                rank,
                bound: &parsed.bound,
            };
            match compiler.compile(parsed.calls) {
                Ok(annotations) => rules.push(Rule {
                    rank,
                    line: parsed.pos.line,
                    root: RootTest::for_pattern(&parsed.pattern),
                    captures: parsed.bound.iter().map(|(_, id)| *id).collect(),
                    pattern: parsed.pattern,
                    predicates: annotations.predicates,
                    properties: annotations.properties,
                    directives: annotations.directives,
                }),
                Err(err @ QueryError::UnknownCapture { .. }) if !strict => {
                    tracing::warn!(rule = rank, error = %err, "dropping rule");
                    rejected.push(err.diagnostic());
                }
                Err(err) => return Err(err),
            }
            rank += 1;
        }

        tracing::debug!(
            rules = rules.len(),
            rejected = rejected.len(),
            "compiled rule set"
        );
        Ok(Self {
            rules,
            capture_table,
            rejected,
            declared: rank,
        })
    }

    /// Returns the usable rules in rank order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the rule with the given rank, unless it was rejected.
    #[must_use]
    pub fn rule(&self, rank: usize) -> Option<&Rule> {
        self.rules
            .binary_search_by_key(&rank, Rule::rank)
            .ok()
            .and_then(|index| self.rules.get(index))
    }

    /// Returns the number of usable rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no rule survived compilation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the number of rules in the source, including rejected ones.
    #[must_use]
    pub const fn declared(&self) -> usize {
        self.declared
    }

    /// Returns diagnostics for rules dropped by lenient compilation.
    #[must_use]
    pub fn rejected(&self) -> &[Diagnostic] {
        &self.rejected
    }

    /// Returns the name of a capture.
    #[must_use]
    pub fn capture_name(&self, id: CaptureId) -> Option<&str> {
        self.capture_table.name(id).map(AsRef::as_ref)
    }

    pub(crate) fn capture_name_arc(&self, id: CaptureId) -> Option<&Arc<str>> {
        self.capture_table.name(id)
    }

    /// Looks up a capture by name.
    #[must_use]
    pub fn capture_id(&self, name: &str) -> Option<CaptureId> {
        self.capture_table.get(name)
    }

    /// Iterates over every capture name the rule set uses.
    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.capture_table.names()
    }
}
