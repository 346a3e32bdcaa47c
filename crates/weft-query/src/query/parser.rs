//! Recursive-descent parser from tokens to pattern shapes.
//!
//! Predicates are lifted out of whatever parenthesised pattern they appear in
//! and attached to the enclosing top-level rule. Groups of a single pattern
//! collapse into that pattern; unquantified groups nested in a child list are
//! spliced into it.

use std::collections::HashMap;
use std::sync::Arc;

use super::lexer::{Token, TokenKind, TokenPos, Tokens};
use super::pattern::{CaptureId, ChildPattern, NamedShape, Pattern, Quantifier, Sequence, Shape};
use crate::error::{QueryError, RuleLocation};

/// Capture names interned for one rule set.
#[derive(Debug, Clone, Default)]
pub(crate) struct CaptureTable {
    names: Vec<Arc<str>>,
    lookup: HashMap<Arc<str>, CaptureId>,
}

impl CaptureTable {
    pub(crate) fn intern(&mut self, name: &str) -> CaptureId {
        if let Some(id) = self.lookup.get(name) {
            return *id;
        }
        let id = CaptureId(u32::try_from(self.names.len()).unwrap_or(u32::MAX));
        let name: Arc<str> = Arc::from(name);
        self.names.push(Arc::clone(&name));
        self.lookup.insert(name, id);
        id
    }

    pub(crate) fn get(&self, name: &str) -> Option<CaptureId> {
        self.lookup.get(name).copied()
    }

    pub(crate) fn name(&self, id: CaptureId) -> Option<&Arc<str>> {
        self.names.get(id.index())
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(AsRef::as_ref)
    }
}

/// An argument to a predicate or directive, before capture resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawArg {
    Capture { name: String, pos: TokenPos },
    Text(String),
}

/// A `(#name? ...)` or `(#name! ...)` call, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawCall {
    pub(crate) name: String,
    pub(crate) args: Vec<RawArg>,
    pub(crate) pos: TokenPos,
}

/// One top-level pattern with its lifted predicate calls.
#[derive(Debug, Clone)]
pub(crate) struct ParsedRule {
    pub(crate) pattern: Pattern,
    pub(crate) calls: Vec<RawCall>,
    /// Capture names the pattern binds, in first-appearance order.
    pub(crate) bound: Vec<(String, CaptureId)>,
    pub(crate) pos: TokenPos,
}

pub(crate) struct RuleParser<'a> {
    tokens: Tokens,
    index: usize,
    rank: usize,
    captures: &'a mut CaptureTable,
    calls: Vec<RawCall>,
    bound: Vec<(String, CaptureId)>,
}

enum Child {
    Pattern(Pattern, Quantifier),
    Predicate,
}

impl<'a> RuleParser<'a> {
    pub(crate) const fn new(tokens: Tokens, captures: &'a mut CaptureTable) -> Self {
        Self {
            tokens,
            index: 0,
            rank: 0,
            captures,
            calls: Vec::new(),
            bound: Vec::new(),
        }
    }

    /// Parses the next top-level rule, which receives `rank`.
    pub(crate) fn next_rule(&mut self, rank: usize) -> Result<Option<ParsedRule>, QueryError> {
        self.rank = rank;
        let Some(first) = self.peek().cloned() else {
            return match self.tokens.error.clone() {
                Some(err) => Err(QueryError::parse(self.location(err.pos), err.message)),
                None => Ok(None),
            };
        };
        self.calls.clear();
        self.bound.clear();

        let pattern = match self.child()? {
            Child::Pattern(pattern, _) => pattern,
            Child::Predicate => {
                return Err(self.error_at(first.pos, "predicates must sit inside a pattern"));
            }
        };
        if let Shape::Group(sequence) = &pattern.shape {
            if !pattern.captures.is_empty() {
                return Err(self.error_at(
                    first.pos,
                    "captures on a multi-pattern group bind no single node",
                ));
            }
            if sequence.items.is_empty() {
                return Err(self.error_at(first.pos, "empty group"));
            }
        }

        Ok(Some(ParsedRule {
            pattern,
            calls: std::mem::take(&mut self.calls),
            bound: std::mem::take(&mut self.bound),
            pos: first.pos,
        }))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.tokens.get(self.index)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn peek_second(&self) -> Option<&TokenKind> {
        self.tokens
            .tokens
            .get(self.index.saturating_add(1))
            .map(|token| &token.kind)
    }

    fn bump(&mut self) -> Result<Token, QueryError> {
        let token = self.peek().cloned().ok_or_else(|| self.eof_error())?;
        self.index = self.index.saturating_add(1);
        Ok(token)
    }

    const fn location(&self, pos: TokenPos) -> RuleLocation {
        RuleLocation {
            rule: self.rank,
            line: pos.line,
            column: pos.column,
            offset: pos.offset,
            len: pos.len,
        }
    }

    fn error_at(&self, pos: TokenPos, message: impl Into<String>) -> QueryError {
        QueryError::parse(self.location(pos), message)
    }

    fn eof_error(&self) -> QueryError {
        match &self.tokens.error {
            Some(err) => QueryError::parse(self.location(err.pos), err.message.clone()),
            None => QueryError::parse(self.location(self.tokens.end), "unexpected end of input"),
        }
    }

    fn unexpected(&self, token: &Token, expected: &str) -> QueryError {
        self.error_at(
            token.pos,
            format!("expected {expected}, found {}", token.kind.describe()),
        )
    }

    /// Parses one pattern with its optional quantifier and captures, or a
    /// predicate call (which is recorded and yields no pattern).
    fn child(&mut self) -> Result<Child, QueryError> {
        let token = self.bump()?;
        let shape = match token.kind {
            TokenKind::LParen => match self.peek_kind() {
                Some(TokenKind::Predicate(_)) => {
                    self.predicate_call()?;
                    return Ok(Child::Predicate);
                }
                Some(TokenKind::Ident(_)) => self.named()?,
                _ => self.group(token.pos)?,
            },
            TokenKind::LBracket => self.alternation(token.pos)?,
            TokenKind::Str(text) => Shape::Anonymous(text),
            TokenKind::Ident(name) if name == "_" => Shape::Wildcard,
            _ => return Err(self.unexpected(&token, "a pattern")),
        };

        let quantifier = match self.peek_kind() {
            Some(TokenKind::Question) => Quantifier::ZeroOrOne,
            Some(TokenKind::Star) => Quantifier::ZeroOrMore,
            Some(TokenKind::Plus) => Quantifier::OneOrMore,
            _ => Quantifier::One,
        };
        if quantifier != Quantifier::One {
            self.index = self.index.saturating_add(1);
        }

        let mut captures = Vec::new();
        while let Some(TokenKind::Capture(name)) = self.peek_kind() {
            let name = name.clone();
            self.index = self.index.saturating_add(1);
            let id = self.captures.intern(&name);
            if !self.bound.iter().any(|(bound, _)| *bound == name) {
                self.bound.push((name, id));
            }
            captures.push(id);
        }

        let pattern = collapse(Pattern { shape, captures });
        Ok(Child::Pattern(pattern, quantifier))
    }

    fn named(&mut self) -> Result<Shape, QueryError> {
        let token = self.bump()?;
        let TokenKind::Ident(kind) = token.kind else {
            return Err(self.unexpected(&token, "a node kind"));
        };
        let mut negated_fields = Vec::new();
        let children = self.sequence(Some(&mut negated_fields))?;
        Ok(Shape::Named(NamedShape {
            kind: (kind != "_").then_some(kind),
            negated_fields,
            children,
        }))
    }

    fn group(&mut self, open: TokenPos) -> Result<Shape, QueryError> {
        let sequence = self.sequence(None)?;
        if sequence.items.is_empty() {
            return Err(self.error_at(open, "empty group"));
        }
        Ok(Shape::Group(sequence))
    }

    fn alternation(&mut self, open: TokenPos) -> Result<Shape, QueryError> {
        let mut alternatives = Vec::new();
        loop {
            if let Some(TokenKind::RBracket) = self.peek_kind() {
                self.index = self.index.saturating_add(1);
                break;
            }
            let start = self.peek().map_or(open, |token| token.pos);
            match self.child()? {
                Child::Pattern(pattern, Quantifier::One) => alternatives.push(pattern),
                Child::Pattern(..) => {
                    return Err(self.error_at(start, "quantify the alternation, not an alternative"));
                }
                Child::Predicate => {}
            }
        }
        if alternatives.is_empty() {
            return Err(self.error_at(open, "empty alternation"));
        }
        Ok(Shape::Alternation(alternatives))
    }

    /// Parses child constraints up to and including the closing `)`.
    fn sequence(
        &mut self,
        mut negated_fields: Option<&mut Vec<String>>,
    ) -> Result<Sequence, QueryError> {
        let mut sequence = Sequence::default();
        let mut anchored = false;
        loop {
            let Some(token) = self.peek().cloned() else {
                return Err(self.eof_error());
            };
            match &token.kind {
                TokenKind::RParen => {
                    self.index = self.index.saturating_add(1);
                    break;
                }
                TokenKind::Dot => {
                    self.index = self.index.saturating_add(1);
                    anchored = true;
                    continue;
                }
                TokenKind::Bang => {
                    self.index = self.index.saturating_add(1);
                    let field = self.bump()?;
                    let (TokenKind::Ident(name), Some(fields)) =
                        (&field.kind, negated_fields.as_deref_mut())
                    else {
                        return Err(self.unexpected(&field, "a field name inside a named node"));
                    };
                    fields.push(name.clone());
                    continue;
                }
                _ => {}
            }

            let field = match (&token.kind, self.peek_second()) {
                (TokenKind::Ident(name), Some(TokenKind::Colon)) => {
                    let name = name.clone();
                    self.index = self.index.saturating_add(2);
                    Some(name)
                }
                _ => None,
            };

            match self.child()? {
                Child::Predicate if field.is_some() => {
                    return Err(self.error_at(token.pos, "a field needs a pattern, not a predicate"));
                }
                Child::Predicate => {}
                Child::Pattern(
                    Pattern {
                        shape: Shape::Group(inner),
                        captures,
                    },
                    quantifier,
                ) => {
                    if quantifier != Quantifier::One || field.is_some() || !captures.is_empty() {
                        return Err(self.error_at(
                            token.pos,
                            "nested groups cannot carry fields, quantifiers or captures",
                        ));
                    }
                    let mut items = inner.items.into_iter();
                    if let Some(mut first) = items.next() {
                        first.anchored |= anchored;
                        sequence.items.push(first);
                    }
                    sequence.items.extend(items);
                    anchored = inner.anchored_end;
                }
                Child::Pattern(pattern, quantifier) => {
                    sequence.items.push(ChildPattern {
                        field,
                        pattern,
                        quantifier,
                        anchored,
                    });
                    anchored = false;
                }
            }
        }
        sequence.anchored_end = anchored;
        Ok(sequence)
    }

    fn predicate_call(&mut self) -> Result<(), QueryError> {
        let head = self.bump()?;
        let TokenKind::Predicate(name) = head.kind else {
            return Err(self.unexpected(&head, "a predicate name"));
        };
        let mut args = Vec::new();
        loop {
            let token = self.bump()?;
            match token.kind {
                TokenKind::RParen => break,
                TokenKind::Capture(capture) => args.push(RawArg::Capture {
                    name: capture,
                    pos: token.pos,
                }),
                TokenKind::Str(text) | TokenKind::Ident(text) => args.push(RawArg::Text(text)),
                _ => return Err(self.unexpected(&token, "a capture, string or identifier")),
            }
        }
        self.calls.push(RawCall {
            name,
            args,
            pos: head.pos,
        });
        Ok(())
    }
}

/// A group holding one unadorned pattern is that pattern; the group's own
/// captures are appended to it.
fn collapse(pattern: Pattern) -> Pattern {
    let Pattern { shape, captures } = pattern;
    match shape {
        Shape::Group(sequence)
            if sequence.items.len() == 1
                && !sequence.anchored_end
                && sequence.items.iter().all(|item| {
                    item.field.is_none() && item.quantifier == Quantifier::One && !item.anchored
                }) =>
        {
            let mut items = sequence.items;
            match items.pop() {
                Some(item) => {
                    let mut inner = item.pattern;
                    inner.captures.extend(captures);
                    inner
                }
                None => Pattern {
                    shape: Shape::Group(Sequence::default()),
                    captures,
                },
            }
        }
        shape => Pattern { shape, captures },
    }
}
