//! Predicates, properties and directives attached to rules.
//!
//! Predicates (`#name?`) are checked after a structural match and can discard
//! it. `#set!` becomes a [`Property`]; any other `#name!` is kept verbatim as
//! a [`Directive`] for consumers to interpret.

use regex::Regex;

use super::lexer::TokenPos;
use super::parser::{RawArg, RawCall};
use super::pattern::CaptureId;
use crate::error::{QueryError, RuleLocation};
use crate::tree::{NodeId, SyntaxTree};

/// Right-hand side of an equality predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Compare against another capture's text.
    Capture(CaptureId),
    /// Compare against a literal.
    Text(String),
}

/// A run-time assertion over captured text.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// `#eq?` / `#not-eq?`.
    Eq {
        /// Capture under test.
        capture: CaptureId,
        /// Value compared against.
        operand: Operand,
        /// `true` for `#not-eq?`.
        negated: bool,
    },
    /// `#match?` / `#not-match?`.
    Match {
        /// Capture under test.
        capture: CaptureId,
        /// Compiled regular expression.
        regex: Regex,
        /// `true` for `#not-match?`.
        negated: bool,
    },
    /// `#any-of?` / `#not-any-of?`.
    AnyOf {
        /// Capture under test.
        capture: CaptureId,
        /// Accepted values.
        values: Vec<String>,
        /// `true` for `#not-any-of?`.
        negated: bool,
    },
}

/// A `#set!` key/value pair, optionally scoped to one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Capture the property applies to; `None` for rule-level properties.
    pub capture: Option<CaptureId>,
    /// Property key, such as `injection.language`.
    pub key: String,
    /// Property value; flags such as `injection.include-children` have none.
    pub value: Option<String>,
}

/// An argument to a generic directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveArg {
    /// A capture reference.
    Capture(CaptureId),
    /// A string or bare identifier.
    Text(String),
}

/// A `#name!` directive other than `#set!`, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Directive name including the `!`.
    pub name: String,
    /// Arguments in source order.
    pub args: Vec<DirectiveArg>,
}

/// The validated predicate calls of one rule.
#[derive(Debug, Clone, Default)]
pub(crate) struct Annotations {
    pub(crate) predicates: Vec<Predicate>,
    pub(crate) properties: Vec<Property>,
    pub(crate) directives: Vec<Directive>,
}

/// Validates raw calls against the captures the rule binds.
pub(crate) struct AnnotationCompiler<'r> {
    pub(crate) rank: usize,
    pub(crate) bound: &'r [(String, CaptureId)],
}

enum Arg {
    Capture(CaptureId),
    Text(String),
}

impl AnnotationCompiler<'_> {
    const fn location(&self, pos: TokenPos) -> RuleLocation {
        RuleLocation {
            rule: self.rank,
            line: pos.line,
            column: pos.column,
            offset: pos.offset,
            len: pos.len,
        }
    }

    pub(crate) fn compile(&self, calls: Vec<RawCall>) -> Result<Annotations, QueryError> {
        let mut out = Annotations::default();
        let mut unknown = None;
        for call in calls {
            // Keep validating after an unknown capture so fatal errors later
            // in the rule still reject the whole rule set.
            let args = match self.resolve_args(call.args) {
                Ok(args) => args,
                Err(err) => {
                    unknown.get_or_insert(err);
                    continue;
                }
            };
            let location = self.location(call.pos);
            match call.name.as_str() {
                "eq?" | "not-eq?" => {
                    let negated = call.name.starts_with("not-");
                    let [Arg::Capture(capture), operand] = <[Arg; 2]>::try_from(args).map_err(|_| {
                        QueryError::invalid_predicate(location, &call.name, "expects a capture and one operand")
                    })?
                    else {
                        return Err(QueryError::invalid_predicate(
                            location,
                            &call.name,
                            "the first argument must be a capture",
                        ));
                    };
                    let operand = match operand {
                        Arg::Capture(other) => Operand::Capture(other),
                        Arg::Text(text) => Operand::Text(text),
                    };
                    out.predicates.push(Predicate::Eq {
                        capture,
                        operand,
                        negated,
                    });
                }
                "match?" | "not-match?" => {
                    let negated = call.name.starts_with("not-");
                    let Ok([Arg::Capture(capture), Arg::Text(pattern)]) = <[Arg; 2]>::try_from(args)
                    else {
                        return Err(QueryError::invalid_predicate(
                            location,
                            &call.name,
                            "expects a capture and a regex string",
                        ));
                    };
                    let regex = Regex::new(&pattern)
                        .map_err(|source| QueryError::InvalidRegex { location, source })?;
                    out.predicates.push(Predicate::Match {
                        capture,
                        regex,
                        negated,
                    });
                }
                "any-of?" | "not-any-of?" => {
                    let negated = call.name.starts_with("not-");
                    let mut args = args.into_iter();
                    let Some(Arg::Capture(capture)) = args.next() else {
                        return Err(QueryError::invalid_predicate(
                            location,
                            &call.name,
                            "the first argument must be a capture",
                        ));
                    };
                    let values = args
                        .map(|arg| match arg {
                            Arg::Text(text) => Ok(text),
                            Arg::Capture(_) => Err(QueryError::invalid_predicate(
                                location,
                                &call.name,
                                "values must be strings",
                            )),
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    if values.is_empty() {
                        return Err(QueryError::invalid_predicate(
                            location,
                            &call.name,
                            "expects at least one value",
                        ));
                    }
                    out.predicates.push(Predicate::AnyOf {
                        capture,
                        values,
                        negated,
                    });
                }
                "set!" => out.properties.push(property(location, args)?),
                name if name.ends_with('!') => out.directives.push(Directive {
                    name: call.name.clone(),
                    args: args
                        .into_iter()
                        .map(|arg| match arg {
                            Arg::Capture(id) => DirectiveArg::Capture(id),
                            Arg::Text(text) => DirectiveArg::Text(text),
                        })
                        .collect(),
                }),
                _ => {
                    return Err(QueryError::invalid_predicate(
                        location,
                        &call.name,
                        "unknown predicate",
                    ));
                }
            }
        }
        unknown.map_or(Ok(out), Err)
    }

    fn resolve_args(&self, args: Vec<RawArg>) -> Result<Vec<Arg>, QueryError> {
        args.into_iter()
            .map(|arg| match arg {
                RawArg::Text(text) => Ok(Arg::Text(text)),
                RawArg::Capture { name, pos } => self
                    .bound
                    .iter()
                    .find(|(bound, _)| *bound == name)
                    .map(|(_, id)| Arg::Capture(*id))
                    .ok_or_else(|| QueryError::unknown_capture(self.location(pos), name)),
            })
            .collect()
    }
}

fn property(location: RuleLocation, args: Vec<Arg>) -> Result<Property, QueryError> {
    let mut args = args.into_iter().peekable();
    let capture = match args.peek() {
        Some(Arg::Capture(id)) => {
            let id = *id;
            args.next();
            Some(id)
        }
        _ => None,
    };
    let mut texts = Vec::new();
    for arg in args {
        match arg {
            Arg::Text(text) => texts.push(text),
            Arg::Capture(_) => {
                return Err(QueryError::invalid_predicate(
                    location,
                    "set!",
                    "only the first argument may be a capture",
                ));
            }
        }
    }
    let mut texts = texts.into_iter();
    match (texts.next(), texts.next(), texts.next()) {
        (Some(key), value, None) => Ok(Property {
            capture,
            key,
            value,
        }),
        _ => Err(QueryError::invalid_predicate(
            location,
            "set!",
            "expects a key and an optional value",
        )),
    }
}

impl Predicate {
    /// Evaluates the predicate over the nodes bound in one match.
    ///
    /// Every node bound to a quantified capture must satisfy the predicate.
    /// A capture with no bound nodes satisfies it vacuously.
    pub(crate) fn holds(&self, bindings: &[(CaptureId, NodeId)], tree: &SyntaxTree) -> bool {
        let texts = move |wanted: CaptureId| {
            bindings
                .iter()
                .filter(move |(capture, _)| *capture == wanted)
                .filter_map(move |(_, node)| tree.node(*node))
                .map(|node| node.text())
        };
        match self {
            Self::Eq {
                capture,
                operand: Operand::Text(value),
                negated,
            } => texts(*capture).all(|text| (text == value) != *negated),
            Self::Eq {
                capture,
                operand: Operand::Capture(other),
                negated,
            } => {
                let left: Vec<&str> = texts(*capture).collect();
                let right: Vec<&str> = texts(*other).collect();
                if left.is_empty() || right.is_empty() {
                    return true;
                }
                (left == right) != *negated
            }
            Self::Match {
                capture,
                regex,
                negated,
            } => texts(*capture).all(|text| regex.is_match(text) != *negated),
            Self::AnyOf {
                capture,
                values,
                negated,
            } => texts(*capture).all(|text| values.iter().any(|value| value == text) != *negated),
        }
    }
}
