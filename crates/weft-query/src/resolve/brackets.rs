//! Bracket pair tables, text scans and tree pairs.
//!
//! Delimiters are literal strings of any length, so markup comments
//! (`<!--` / `-->`) and template comments (`@*` / `*@`) pair the same way
//! braces do.

use std::cmp::Reverse;
use std::ops::Range;

use crate::matcher::MatchResult;
use crate::query::{RuleSet, Shape};
use crate::tree::{NodeId, SyntaxTree};

/// One open/close delimiter pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketPair {
    /// Opening delimiter.
    pub open: String,
    /// Closing delimiter.
    pub close: String,
}

/// An ordered list of delimiter pairs.
///
/// # Example
///
/// ```
/// use weft_query::BracketTable;
///
/// let table = BracketTable::markup();
/// assert_eq!(table.close_for("<!--"), Some("-->"));
/// let scan = table.scan("<!-- {x} -->");
/// assert_eq!(scan.pairs.len(), 2);
/// assert!(scan.unmatched.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketTable {
    pairs: Vec<BracketPair>,
}

impl BracketTable {
    /// Builds a table from `(open, close)` pairs, dropping empty delimiters
    /// and repeated pairs.
    #[must_use]
    pub fn new<O, C>(pairs: impl IntoIterator<Item = (O, C)>) -> Self
    where
        O: Into<String>,
        C: Into<String>,
    {
        let mut table = Self::default();
        for (open, close) in pairs {
            table.push(open.into(), close.into());
        }
        table
    }

    /// Returns the pairs used for markup and templating documents.
    #[must_use]
    pub fn markup() -> Self {
        Self::new([
            ("{", "}"),
            ("[", "]"),
            ("(", ")"),
            ("<!--", "-->"),
            ("@*", "*@"),
            ("<", ">"),
        ])
    }

    /// Collects the anonymous literals captured `@open` and `@close` within
    /// each rule, pairing them in order.
    #[must_use]
    pub fn from_rule_set(rules: &RuleSet) -> Self {
        let mut table = Self::default();
        for rule in rules.rules() {
            let mut opens = Vec::new();
            let mut closes = Vec::new();
            rule.pattern().walk(&mut |pattern| {
                let Shape::Anonymous(text) = &pattern.shape else {
                    return;
                };
                for capture in &pattern.captures {
                    match rules.capture_name(*capture) {
                        Some("open") => opens.push(text.clone()),
                        Some("close") => closes.push(text.clone()),
                        _ => {}
                    }
                }
            });
            for (open, close) in opens.into_iter().zip(closes) {
                table.push(open, close);
            }
        }
        table
    }

    fn push(&mut self, open: String, close: String) {
        let pair = BracketPair { open, close };
        if !pair.open.is_empty() && !pair.close.is_empty() && !self.pairs.contains(&pair) {
            self.pairs.push(pair);
        }
    }

    /// Returns the pairs in declaration order.
    #[must_use]
    pub fn pairs(&self) -> &[BracketPair] {
        &self.pairs
    }

    /// Returns the closing delimiter for `open`.
    #[must_use]
    pub fn close_for(&self, open: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|pair| pair.open == open)
            .map(|pair| pair.close.as_str())
    }

    /// Returns the number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if the table has no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs delimiters in `text` with a stack.
    ///
    /// At each offset the longest delimiter wins. A close pairs with the
    /// nearest unclosed open of the same pair; opens left above it are
    /// reported unmatched. A pair whose open and close are equal toggles.
    #[must_use]
    pub fn scan(&self, text: &str) -> BracketScan {
        let mut delimiters: Vec<Delimiter<'_>> = Vec::new();
        for (pair, entry) in self.pairs.iter().enumerate() {
            if entry.open == entry.close {
                delimiters.push(Delimiter {
                    text: &entry.open,
                    pair,
                    role: Role::Toggle,
                });
            } else {
                delimiters.push(Delimiter {
                    text: &entry.open,
                    pair,
                    role: Role::Open,
                });
                delimiters.push(Delimiter {
                    text: &entry.close,
                    pair,
                    role: Role::Close,
                });
            }
        }
        delimiters.sort_by_key(|delimiter| Reverse(delimiter.text.len()));

        let mut scan = BracketScan::default();
        let mut stack: Vec<(usize, Range<usize>)> = Vec::new();
        let mut offset = 0;
        while let Some(rest) = text.get(offset..).filter(|rest| !rest.is_empty()) {
            let Some(delimiter) = delimiters.iter().find(|delimiter| rest.starts_with(delimiter.text)) else {
                offset += rest.chars().next().map_or(1, char::len_utf8);
                continue;
            };
            let range = offset..offset + delimiter.text.len();
            offset = range.end;
            let closes = match delimiter.role {
                Role::Open => false,
                Role::Close => true,
                Role::Toggle => stack.last().is_some_and(|(pair, _)| *pair == delimiter.pair),
            };
            if !closes {
                stack.push((delimiter.pair, range));
                continue;
            }
            match stack.iter().rposition(|(pair, _)| *pair == delimiter.pair) {
                Some(position) => {
                    scan.unmatched
                        .extend(stack.drain(position + 1..).map(|(_, open)| open));
                    if let Some((pair, open)) = stack.pop() {
                        scan.pairs.push(BracketMatch {
                            open,
                            close: range,
                            pair,
                        });
                    }
                }
                None => scan.unmatched.push(range),
            }
        }
        scan.unmatched.extend(stack.into_iter().map(|(_, open)| open));
        scan.pairs.sort_by_key(|found| found.open.start);
        scan.unmatched.sort_by_key(|range| range.start);
        scan
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Open,
    Close,
    Toggle,
}

#[derive(Debug, Clone, Copy)]
struct Delimiter<'a> {
    text: &'a str,
    pair: usize,
    role: Role,
}

/// One matched delimiter pair in scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketMatch {
    /// Byte range of the open delimiter.
    pub open: Range<usize>,
    /// Byte range of the close delimiter.
    pub close: Range<usize>,
    /// Index of the pair in [`BracketTable::pairs`].
    pub pair: usize,
}

/// The result of [`BracketTable::scan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketScan {
    /// Matched pairs ordered by open position.
    pub pairs: Vec<BracketMatch>,
    /// Delimiters left without a partner, in text order.
    pub unmatched: Vec<Range<usize>>,
}

/// A pair of bracket nodes captured by one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeBracketPair {
    /// The `@open` node.
    pub open: NodeId,
    /// The `@close` node.
    pub close: NodeId,
    /// Byte range of the open node.
    pub open_range: Range<usize>,
    /// Byte range of the close node.
    pub close_range: Range<usize>,
}

/// Bracket nodes paired by the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketPairs {
    pairs: Vec<NodeBracketPair>,
}

impl BracketPairs {
    /// Pairs the `@open` and `@close` captures of each match in order.
    #[must_use]
    pub fn resolve(tree: &SyntaxTree, result: &MatchResult) -> Self {
        let mut pairs: Vec<NodeBracketPair> = result
            .matches()
            .iter()
            .flat_map(|found| found.nodes_for("open").zip(found.nodes_for("close")))
            .filter_map(|(open, close)| {
                Some(NodeBracketPair {
                    open,
                    close,
                    open_range: tree.node(open)?.byte_range(),
                    close_range: tree.node(close)?.byte_range(),
                })
            })
            .collect();
        pairs.sort_by_key(|pair| (pair.open_range.start, pair.open));
        pairs.dedup_by_key(|pair| (pair.open, pair.close));
        Self { pairs }
    }

    /// Returns the pairs ordered by open position.
    #[must_use]
    pub fn pairs(&self) -> &[NodeBracketPair] {
        &self.pairs
    }

    /// Returns the node paired with `node`, in either direction.
    #[must_use]
    pub fn partner(&self, node: NodeId) -> Option<NodeId> {
        self.pairs.iter().find_map(|pair| {
            if pair.open == node {
                Some(pair.close)
            } else if pair.close == node {
                Some(pair.open)
            } else {
                None
            }
        })
    }
}
