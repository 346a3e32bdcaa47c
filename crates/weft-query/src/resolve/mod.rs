//! The capture resolver.
//!
//! Each consumer reads the same [`crate::MatchResult`] and applies its own
//! precedence: highlights and injections keep the lowest-ranked rule per
//! node, indents keep every marker, brackets pair captures within a match and
//! text objects keep one entry per node, object and variant.

mod brackets;
mod highlight;
mod indent;
mod injection;
mod textobject;

pub use brackets::{BracketMatch, BracketPair, BracketPairs, BracketScan, BracketTable, NodeBracketPair};
pub use highlight::{HighlightMap, HighlightSpan, HighlightTag};
pub use indent::{IndentDirection, IndentMarker, IndentMarkers, IndentScan, IndentStep};
pub use injection::{
    Injection, InjectionLayer, InjectionLayers, InjectionMap, InjectionResolver, InjectionState,
    RuleSetProvider,
};
pub use textobject::{TextObject, TextObjectVariant, TextObjects};
