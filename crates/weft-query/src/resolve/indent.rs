//! Indent markers and nesting-depth scans.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::matcher::MatchResult;
use crate::tree::{NodeId, SyntaxTree};

const OPEN_CAPTURES: [&str; 2] = ["indent", "indent.begin"];
const CLOSE_CAPTURES: [&str; 4] = ["end", "outdent", "indent.end", "indent.dedent"];

/// What a marker does to the nesting depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndentDirection {
    /// Leaves a level. Sorts first at a shared offset.
    Close,
    /// Carries an indent capture without changing the depth.
    None,
    /// Enters a level.
    Open,
}

/// One indent boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentMarker {
    /// Node the capture was bound to.
    pub node: NodeId,
    /// Byte offset of the boundary.
    pub byte: usize,
    /// Effect on the depth.
    pub direction: IndentDirection,
    /// Capture that produced the marker.
    pub capture: Arc<str>,
}

/// A marker together with the depth reported at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentStep {
    /// The boundary.
    pub marker: IndentMarker,
    /// Depth before entering (opens) or after leaving (closes).
    pub depth: usize,
}

/// Indent markers in scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndentMarkers {
    markers: Vec<IndentMarker>,
}

impl IndentMarkers {
    /// Converts indent captures into ordered markers.
    ///
    /// `@indent` and `@indent.begin` open a level at the node start. The
    /// level closes at the node end unless the same match captured a close
    /// (`@end`, `@outdent`, `@indent.end`, `@indent.dedent`), which closes at
    /// that node's start instead.
    #[must_use]
    pub fn resolve(tree: &SyntaxTree, result: &MatchResult) -> Self {
        let mut seen = BTreeSet::new();
        let mut markers = Vec::new();
        for found in result.matches() {
            let explicit_close = found
                .captures()
                .iter()
                .any(|capture| CLOSE_CAPTURES.contains(&capture.name()));
            for capture in found.captures() {
                let Some(node) = tree.node(capture.node()) else {
                    continue;
                };
                let mut push = |byte: usize, direction: IndentDirection| {
                    if seen.insert((capture.node(), byte, direction)) {
                        markers.push(IndentMarker {
                            node: capture.node(),
                            byte,
                            direction,
                            capture: capture.shared_name(),
                        });
                    }
                };
                let name = capture.name();
                if OPEN_CAPTURES.contains(&name) {
                    push(node.start_byte(), IndentDirection::Open);
                    if !explicit_close {
                        push(node.end_byte(), IndentDirection::Close);
                    }
                } else if CLOSE_CAPTURES.contains(&name) {
                    push(node.start_byte(), IndentDirection::Close);
                } else if name.starts_with("indent.") {
                    push(node.start_byte(), IndentDirection::None);
                }
            }
        }
        markers.sort_by(scan_order);
        Self { markers }
    }

    /// Returns the markers in scan order.
    #[must_use]
    pub fn markers(&self) -> &[IndentMarker] {
        &self.markers
    }

    /// Returns `true` if there are no markers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Walks the markers left to right, tracking the nesting depth.
    #[must_use]
    pub fn scan(&self) -> IndentScan {
        let mut depth = 0_usize;
        let steps = self
            .markers
            .iter()
            .map(|marker| {
                let reported = match marker.direction {
                    IndentDirection::Open => {
                        let before = depth;
                        depth += 1;
                        before
                    }
                    IndentDirection::Close => {
                        depth = depth.saturating_sub(1);
                        depth
                    }
                    IndentDirection::None => depth,
                };
                IndentStep {
                    marker: marker.clone(),
                    depth: reported,
                }
            })
            .collect();
        IndentScan { steps }
    }
}

/// Byte order; closes before plain markers before opens at one offset.
/// Among opens the outer node comes first, among closes the inner one.
fn scan_order(left: &IndentMarker, right: &IndentMarker) -> Ordering {
    left.byte
        .cmp(&right.byte)
        .then_with(|| left.direction.cmp(&right.direction))
        .then_with(|| match left.direction {
            IndentDirection::Close => right.node.cmp(&left.node),
            IndentDirection::Open | IndentDirection::None => left.node.cmp(&right.node),
        })
}

/// The result of [`IndentMarkers::scan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndentScan {
    steps: Vec<IndentStep>,
}

impl IndentScan {
    /// Returns every step in scan order.
    #[must_use]
    pub fn steps(&self) -> &[IndentStep] {
        &self.steps
    }

    /// Returns the depth reported at each open or close boundary.
    #[must_use]
    pub fn depths(&self) -> Vec<usize> {
        self.steps
            .iter()
            .filter(|step| step.marker.direction != IndentDirection::None)
            .map(|step| step.depth)
            .collect()
    }

    /// Returns the nesting depth in effect at `byte`.
    ///
    /// Levels opened strictly before `byte` count; a level closed at `byte`
    /// no longer does.
    #[must_use]
    pub fn level_at(&self, byte: usize) -> usize {
        let mut level = 0;
        for step in &self.steps {
            if step.marker.byte > byte {
                break;
            }
            match step.marker.direction {
                IndentDirection::Open if step.marker.byte < byte => level = step.depth + 1,
                IndentDirection::Close => level = step.depth,
                IndentDirection::Open | IndentDirection::None => {}
            }
        }
        level
    }
}
