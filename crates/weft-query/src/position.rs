//! Shared position types and conversion helpers.
//!
//! Tree positions are zero-based with byte columns, matching tree-sitter. For
//! user-facing messages, we prefer one-based line and column numbers.

use std::fmt;

/// A zero-based row and byte column within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Point {
    /// Zero-based line.
    pub row: u32,
    /// Zero-based byte column.
    pub column: u32,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Converts the point to one-based display coordinates.
    #[must_use]
    pub const fn to_one_based(self) -> (u32, u32) {
        (self.row.saturating_add(1), self.column.saturating_add(1))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line, column) = self.to_one_based();
        write!(f, "{line}:{column}")
    }
}

/// Saturating conversion for offsets stored in `u32` fields.
pub(crate) fn clamp_u32(value: usize) -> u32 {
    // Line/column numbers will realistically never exceed u32::MAX.
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Maps byte offsets to rows and columns.
///
/// Used for text that has no tree, such as the input of a bracket scan.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Indexes the line starts of `source`.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(
                source
                    .bytes()
                    .enumerate()
                    .filter(|(_, byte)| *byte == b'\n')
                    .map(|(offset, _)| offset.saturating_add(1)),
            )
            .collect();
        Self { line_starts }
    }

    /// Returns the zero-based point of a byte offset.
    #[must_use]
    pub fn point_at(&self, offset: usize) -> Point {
        let row = match self.line_starts.binary_search(&offset) {
            Ok(row) => row,
            Err(next) => next.saturating_sub(1),
        };
        let line_start = self.line_starts.get(row).copied().unwrap_or(0);
        Point::new(clamp_u32(row), clamp_u32(offset.saturating_sub(line_start)))
    }
}
