//! Source positions and locations for blueprint documents
//!
//! All positions in this module are 1-indexed, matching what the blueprint loader and
//! validator report. Conversion into 0-indexed protocol positions happens in exactly one
//! place (the analysis crate's position translator), never here.
//!
//! ## Types
//!
//! - [`SourcePosition`] - A 1-indexed line:column position
//! - [`SourceRange`] - A start position with an optional end position
//! - [`ColumnConfidence`] - How far a reported column can be trusted
//! - [`SourceLocation`] - The normalized location shape every structured error reports
//! - [`LineIndex`] - Conversion between character offsets and positions for a text buffer
//!
//! Columns count characters, not bytes, so multi-byte content in string literals does not
//! shift positions on the remainder of a line.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-indexed position in a blueprint source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// A range covered by a node of the schema tree.
///
/// The end position is optional because the loader does not always know where a scalar
/// ends (multi-line literal blocks being the usual culprit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: SourcePosition,
    pub end: Option<SourcePosition>,
}

impl SourceRange {
    pub fn new(start: SourcePosition, end: SourcePosition) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn starting_at(start: SourcePosition) -> Self {
        Self { start, end: None }
    }

    /// Check whether `pos` falls inside this range, allowing the end column to be
    /// exceeded by `leeway` characters on the last line of the range.
    ///
    /// A range with no end only covers its start line.
    pub fn contains_with_leeway(&self, pos: SourcePosition, leeway: usize) -> bool {
        let after_start = self.start.line < pos.line
            || (self.start.line == pos.line && self.start.column <= pos.column);
        if !after_start {
            return false;
        }
        match self.end {
            Some(end) => {
                end.line > pos.line || (end.line == pos.line && end.column + leeway >= pos.column)
            }
            None => self.start.line == pos.line,
        }
    }

    pub fn contains(&self, pos: SourcePosition) -> bool {
        self.contains_with_leeway(pos, 0)
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}..{}", self.start, end),
            None => write!(f, "{}..", self.start),
        }
    }
}

/// Tri-state indicator of how reliable a reported column is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnConfidence {
    Exact,
    /// Reported inside constructs such as multi-line literal blocks where the loader can
    /// only point at the enclosing line.
    Approximate,
    #[default]
    Unknown,
}

/// Normalized location reported by every structured error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub end_line: Option<usize>,
    pub end_column: Option<usize>,
    pub column_confidence: ColumnConfidence,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, confidence: ColumnConfidence) -> Self {
        Self {
            line: Some(line),
            column: Some(column),
            end_line: None,
            end_column: None,
            column_confidence: confidence,
        }
    }

    pub fn with_end(mut self, end_line: usize, end_column: usize) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }

    /// A location that carries neither a line nor a column.
    pub fn is_absent(&self) -> bool {
        self.line.is_none() && self.column.is_none()
    }

    /// The column, unless the confidence says it should not be trusted at all.
    pub fn usable_column(&self) -> Option<usize> {
        match self.column_confidence {
            ColumnConfidence::Unknown => None,
            _ => self.column,
        }
    }
}

impl From<SourceRange> for SourceLocation {
    fn from(range: SourceRange) -> Self {
        let location = SourceLocation::new(
            range.start.line,
            range.start.column,
            ColumnConfidence::Exact,
        );
        match range.end {
            Some(end) => location.with_end(end.line, end.column),
            None => location,
        }
    }
}

/// Fast conversion between character offsets and 1-indexed positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Character offsets where each line starts
    line_starts: Vec<usize>,
    char_len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        let mut char_len = 0;
        for (idx, ch) in source.chars().enumerate() {
            if ch == '\n' {
                line_starts.push(idx + 1);
            }
            char_len = idx + 1;
        }
        Self {
            line_starts,
            char_len,
        }
    }

    pub fn position_of(&self, char_offset: usize) -> SourcePosition {
        let offset = char_offset.min(self.char_len);
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|i| i - 1);
        SourcePosition::new(line + 1, offset - self.line_starts[line] + 1)
    }

    /// Character offset of `pos`, clamped to the end of its line and of the text.
    pub fn offset_of(&self, pos: SourcePosition) -> usize {
        let line = pos.line.max(1) - 1;
        let Some(&start) = self.line_starts.get(line) else {
            return self.char_len;
        };
        let line_end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.char_len);
        (start + pos.column.max(1) - 1).min(line_end)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_contains_respects_leeway_on_last_line() {
        let range = SourceRange::new(SourcePosition::new(3, 5), SourcePosition::new(3, 12));
        assert!(range.contains(SourcePosition::new(3, 12)));
        assert!(!range.contains(SourcePosition::new(3, 14)));
        assert!(range.contains_with_leeway(SourcePosition::new(3, 14), 2));
        assert!(!range.contains_with_leeway(SourcePosition::new(3, 15), 2));
        assert!(!range.contains_with_leeway(SourcePosition::new(3, 4), 2));
    }

    #[test]
    fn open_ended_range_covers_only_start_line() {
        let range = SourceRange::starting_at(SourcePosition::new(2, 3));
        assert!(range.contains(SourcePosition::new(2, 40)));
        assert!(!range.contains(SourcePosition::new(3, 1)));
    }

    #[test]
    fn unknown_confidence_hides_column() {
        let mut location = SourceLocation::new(4, 9, ColumnConfidence::Approximate);
        assert_eq!(location.usable_column(), Some(9));
        location.column_confidence = ColumnConfidence::Unknown;
        assert_eq!(location.usable_column(), None);
        assert!(!location.is_absent());
        assert!(SourceLocation::default().is_absent());
    }

    #[test]
    fn line_index_round_trips_offsets() {
        let text = "version: 2025-05-12\nresources:\n  ördersTable:\n";
        let index = LineIndex::new(text);
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.position_of(0), SourcePosition::new(1, 1));
        assert_eq!(index.position_of(20), SourcePosition::new(2, 1));
        let pos = SourcePosition::new(3, 4);
        assert_eq!(index.position_of(index.offset_of(pos)), pos);
    }

    #[test]
    fn line_index_clamps_past_end_of_line() {
        let index = LineIndex::new("ab\ncd");
        assert_eq!(index.offset_of(SourcePosition::new(1, 10)), 2);
        assert_eq!(index.offset_of(SourcePosition::new(9, 1)), 5);
    }
}
