//! Translation between 1-indexed source coordinates and 0-indexed protocol coordinates
//!
//! Source positions come from the loader and are 1-indexed on both axes. Editor positions
//! are 0-indexed. Translation never produces a negative coordinate: a zero on the source
//! side clamps to zero on the protocol side.

use blueprint_model::{ColumnConfidence, SourceLocation, SourcePosition, SourceRange};
use lsp_types::{Position, Range};

pub fn to_protocol(pos: SourcePosition) -> Position {
    Position::new(
        pos.line.saturating_sub(1) as u32,
        pos.column.saturating_sub(1) as u32,
    )
}

pub fn from_protocol(pos: Position) -> SourcePosition {
    SourcePosition::new(pos.line as usize + 1, pos.character as usize + 1)
}

/// Protocol range of a tree node. A node without an end covers up to the start of the
/// following line.
pub fn to_protocol_range(range: &SourceRange) -> Range {
    let start = to_protocol(range.start);
    let end = match range.end {
        Some(end) => to_protocol(end),
        None => Position::new(start.line + 1, 0),
    };
    Range::new(start, end)
}

/// Protocol range for an error location, honoring how much the column can be trusted.
///
/// The start column is only used when it is exact; otherwise the range starts at the
/// beginning of the line. The end is only used verbatim when the column is exact and both
/// end coordinates are known; otherwise the range extends to the start of the next line.
/// Returns `None` when the location has no line.
pub fn location_to_protocol_range(location: &SourceLocation) -> Option<Range> {
    let line = location.line?.saturating_sub(1) as u32;
    let exact = location.column_confidence == ColumnConfidence::Exact;
    let start_column = match location.column {
        Some(column) if exact => column.saturating_sub(1) as u32,
        _ => 0,
    };
    let end = match (location.end_line, location.end_column) {
        (Some(end_line), Some(end_column)) if exact => to_protocol(SourcePosition::new(end_line, end_column)),
        _ => Position::new(line + 1, 0),
    };
    Some(Range::new(Position::new(line, start_column), end))
}

/// Check whether `range` covers `pos`, letting the cursor run `leeway` columns past the end
/// of a range that ends on the cursor line.
pub fn range_covers(range: &Range, pos: Position, leeway: u32) -> bool {
    let after_start = range.start.line < pos.line
        || (range.start.line == pos.line && range.start.character <= pos.character);
    let before_end = range.end.line > pos.line
        || (range.end.line == pos.line && range.end.character + leeway >= pos.character);
    after_start && before_end
}
