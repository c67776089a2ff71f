//! Offset to row/column conversion

use crate::types::Location;
use serde::{Deserialize, Serialize};

/// Index of line starts for fast offset lookups.
///
/// Scans the content once; each lookup is a binary search over the
/// recorded newline positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineIndex {
    line_breaks: Vec<usize>,
    total_length: usize,
}

impl LineIndex {
    pub fn new(content: &str) -> Self {
        let line_breaks = content
            .char_indices()
            .filter_map(|(idx, ch)| (ch == '\n').then_some(idx))
            .collect();
        LineIndex {
            line_breaks,
            total_length: content.len(),
        }
    }

    /// Convert a byte offset to a [`Location`].
    ///
    /// Returns `None` if the offset is past the end of the content.
    pub fn location(&self, offset: usize) -> Option<Location> {
        if offset > self.total_length {
            return None;
        }

        // A newline belongs to the line it terminates.
        let row = match self.line_breaks.binary_search(&offset) {
            Ok(idx) | Err(idx) => idx,
        };
        let line_start = if row == 0 {
            0
        } else {
            self.line_breaks[row - 1] + 1
        };

        Some(Location {
            offset,
            row,
            column: offset - line_start,
        })
    }

    /// Byte offset at which `row` starts.
    pub fn line_start(&self, row: usize) -> Option<usize> {
        match row {
            0 => Some(0),
            _ => self.line_breaks.get(row - 1).map(|b| b + 1),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_breaks.len() + 1
    }

    pub fn total_length(&self) -> usize {
        self.total_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content() {
        let index = LineIndex::new("");
        assert_eq!(index.line_count(), 1);
        let loc = index.location(0).unwrap();
        assert_eq!((loc.row, loc.column), (0, 0));
    }

    #[test]
    fn test_multiline_lookup() {
        let index = LineIndex::new("ab\ncd\nef");
        assert_eq!(index.line_count(), 3);

        let loc = index.location(4).unwrap();
        assert_eq!((loc.row, loc.column), (1, 1));

        // The newline itself belongs to the first line
        let loc = index.location(2).unwrap();
        assert_eq!((loc.row, loc.column), (0, 2));

        let loc = index.location(8).unwrap();
        assert_eq!((loc.row, loc.column), (2, 2));
    }

    #[test]
    fn test_out_of_bounds() {
        let index = LineIndex::new("abc");
        assert!(index.location(4).is_none());
    }

    #[test]
    fn test_line_start() {
        let index = LineIndex::new("ab\ncd\nef");
        assert_eq!(index.line_start(0), Some(0));
        assert_eq!(index.line_start(1), Some(3));
        assert_eq!(index.line_start(2), Some(6));
        assert_eq!(index.line_start(3), None);
    }
}
