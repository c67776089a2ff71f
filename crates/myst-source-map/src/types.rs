//! Core position types

use serde::{Deserialize, Serialize};

/// A unique identifier for a source file within one build
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct FileId(pub usize);

/// A location in source text (0-indexed)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Location {
    /// Byte offset from start of source
    pub offset: usize,
    /// Row number (0-indexed)
    pub row: usize,
    /// Column number (0-indexed, in bytes from the line start)
    pub column: usize,
}

/// A range in source text from start (inclusive) to end (exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Location,
    pub end: Location,
}

impl Range {
    /// A range that only knows its byte offsets.
    pub fn from_offsets(start: usize, end: usize) -> Self {
        Range {
            start: Location {
                offset: start,
                ..Location::default()
            },
            end: Location {
                offset: end,
                ..Location::default()
            },
        }
    }

    /// Length of the range in bytes.
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `offset` falls inside this range.
    pub fn contains(&self, offset: usize) -> bool {
        self.start.offset <= offset && offset < self.end.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_ordering() {
        let a = Location {
            offset: 0,
            row: 0,
            column: 0,
        };
        let b = Location {
            offset: 10,
            row: 1,
            column: 0,
        };
        assert!(a < b);
    }

    #[test]
    fn test_range_from_offsets() {
        let range = Range::from_offsets(3, 9);
        assert_eq!(range.len(), 6);
        assert!(range.contains(3));
        assert!(!range.contains(9));
        assert!(!range.is_empty());
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let range = Range::from_offsets(9, 3);
        assert!(range.is_empty());
    }
}
