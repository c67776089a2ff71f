//! Source information attached to nodes and diagnostics

use crate::types::{FileId, Range};
use serde::{Deserialize, Serialize};

/// Where a node or message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceInfo {
    pub file_id: FileId,
    pub range: Range,
}

impl SourceInfo {
    pub fn new(file_id: FileId, range: Range) -> Self {
        SourceInfo { file_id, range }
    }

    /// Source info with offsets only (rows and columns left at zero).
    pub fn from_offsets(file_id: FileId, start: usize, end: usize) -> Self {
        SourceInfo {
            file_id,
            range: Range::from_offsets(start, end),
        }
    }

    pub fn start_offset(&self) -> usize {
        self.range.start.offset
    }

    pub fn end_offset(&self) -> usize {
        self.range.end.offset
    }

    /// The smallest source info covering both `self` and `other`.
    ///
    /// Returns `self` unchanged when the two are in different files.
    pub fn combine(&self, other: &SourceInfo) -> SourceInfo {
        if self.file_id != other.file_id {
            return *self;
        }
        let start = self.range.start.min(other.range.start);
        let end = self.range.end.max(other.range.end);
        SourceInfo {
            file_id: self.file_id,
            range: Range { start, end },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_same_file() {
        let a = SourceInfo::from_offsets(FileId(1), 4, 8);
        let b = SourceInfo::from_offsets(FileId(1), 2, 6);
        let c = a.combine(&b);
        assert_eq!(c.start_offset(), 2);
        assert_eq!(c.end_offset(), 8);
    }

    #[test]
    fn test_combine_different_files_keeps_self() {
        let a = SourceInfo::from_offsets(FileId(1), 4, 8);
        let b = SourceInfo::from_offsets(FileId(2), 0, 20);
        assert_eq!(a.combine(&b), a);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let info = SourceInfo::from_offsets(FileId(3), 1, 2);
        let json = serde_json::to_string(&info).unwrap();
        let back: SourceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, back);
    }
}
