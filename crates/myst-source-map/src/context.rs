//! Source context for managing files

use crate::line_index::LineIndex;
use crate::source_info::SourceInfo;
use crate::types::{FileId, Range};
use serde::{Deserialize, Serialize};

/// Registry of every source file taking part in a build.
///
/// File ids are assigned sequentially in registration order, which is also
/// the canonical project order used for numbering and duplicate-label
/// tie-breaks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceContext {
    files: Vec<SourceFile>,
}

/// A source file with content and its line index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// File path or identifier
    pub path: String,
    pub content: String,
    #[serde(skip)]
    line_index: Option<LineIndex>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let line_index = Some(LineIndex::new(&content));
        SourceFile {
            path: path.into(),
            content,
            line_index,
        }
    }

    pub fn line_index(&self) -> LineIndex {
        match &self.line_index {
            Some(index) => index.clone(),
            None => LineIndex::new(&self.content),
        }
    }
}

impl SourceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file and return its id.
    pub fn add_file(&mut self, path: impl Into<String>, content: impl Into<String>) -> FileId {
        let id = FileId(self.files.len());
        self.files.push(SourceFile::new(path, content));
        id
    }

    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0)
    }

    /// Find a file id by path.
    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.files.iter().position(|f| f.path == path).map(FileId)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &SourceFile)> {
        self.files.iter().enumerate().map(|(i, f)| (FileId(i), f))
    }

    /// Build a fully resolved [`SourceInfo`] for a byte range in a file.
    ///
    /// Rows and columns are filled in from the file's line index. Unknown
    /// files yield offset-only info.
    pub fn source_info(&self, file_id: FileId, start: usize, end: usize) -> SourceInfo {
        let Some(file) = self.get_file(file_id) else {
            return SourceInfo::from_offsets(file_id, start, end);
        };
        let index = file.line_index();
        match (index.location(start), index.location(end)) {
            (Some(start), Some(end)) => SourceInfo::new(file_id, Range { start, end }),
            _ => SourceInfo::from_offsets(file_id, start, end),
        }
    }

    /// Fill rows and columns for an offset-only [`SourceInfo`].
    pub fn resolve(&self, info: &SourceInfo) -> SourceInfo {
        self.source_info(info.file_id, info.start_offset(), info.end_offset())
    }
}
