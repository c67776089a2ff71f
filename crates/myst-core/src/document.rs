/*
 * document.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * A document moving through the build.
 */

use myst_ast::Node;
use myst_error_reporting::{DiagnosticCollector, DiagnosticMessage};
use myst_frontmatter::Frontmatter;
use myst_source_map::FileId;
use serde_json::Value;

use crate::citations::CslItem;

/// Labels and citations a document declares or uses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct References {
    /// Identifiers declared in this document, in document order
    pub labels: Vec<String>,
    /// Citation keys in order of first use
    pub citations: Vec<String>,
    /// Entries for the cited keys that resolved, sorted for a reference list
    pub bibliography: Vec<CslItem>,
}

/// One source file and everything derived from it.
#[derive(Debug, Clone)]
pub struct Document {
    /// Position in the build's input list
    pub index: usize,
    /// Path as given to the build
    pub path: String,
    pub file_id: FileId,
    pub source: String,
    pub root: Node,
    /// Page frontmatter as written
    pub page_frontmatter: Value,
    /// Frontmatter after project inheritance
    pub frontmatter: Frontmatter,
    pub references: References,
    pub diagnostics: DiagnosticCollector,
}

impl Document {
    pub fn new(index: usize, path: impl Into<String>, source: impl Into<String>) -> Self {
        Document {
            index,
            path: path.into(),
            file_id: FileId(index),
            source: source.into(),
            root: Node::root(Vec::new()),
            page_frontmatter: Value::Object(Default::default()),
            frontmatter: Frontmatter::default(),
            references: References::default(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    /// The path without its extension, used in cross-document links.
    pub fn slug(&self) -> &str {
        let path = self.path.as_str();
        let file_start = path.rfind('/').map_or(0, |i| i + 1);
        match path[file_start..].rfind('.') {
            Some(dot) if dot > 0 => &path[..file_start + dot],
            _ => path,
        }
    }

    pub fn report(&mut self, diagnostic: DiagnosticMessage) {
        self.diagnostics.add(diagnostic);
    }

    pub fn title(&self) -> Option<&str> {
        self.frontmatter.title.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(Document::new(0, "a.md", "").slug(), "a");
        assert_eq!(Document::new(0, "dir/b.c.md", "").slug(), "dir/b.c");
        assert_eq!(Document::new(0, "dir.x/README", "").slug(), "dir.x/README");
        assert_eq!(Document::new(0, ".hidden", "").slug(), ".hidden");
    }

    #[test]
    fn test_file_id_follows_index() {
        let doc = Document::new(3, "c.md", "text");
        assert_eq!(doc.file_id, FileId(3));
        assert!(doc.diagnostics.is_empty());
    }
}
