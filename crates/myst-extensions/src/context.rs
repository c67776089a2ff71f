/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Context handed to directive and role expansion.
 */

use myst_ast::Node;
use myst_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder};
use myst_source_map::{FileId, SourceInfo};

/// Re-entry point into the parser for expansion code.
///
/// Implemented by the parser. Offsets are absolute byte offsets of the
/// fragment in the file being parsed, so nested nodes keep real positions.
pub trait FragmentParser {
    fn parse_blocks(&mut self, text: &str, offset: usize) -> Vec<Node>;
    fn parse_inlines(&mut self, text: &str, offset: usize) -> Vec<Node>;
    fn report(&mut self, diagnostic: DiagnosticMessage);
    fn file_id(&self) -> FileId;
}

/// What an expansion may do besides returning nodes: parse fragments and
/// report problems. It cannot reach the registry or other documents.
pub struct ExpandContext<'a> {
    parser: &'a mut dyn FragmentParser,
}

impl<'a> ExpandContext<'a> {
    pub fn new(parser: &'a mut dyn FragmentParser) -> Self {
        ExpandContext { parser }
    }

    pub fn parse_blocks(&mut self, text: &str, offset: usize) -> Vec<Node> {
        self.parser.parse_blocks(text, offset)
    }

    /// Parse inline content. Block structure in `text` is not recognized.
    pub fn parse_inlines(&mut self, text: &str, offset: usize) -> Vec<Node> {
        self.parser.parse_inlines(text, offset)
    }

    pub fn report(&mut self, diagnostic: DiagnosticMessage) {
        self.parser.report(diagnostic);
    }

    pub fn warn(&mut self, code: &str, title: impl Into<String>, position: Option<SourceInfo>) {
        let diagnostic = DiagnosticMessageBuilder::warning(title)
            .with_code(code)
            .with_optional_location(position)
            .build();
        self.parser.report(diagnostic);
    }

    pub fn file_id(&self) -> FileId {
        self.parser.file_id()
    }

    pub fn source_info(&self, start: usize, end: usize) -> SourceInfo {
        SourceInfo::from_offsets(self.parser.file_id(), start, end)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A minimal fragment parser: blocks are paragraphs split on blank
    //! lines, inlines are a single text node.

    use super::*;

    #[derive(Default)]
    pub struct PlainFragments {
        pub reported: Vec<DiagnosticMessage>,
    }

    impl FragmentParser for PlainFragments {
        fn parse_blocks(&mut self, text: &str, _offset: usize) -> Vec<Node> {
            text.split("\n\n")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| Node::paragraph(vec![Node::text(p)]))
                .collect()
        }

        fn parse_inlines(&mut self, text: &str, _offset: usize) -> Vec<Node> {
            if text.is_empty() {
                Vec::new()
            } else {
                vec![Node::text(text)]
            }
        }

        fn report(&mut self, diagnostic: DiagnosticMessage) {
            self.reported.push(diagnostic);
        }

        fn file_id(&self) -> FileId {
            FileId(0)
        }
    }
}
