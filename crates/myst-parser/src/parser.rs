/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Parser state and tree realization.
 */

use myst_ast::{Node, NodeKind};
use myst_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, rules};
use myst_extensions::{ExtensionRegistry, FragmentParser, RawDirective, RawRole};
use myst_source_map::{FileId, SourceInfo};
use serde_json::Value;

use crate::block::{Block, BlockScanner, split_cells};
use crate::inline::{Fragment, parse_inlines};
use crate::lines::{Line, join_lines, split_lines};

/// Directive bodies nested deeper than this are kept as text.
pub const MAX_NESTING: usize = 64;

/// Output of parsing one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub root: Node,
    /// The leading YAML block, if the file has one and it parsed
    pub frontmatter: Option<Value>,
    pub diagnostics: Vec<DiagnosticMessage>,
}

/// Parser for one file.
///
/// Implements [`FragmentParser`] so directive and role expansion can parse
/// bodies with the same registry and the same diagnostics sink.
pub struct Parser<'r> {
    registry: &'r ExtensionRegistry,
    file_id: FileId,
    diagnostics: Vec<DiagnosticMessage>,
    depth: usize,
}

impl<'r> Parser<'r> {
    pub fn new(registry: &'r ExtensionRegistry, file_id: FileId) -> Self {
        Parser {
            registry,
            file_id,
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    /// Parse a whole file: frontmatter, then blocks.
    pub fn parse_document(mut self, source: &str) -> ParseResult {
        let lines = split_lines(source, 0);
        let (frontmatter, body) = self.frontmatter(&lines);
        let (blocks, diagnostics) = BlockScanner::new(&lines[body..], self.file_id).scan();
        self.diagnostics.extend(diagnostics);
        let children = self.realize_top(blocks);
        let root = Node::root(children).at(SourceInfo::from_offsets(self.file_id, 0, source.len()));
        tracing::debug!(
            file = self.file_id.0,
            nodes = root.size(),
            diagnostics = self.diagnostics.len(),
            "parsed document"
        );
        ParseResult {
            root,
            frontmatter,
            diagnostics: self.diagnostics,
        }
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: DiagnosticMessage) {
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn run_role(&mut self, raw: RawRole) -> Node {
        let registry = self.registry;
        registry.run_role(raw, self)
    }

    fn info(&self, span: (usize, usize)) -> SourceInfo {
        SourceInfo::from_offsets(self.file_id, span.0, span.1)
    }

    /// `(frontmatter, index of the first body line)`.
    fn frontmatter(&mut self, lines: &[Line<'_>]) -> (Option<Value>, usize) {
        if lines.first().is_none_or(|l| l.text.trim_end() != "---") {
            return (None, 0);
        }
        let Some(close) = lines
            .iter()
            .skip(1)
            .position(|l| matches!(l.text.trim_end(), "---" | "..."))
            .map(|i| i + 1)
        else {
            return (None, 0);
        };
        let (yaml, _) = join_lines(&lines[1..close]);
        match myst_frontmatter::parse_yaml(&yaml) {
            Ok(value) => (Some(value), close + 1),
            Err(err) => {
                self.diagnostics.push(
                    DiagnosticMessageBuilder::warning("Invalid frontmatter")
                        .with_code(rules::FRONTMATTER_VALID)
                        .with_location(self.info((lines[0].offset, lines[close].end())))
                        .problem(err.to_string())
                        .add_hint("The frontmatter block is ignored")
                        .build(),
                );
                (None, close + 1)
            }
        }
    }

    fn blocks(&mut self, lines: &[Line<'_>]) -> Vec<Node> {
        if self.depth >= MAX_NESTING {
            let (text, offset) = join_lines(lines);
            let span = (offset, offset + text.len());
            self.diagnostics.push(
                DiagnosticMessageBuilder::warning("Content is nested too deeply")
                    .with_code(rules::PARSE_EXTENSION_SYNTAX)
                    .with_location(self.info(span))
                    .problem(format!("Nesting is limited to {MAX_NESTING} levels"))
                    .build(),
            );
            return vec![Node::paragraph(vec![Node::text(text)]).at(self.info(span))];
        }
        self.depth += 1;
        let (blocks, diagnostics) = BlockScanner::new(lines, self.file_id).scan();
        self.diagnostics.extend(diagnostics);
        let nodes = blocks
            .into_iter()
            .flat_map(|block| self.realize(block))
            .collect();
        self.depth -= 1;
        nodes
    }

    /// Realize top-level blocks, grouping them into `block` nodes when the
    /// file uses `+++` block breaks.
    fn realize_top(&mut self, blocks: Vec<Block<'_>>) -> Vec<Node> {
        if !blocks.iter().any(|b| matches!(b, Block::BlockBreak { .. })) {
            return blocks.into_iter().flat_map(|b| self.realize(b)).collect();
        }
        let mut groups: Vec<Node> = Vec::new();
        let mut current = Node::new(NodeKind::Block {
            kind: None,
            meta: None,
        });
        for block in blocks {
            if let Block::BlockBreak { meta, span } = block {
                if !current.children.is_empty() || current.position.is_some() {
                    groups.push(finish_group(current));
                }
                current = Node::new(NodeKind::Block { kind: None, meta }).at(self.info(span));
                continue;
            }
            let nodes = self.realize(block);
            current.children.extend(nodes);
        }
        if !current.children.is_empty() || current.position.is_some() {
            groups.push(finish_group(current));
        }
        groups
    }

    fn realize(&mut self, block: Block<'_>) -> Vec<Node> {
        let node = match block {
            Block::Heading { depth, title, span } => {
                let children = self.inlines(&Fragment::from_lines(&title));
                Node::with_children(NodeKind::Heading { depth }, children).at(self.info(span))
            }
            Block::Paragraph { lines } => {
                let span = (
                    lines.first().map(|l| l.offset).unwrap_or(0),
                    lines.last().map(|l| l.end()).unwrap_or(0),
                );
                let children = self.inlines(&Fragment::from_lines(&lines));
                Node::paragraph(children).at(self.info(span))
            }
            Block::Code {
                lang,
                meta,
                value,
                span,
            } => Node::new(NodeKind::Code {
                lang,
                meta,
                value,
                executable: false,
                show_line_numbers: false,
            })
            .at(self.info(span)),
            Block::Directive {
                name,
                arg,
                options,
                body,
                body_offset,
                span,
            } => {
                let raw = RawDirective {
                    name,
                    arg,
                    options,
                    body,
                    body_offset,
                    position: Some(self.info(span)),
                };
                let registry = self.registry;
                registry.run_directive(raw, self)
            }
            Block::Math { value, label, span } => {
                let mut node = Node::new(NodeKind::Math { value }).at(self.info(span));
                if let Some(label) = label {
                    node.set_label(&label);
                }
                node
            }
            Block::Quote { lines, span } => {
                let children = self.blocks(&lines);
                Node::with_children(NodeKind::Blockquote, children).at(self.info(span))
            }
            Block::List {
                ordered,
                start,
                items,
                span,
            } => {
                let children = items
                    .into_iter()
                    .map(|item| {
                        let content = self.blocks(&item.lines);
                        Node::with_children(NodeKind::ListItem, content).at(self.info(item.span))
                    })
                    .collect();
                let kind = NodeKind::List {
                    ordered,
                    start: ordered.then_some(start),
                };
                Node::with_children(kind, children).at(self.info(span))
            }
            Block::ThematicBreak { span } => Node::new(NodeKind::ThematicBreak).at(self.info(span)),
            // breaks below the top level carry no structure
            Block::BlockBreak { .. } => return Vec::new(),
            Block::Comment { value, span } => {
                Node::new(NodeKind::Comment { value }).at(self.info(span))
            }
            Block::Target { label, span } => Node::new(NodeKind::MystTarget)
                .labelled(&label)
                .at(self.info(span)),
            Block::Table {
                header,
                aligns,
                rows,
                span,
            } => {
                let mut table_rows = vec![self.table_row(header, &aligns, true)];
                for row in rows {
                    table_rows.push(self.table_row(row, &aligns, false));
                }
                Node::with_children(NodeKind::Table, table_rows).at(self.info(span))
            }
            Block::FootnoteDefinition { label, lines, span } => {
                let children = self.blocks(&lines);
                Node::with_children(NodeKind::FootnoteDefinition, children)
                    .labelled(&label)
                    .at(self.info(span))
            }
        };
        vec![node]
    }

    fn table_row(&mut self, row: Line<'_>, aligns: &[Option<String>], header: bool) -> Node {
        let cells = split_cells(row)
            .into_iter()
            .enumerate()
            .map(|(i, cell)| {
                let children = self.inlines(&Fragment::contiguous(cell.text, cell.offset));
                let kind = NodeKind::TableCell {
                    header,
                    align: aligns.get(i).cloned().flatten(),
                };
                Node::with_children(kind, children).at(self.info((cell.offset, cell.end())))
            })
            .collect();
        Node::with_children(NodeKind::TableRow, cells).at(self.info((row.offset, row.end())))
    }

    fn inlines(&mut self, fragment: &Fragment) -> Vec<Node> {
        parse_inlines(fragment, self)
    }
}

fn finish_group(mut group: Node) -> Node {
    let last_end = group.children.last().and_then(|c| c.position);
    group.position = match (group.position, last_end) {
        (Some(start), Some(end)) => Some(start.combine(&end)),
        (start, end) => start.or(end),
    };
    group
}

impl FragmentParser for Parser<'_> {
    fn parse_blocks(&mut self, text: &str, offset: usize) -> Vec<Node> {
        let lines = split_lines(text, offset);
        self.blocks(&lines)
    }

    fn parse_inlines(&mut self, text: &str, offset: usize) -> Vec<Node> {
        self.inlines(&Fragment::contiguous(text, offset))
    }

    fn report(&mut self, diagnostic: DiagnosticMessage) {
        self.diagnostics.push(diagnostic);
    }

    fn file_id(&self) -> FileId {
        self.file_id
    }
}
