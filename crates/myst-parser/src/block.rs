/*
 * block.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Block tokenizer.
 */

//! First phase of parsing: group lines into block tokens.
//!
//! Tokens borrow their lines from the source, so every token still knows the
//! absolute offset of each line. Containers (block quotes, list items,
//! footnote definitions) keep their inner lines with the container markers
//! stripped; they are tokenized again when the tree is realized.

use indexmap::IndexMap;
use myst_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, rules};
use myst_source_map::{FileId, SourceInfo};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::lines::{
    Fence, Line, atx_heading, fence_close, fence_open, footnote_definition, indent_width,
    interrupts_paragraph, is_table_delimiter, is_thematic_break, list_marker, setext_level,
    target_label,
};

static DIRECTIVE_INFO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{([A-Za-z0-9_][A-Za-z0-9_:+.\-]*)\}\s*(.*)$").expect("valid regex")
});
static OPTION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*:([A-Za-z0-9_\-]+):(?:\s+(.*?))?\s*$").expect("valid regex"));
static MATH_CLOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?)\$\$\s*(?:\(([^()\s][^()]*)\))?\s*$").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Block<'a> {
    Heading {
        depth: u8,
        title: Vec<Line<'a>>,
        span: (usize, usize),
    },
    Paragraph {
        lines: Vec<Line<'a>>,
    },
    Code {
        lang: Option<String>,
        meta: Option<String>,
        value: String,
        span: (usize, usize),
    },
    Directive {
        name: String,
        arg: Option<String>,
        options: IndexMap<String, Value>,
        body: Option<String>,
        body_offset: usize,
        span: (usize, usize),
    },
    Math {
        value: String,
        label: Option<String>,
        span: (usize, usize),
    },
    Quote {
        lines: Vec<Line<'a>>,
        span: (usize, usize),
    },
    List {
        ordered: bool,
        start: u32,
        items: Vec<ListItem<'a>>,
        span: (usize, usize),
    },
    ThematicBreak {
        span: (usize, usize),
    },
    BlockBreak {
        meta: Option<String>,
        span: (usize, usize),
    },
    Comment {
        value: String,
        span: (usize, usize),
    },
    Target {
        label: String,
        span: (usize, usize),
    },
    Table {
        header: Line<'a>,
        aligns: Vec<Option<String>>,
        rows: Vec<Line<'a>>,
        span: (usize, usize),
    },
    FootnoteDefinition {
        label: String,
        lines: Vec<Line<'a>>,
        span: (usize, usize),
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ListItem<'a> {
    pub lines: Vec<Line<'a>>,
    pub span: (usize, usize),
}

/// Groups lines into [`Block`]s, collecting syntax warnings on the way.
pub(crate) struct BlockScanner<'a, 'l> {
    lines: &'l [Line<'a>],
    pos: usize,
    file_id: FileId,
    pub diagnostics: Vec<DiagnosticMessage>,
}

impl<'a, 'l> BlockScanner<'a, 'l> {
    pub fn new(lines: &'l [Line<'a>], file_id: FileId) -> Self {
        BlockScanner {
            lines,
            pos: 0,
            file_id,
            diagnostics: Vec::new(),
        }
    }

    pub fn scan(mut self) -> (Vec<Block<'a>>, Vec<DiagnosticMessage>) {
        let mut blocks = Vec::new();
        while self.pos < self.lines.len() {
            if let Some(block) = self.next_block() {
                blocks.push(block);
            }
        }
        (blocks, self.diagnostics)
    }

    fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    fn warn(&mut self, title: impl Into<String>, span: (usize, usize), hint: Option<&str>) {
        let mut builder = DiagnosticMessageBuilder::warning(title)
            .with_code(rules::PARSE_EXTENSION_SYNTAX)
            .with_location(SourceInfo::from_offsets(self.file_id, span.0, span.1));
        if let Some(hint) = hint {
            builder = builder.add_hint(hint);
        }
        self.diagnostics.push(builder.build());
    }

    fn next_block(&mut self) -> Option<Block<'a>> {
        let line = self.peek()?;
        if line.is_blank() {
            self.pos += 1;
            return None;
        }
        let text = line.text;
        let trimmed = text.trim_start();

        if let Some(fence) = fence_open(text) {
            if let Some(block) = self.fenced(line, fence) {
                return Some(block);
            }
        }
        if indent_width(text) >= 4 {
            return Some(self.indented_code());
        }
        if let Some((depth, start, title)) = atx_heading(text) {
            self.pos += 1;
            let title = Line {
                text: title,
                offset: line.offset + start,
            };
            return Some(Block::Heading {
                depth,
                title: vec![title],
                span: (line.offset, line.end()),
            });
        }
        if trimmed.starts_with("$$") {
            if let Some(block) = self.display_math(line) {
                return Some(block);
            }
            return Some(self.paragraph());
        }
        if let Some(rest) = trimmed.strip_prefix("+++") {
            self.pos += 1;
            let meta = rest.trim();
            return Some(Block::BlockBreak {
                meta: (!meta.is_empty()).then(|| meta.to_string()),
                span: (line.offset, line.end()),
            });
        }
        if text.starts_with('%') {
            return Some(self.comment());
        }
        if let Some(label) = target_label(text) {
            self.pos += 1;
            return Some(Block::Target {
                label: label.to_string(),
                span: (line.offset, line.end()),
            });
        }
        if is_thematic_break(text) {
            self.pos += 1;
            return Some(Block::ThematicBreak {
                span: (line.offset, line.end()),
            });
        }
        if trimmed.starts_with('>') && indent_width(text) < 4 {
            return Some(self.quote());
        }
        if let Some((label, content)) = footnote_definition(text) {
            return Some(self.footnote(line, label.to_string(), content));
        }
        if list_marker(text).is_some() {
            return Some(self.list());
        }
        if text.contains('|') {
            if let Some(next) = self.lines.get(self.pos + 1) {
                if is_table_delimiter(next.text) {
                    return Some(self.table());
                }
            }
        }
        Some(self.paragraph())
    }

    fn paragraph(&mut self) -> Block<'a> {
        let mut lines: Vec<Line<'a>> = Vec::new();
        while let Some(line) = self.peek() {
            if line.is_blank() {
                break;
            }
            if !lines.is_empty() {
                if let Some(depth) = setext_level(line.text) {
                    self.pos += 1;
                    let span = (lines[0].offset, line.end());
                    return Block::Heading {
                        depth,
                        title: lines,
                        span,
                    };
                }
                if interrupts_paragraph(line.text) {
                    break;
                }
            }
            lines.push(line.trim_start());
            self.pos += 1;
        }
        Block::Paragraph { lines }
    }

    fn indented_code(&mut self) -> Block<'a> {
        let mut lines: Vec<Line<'a>> = Vec::new();
        while let Some(line) = self.peek() {
            if line.is_blank() || indent_width(line.text) >= 4 {
                lines.push(line.dedent(4));
                self.pos += 1;
            } else {
                break;
            }
        }
        while lines.last().is_some_and(|l| l.is_blank()) {
            lines.pop();
        }
        let span = span_of(&lines);
        let value = lines.iter().map(|l| l.text).collect::<Vec<_>>().join("\n");
        Block::Code {
            lang: None,
            meta: None,
            value,
            span,
        }
    }

    /// A backtick, tilde or colon fence. `None` means the line is not a
    /// fence after all and should be read as a paragraph.
    fn fenced(&mut self, open: Line<'a>, fence: Fence<'a>) -> Option<Block<'a>> {
        let is_colon = fence.ch == b':';
        let info = fence.info;
        let directive = DIRECTIVE_INFO.captures(info);

        if is_colon && directive.is_none() {
            if info.is_empty() {
                return None;
            }
            // a colon fence must name a directive; keep the lines as text
            self.warn(
                format!("Malformed directive fence `{}`", open.text.trim()),
                (open.offset, open.end()),
                Some("Colon fences must start with `:::{name}`"),
            );
            return None;
        }

        let indent = indent_width(open.text).min(3);
        self.pos += 1;
        let body_start = self.pos;
        let mut nested: Vec<usize> = Vec::new();
        let mut close = None;
        while let Some(line) = self.peek() {
            if is_colon {
                if let Some(inner) = fence_open(line.text) {
                    if inner.ch == b':' && DIRECTIVE_INFO.is_match(inner.info) {
                        nested.push(inner.len);
                        self.pos += 1;
                        continue;
                    }
                }
                if let Some(&inner_len) = nested.last() {
                    if fence_close(line.text, b':', inner_len).is_some() {
                        nested.pop();
                        self.pos += 1;
                        continue;
                    }
                }
            }
            if fence_close(line.text, fence.ch, fence.len).is_some() {
                close = Some(line);
                self.pos += 1;
                break;
            }
            self.pos += 1;
        }
        let body_end = if close.is_some() {
            self.pos - 1
        } else {
            self.pos
        };
        let body: Vec<Line<'a>> = self.lines[body_start..body_end]
            .iter()
            .map(|l| l.dedent(indent))
            .collect();
        let end = close
            .map(|l| l.end())
            .or_else(|| body.last().map(|l| l.end()))
            .unwrap_or(open.end());
        let span = (open.offset, end);

        match directive {
            Some(caps) => {
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let arg = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
                Some(self.directive(name, arg, &body, span))
            }
            None if info.starts_with('{') => {
                self.warn(
                    format!("Malformed directive name in `{}`", open.text.trim()),
                    (open.offset, open.end()),
                    Some("Directive names are written as `{name}` directly after the fence"),
                );
                Some(Block::Code {
                    lang: None,
                    meta: Some(info.to_string()),
                    value: join(&body),
                    span,
                })
            }
            None => {
                let mut words = info.splitn(2, char::is_whitespace);
                let lang = words.next().filter(|w| !w.is_empty()).map(str::to_string);
                let meta = words
                    .next()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string);
                Some(Block::Code {
                    lang,
                    meta,
                    value: join(&body),
                    span,
                })
            }
        }
    }

    fn directive(
        &mut self,
        name: &str,
        arg: &str,
        body: &[Line<'a>],
        span: (usize, usize),
    ) -> Block<'a> {
        let mut options = IndexMap::new();
        let mut rest = body;

        if rest.first().is_some_and(|l| l.text.trim_end() == "---") {
            let close = rest
                .iter()
                .skip(1)
                .position(|l| l.text.trim_end() == "---")
                .map(|i| i + 1);
            if let Some(close) = close {
                let yaml = join(&rest[1..close]);
                match myst_frontmatter::parse_yaml(&yaml) {
                    Ok(Value::Object(map)) => options.extend(map),
                    Ok(_) => {}
                    Err(err) => {
                        let at = (rest[0].offset, rest[close].end());
                        self.warn(
                            format!("Invalid options block for `{name}` directive"),
                            at,
                            Some(&err.to_string()),
                        );
                    }
                }
                rest = &rest[close + 1..];
            }
        } else {
            while let Some(caps) = rest.first().and_then(|l| OPTION_LINE.captures(l.text)) {
                let key = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let value = caps
                    .get(2)
                    .map(|m| m.as_str())
                    .filter(|v| !v.is_empty())
                    .map(|v| Value::String(v.to_string()))
                    .unwrap_or(Value::Null);
                options.insert(key.to_string(), value);
                rest = &rest[1..];
            }
        }
        if rest.first().is_some_and(Line::is_blank) {
            rest = &rest[1..];
        }

        let body_offset = rest.first().map(|l| l.offset).unwrap_or(span.1);
        let body = join(rest);
        Block::Directive {
            name: name.to_string(),
            arg: (!arg.is_empty()).then(|| arg.to_string()),
            options,
            body: (!body.trim().is_empty()).then_some(body),
            body_offset,
            span,
        }
    }

    /// `$$ … $$` with an optional `(label)` after the closing `$$`.
    fn display_math(&mut self, open: Line<'a>) -> Option<Block<'a>> {
        let first = open.text.trim_start().strip_prefix("$$")?;
        if let Some(caps) = MATH_CLOSE.captures(first) {
            let value = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            self.pos += 1;
            return Some(Block::Math {
                value: value.trim().to_string(),
                label: caps.get(2).map(|m| m.as_str().trim().to_string()),
                span: (open.offset, open.end()),
            });
        }
        let mut parts = vec![first];
        for (i, line) in self.lines.iter().enumerate().skip(self.pos + 1) {
            if let Some(caps) = MATH_CLOSE.captures(line.text) {
                parts.push(caps.get(1).map(|m| m.as_str()).unwrap_or_default());
                self.pos = i + 1;
                return Some(Block::Math {
                    value: parts.join("\n").trim().to_string(),
                    label: caps.get(2).map(|m| m.as_str().trim().to_string()),
                    span: (open.offset, line.end()),
                });
            }
            parts.push(line.text);
        }
        self.warn(
            "Unclosed display math",
            (open.offset, open.end()),
            Some("Close display math with a line ending in `$$`"),
        );
        None
    }

    fn comment(&mut self) -> Block<'a> {
        let start = self.pos;
        while self.peek().is_some_and(|l| l.text.starts_with('%')) {
            self.pos += 1;
        }
        let lines = &self.lines[start..self.pos];
        let value = lines
            .iter()
            .map(|l| l.text[1..].trim())
            .collect::<Vec<_>>()
            .join("\n");
        Block::Comment {
            value,
            span: span_of(lines),
        }
    }

    fn quote(&mut self) -> Block<'a> {
        let mut lines: Vec<Line<'a>> = Vec::new();
        let mut last_blank = false;
        let start = self.peek().map(|l| l.offset).unwrap_or(0);
        let mut end = start;
        while let Some(line) = self.peek() {
            let trimmed = line.trim_start();
            if indent_width(line.text) < 4 && trimmed.text.starts_with('>') {
                let mut inner = trimmed.skip(1);
                if inner.text.starts_with(' ') {
                    inner = inner.skip(1);
                }
                last_blank = inner.is_blank();
                lines.push(inner);
            } else if !line.is_blank() && !last_blank && !interrupts_paragraph(line.text) {
                lines.push(line);
            } else {
                break;
            }
            end = line.end();
            self.pos += 1;
        }
        Block::Quote {
            lines,
            span: (start, end),
        }
    }

    fn list(&mut self) -> Block<'a> {
        let Some(first) = self.peek().and_then(|l| list_marker(l.text)) else {
            return self.paragraph();
        };
        let mut items = Vec::new();
        while let Some(line) = self.peek() {
            let Some(marker) = list_marker(line.text) else {
                break;
            };
            if marker.ordered != first.ordered
                || marker.delimiter != first.delimiter
                || marker.indent > first.content
            {
                break;
            }
            self.pos += 1;
            let mut lines = vec![line.skip(marker.content.min(line.text.len()))];
            let mut end = line.end();
            let mut pending_blank = 0;
            let mut last_blank = lines[0].is_blank();
            while let Some(next) = self.peek() {
                if next.is_blank() {
                    pending_blank += 1;
                    self.pos += 1;
                    last_blank = true;
                    continue;
                }
                if indent_width(next.text) >= marker.content {
                    for _ in 0..pending_blank {
                        lines.push(Line {
                            text: "",
                            offset: next.offset,
                        });
                    }
                    pending_blank = 0;
                    lines.push(next.dedent(marker.content));
                } else if pending_blank == 0
                    && !last_blank
                    && !interrupts_paragraph(next.text)
                    && list_marker(next.text).is_none()
                {
                    lines.push(next.trim_start());
                } else {
                    break;
                }
                last_blank = false;
                end = next.end();
                self.pos += 1;
            }
            items.push(ListItem {
                lines,
                span: (line.offset, end),
            });
            if pending_blank > 0 {
                // blank lines before a following item stay in the list
                if !self.peek().and_then(|l| list_marker(l.text)).is_some_and(|m| {
                    m.ordered == first.ordered && m.delimiter == first.delimiter
                }) {
                    break;
                }
            }
        }
        let span = (
            items.first().map(|i: &ListItem<'a>| i.span.0).unwrap_or(0),
            items.last().map(|i| i.span.1).unwrap_or(0),
        );
        Block::List {
            ordered: first.ordered,
            start: first.start,
            items,
            span,
        }
    }

    fn footnote(&mut self, line: Line<'a>, label: String, content: usize) -> Block<'a> {
        self.pos += 1;
        let mut lines = vec![line.skip(content)];
        let mut end = line.end();
        let mut pending_blank = 0;
        while let Some(next) = self.peek() {
            if next.is_blank() {
                pending_blank += 1;
                self.pos += 1;
                continue;
            }
            if indent_width(next.text) >= 4 {
                for _ in 0..pending_blank {
                    lines.push(Line {
                        text: "",
                        offset: next.offset,
                    });
                }
                lines.push(next.dedent(4));
            } else if pending_blank == 0 && !interrupts_paragraph(next.text) {
                lines.push(next.trim_start());
            } else {
                break;
            }
            pending_blank = 0;
            end = next.end();
            self.pos += 1;
        }
        Block::FootnoteDefinition {
            label,
            lines,
            span: (line.offset, end),
        }
    }

    fn table(&mut self) -> Block<'a> {
        let header = self.lines[self.pos];
        let delimiter = self.lines[self.pos + 1];
        self.pos += 2;
        let aligns = split_cells(delimiter)
            .into_iter()
            .map(|cell| {
                let c = cell.text.trim();
                match (c.starts_with(':'), c.ends_with(':')) {
                    (true, true) => Some("center".to_string()),
                    (true, false) => Some("left".to_string()),
                    (false, true) => Some("right".to_string()),
                    (false, false) => None,
                }
            })
            .collect();
        let mut rows = Vec::new();
        while let Some(line) = self.peek() {
            if line.is_blank() || !line.text.contains('|') {
                break;
            }
            rows.push(line);
            self.pos += 1;
        }
        let end = rows.last().map(|l| l.end()).unwrap_or(delimiter.end());
        Block::Table {
            header,
            aligns,
            rows,
            span: (header.offset, end),
        }
    }
}

/// Cells of a pipe table row. Pipes inside code spans or escaped with `\`
/// don't split.
pub(crate) fn split_cells<'a>(line: Line<'a>) -> Vec<Line<'a>> {
    let row = line.trim_start();
    let text = row.text.trim_end();
    let bytes = text.as_bytes();
    let mut cells = Vec::new();
    let mut start = usize::from(text.starts_with('|'));
    let mut i = start;
    let mut in_code = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'`' => in_code = !in_code,
            b'|' if !in_code => {
                cells.push(cell_line(row, start, i));
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < text.len() {
        cells.push(cell_line(row, start, text.len()));
    }
    cells
}

fn cell_line<'a>(row: Line<'a>, start: usize, end: usize) -> Line<'a> {
    let raw = &row.text[start..end];
    let lead = raw.len() - raw.trim_start().len();
    Line {
        text: raw.trim(),
        offset: row.offset + start + lead,
    }
}

fn join(lines: &[Line<'_>]) -> String {
    lines.iter().map(|l| l.text).collect::<Vec<_>>().join("\n")
}

fn span_of(lines: &[Line<'_>]) -> (usize, usize) {
    match (lines.first(), lines.last()) {
        (Some(first), Some(last)) => (first.offset, last.end()),
        _ => (0, 0),
    }
}
