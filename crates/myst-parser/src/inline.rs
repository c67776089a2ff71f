/*
 * inline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Inline parser.
 */

//! Second phase of parsing: inline content of paragraphs, headings and
//! table cells, including role invocations.
//!
//! Inline text is parsed from a [`Fragment`]: the joined text of one or more
//! lines plus the absolute offset each line started at, so nodes point back
//! into the original file even when container markers were stripped.

use myst_ast::{CiteKind, Node, NodeKind, ReferenceStyle};
use myst_error_reporting::{DiagnosticMessageBuilder, rules};
use myst_extensions::{FragmentParser, RawRole};
use myst_source_map::SourceInfo;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::lines::Line;
use crate::parser::Parser;

static AUTOLINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.\-]{1,31}:[^\s<>]*|[A-Za-z0-9.!#$%&'*+/=?^_`{|}~\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)*)$")
        .expect("valid regex")
});

/// Joined inline text with a map back to source offsets.
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    pub text: String,
    /// `(index in text, absolute offset)` for the start of every line
    segments: Vec<(usize, usize)>,
}

impl Fragment {
    pub fn contiguous(text: &str, offset: usize) -> Self {
        Fragment {
            text: text.to_string(),
            segments: vec![(0, offset)],
        }
    }

    /// Join lines with `\n`. Trailing whitespace of the last line is dropped.
    pub fn from_lines(lines: &[Line<'_>]) -> Self {
        let mut text = String::new();
        let mut segments = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            segments.push((text.len(), line.offset));
            if i + 1 == lines.len() {
                text.push_str(line.text.trim_end());
            } else {
                text.push_str(line.text);
            }
        }
        if segments.is_empty() {
            segments.push((0, 0));
        }
        Fragment { text, segments }
    }

    /// Absolute source offset of byte `index` of the joined text.
    pub fn abs(&self, index: usize) -> usize {
        let at = self.segments.partition_point(|(start, _)| *start <= index);
        let (start, offset) = self.segments[at.saturating_sub(1)];
        offset + (index - start)
    }
}

/// Parse a fragment into inline nodes.
pub(crate) fn parse_inlines(fragment: &Fragment, parser: &mut Parser<'_>) -> Vec<Node> {
    let mut inlines = Inlines {
        fragment,
        src: &fragment.text,
        parser,
    };
    inlines.parse(0, fragment.text.len())
}

struct Inlines<'f, 'p, 'r> {
    fragment: &'f Fragment,
    src: &'f str,
    parser: &'p mut Parser<'r>,
}

type Matched = Option<(Vec<Node>, usize)>;

impl Inlines<'_, '_, '_> {
    fn info(&self, start: usize, end: usize) -> SourceInfo {
        SourceInfo::from_offsets(
            self.parser.file_id(),
            self.fragment.abs(start),
            self.fragment.abs(end),
        )
    }

    fn byte(&self, i: usize) -> Option<u8> {
        self.src.as_bytes().get(i).copied()
    }

    fn text_node(&self, value: &str, start: usize, end: usize) -> Node {
        Node::text(value).at(self.info(start, end))
    }

    fn parse(&mut self, start: usize, end: usize) -> Vec<Node> {
        let mut out: Vec<Node> = Vec::new();
        let mut text = String::new();
        let mut text_start = start;
        let mut i = start;
        while i < end {
            let c = self.src.as_bytes()[i];
            if c == b'\n' {
                let hard = text.ends_with("  ");
                let kept = text.trim_end_matches([' ', '\t']).len();
                text.truncate(kept);
                if hard {
                    self.flush(&mut out, &mut text, text_start, i);
                    out.push(Node::new(NodeKind::Break).at(self.info(i, i + 1)));
                    text_start = i + 1;
                } else {
                    text.push('\n');
                }
                i += 1;
                continue;
            }
            let matched = match c {
                b'\\' => self.escape(i, end),
                b'`' => self.code_span(i, end),
                b'{' => self.role(i, end),
                b'$' => self.inline_math(i, end),
                b'*' | b'_' => self.emphasis(i, end),
                b'~' => self.strikethrough(i, end),
                b'!' => self.image(i, end),
                b'[' => self.bracket(i, end),
                b'<' => self.autolink(i, end),
                b'@' => self.narrative_citation(i, end),
                _ => None,
            };
            match matched {
                Some((nodes, next)) => {
                    self.flush(&mut out, &mut text, text_start, i);
                    out.extend(nodes);
                    i = next;
                    text_start = i;
                }
                None => {
                    let ch = self.src[i..].chars().next().unwrap_or(' ');
                    text.push(ch);
                    i += ch.len_utf8();
                }
            }
        }
        self.flush(&mut out, &mut text, text_start, end);
        merge_text(out)
    }

    fn flush(&self, out: &mut Vec<Node>, text: &mut String, start: usize, end: usize) {
        if !text.is_empty() {
            out.push(self.text_node(text, start, end));
            text.clear();
        }
    }

    fn escape(&self, i: usize, end: usize) -> Matched {
        match self.byte(i + 1) {
            Some(b'\n') if i + 1 < end => Some((
                vec![Node::new(NodeKind::Break).at(self.info(i, i + 2))],
                i + 2,
            )),
            Some(c) if i + 1 < end && c.is_ascii_punctuation() => {
                let escaped = (c as char).to_string();
                Some((vec![self.text_node(&escaped, i, i + 2)], i + 2))
            }
            _ => None,
        }
    }

    fn run_length(&self, i: usize, end: usize, ch: u8) -> usize {
        self.src.as_bytes()[i..end]
            .iter()
            .take_while(|b| **b == ch)
            .count()
    }

    /// Start of the next run of exactly `n` backticks.
    fn find_backticks(&self, from: usize, end: usize, n: usize) -> Option<usize> {
        let mut j = from;
        while j < end {
            if self.src.as_bytes()[j] == b'`' {
                let run = self.run_length(j, end, b'`');
                if run == n {
                    return Some(j);
                }
                j += run;
            } else {
                j += 1;
            }
        }
        None
    }

    fn code_span(&self, i: usize, end: usize) -> Matched {
        let n = self.run_length(i, end, b'`');
        let Some(close) = self.find_backticks(i + n, end, n) else {
            let ticks = "`".repeat(n);
            return Some((vec![self.text_node(&ticks, i, i + n)], i + n));
        };
        let value = code_content(&self.src[i + n..close]);
        let node = Node::new(NodeKind::InlineCode { value }).at(self.info(i, close + n));
        Some((vec![node], close + n))
    }

    /// `` {name}`content` ``
    fn role(&mut self, i: usize, end: usize) -> Matched {
        let rest = &self.src[i + 1..end];
        let name_len = rest
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || b"_:+.-".contains(b))
            .count();
        if name_len == 0 || rest.as_bytes().get(name_len) != Some(&b'}') {
            return None;
        }
        let name = &rest[..name_len];
        let ticks_at = i + 1 + name_len + 1;
        if self.byte(ticks_at) != Some(b'`') {
            return None;
        }
        let n = self.run_length(ticks_at, end, b'`');
        let content_start = ticks_at + n;
        let Some(close) = self.find_backticks(content_start, end, n) else {
            let diagnostic = DiagnosticMessageBuilder::warning(format!("Unclosed `{name}` role"))
                .with_code(rules::PARSE_EXTENSION_SYNTAX)
                .with_location(self.info(i, end))
                .add_hint("Role content is written between matching backticks")
                .build();
            self.parser.push_diagnostic(diagnostic);
            return None;
        };
        let raw = RawRole {
            name: name.to_string(),
            content: self.src[content_start..close].to_string(),
            content_offset: self.fragment.abs(content_start),
            position: Some(self.info(i, close + n)),
        };
        let node = self.parser.run_role(raw);
        Some((vec![node], close + n))
    }

    fn inline_math(&self, i: usize, end: usize) -> Matched {
        if self.byte(i + 1) == Some(b'$') {
            return Some((vec![self.text_node("$$", i, i + 2)], i + 2));
        }
        let first = self.byte(i + 1)?;
        if i + 1 >= end || first.is_ascii_whitespace() {
            return None;
        }
        let bytes = self.src.as_bytes();
        let mut j = i + 1;
        while j < end {
            match bytes[j] {
                b'\\' => j += 2,
                b'$' => {
                    let before = bytes[j - 1];
                    let after = bytes.get(j + 1).copied();
                    if !before.is_ascii_whitespace() && !after.is_some_and(|a| a.is_ascii_digit())
                    {
                        let value = self.src[i + 1..j].to_string();
                        let node = Node::new(NodeKind::InlineMath { value }).at(self.info(i, j + 1));
                        return Some((vec![node], j + 1));
                    }
                    j += 1;
                }
                _ => j += 1,
            }
        }
        None
    }

    /// A closing delimiter run for `ch` that fits `count`, skipping escapes
    /// and code spans.
    fn find_closer(&self, from: usize, end: usize, ch: u8, count: usize) -> Option<usize> {
        let bytes = self.src.as_bytes();
        let mut j = from;
        while j < end {
            match bytes[j] {
                b'\\' => j += 2,
                b'`' => {
                    let n = self.run_length(j, end, b'`');
                    j = self
                        .find_backticks(j + n, end, n)
                        .map(|c| c + n)
                        .unwrap_or(j + n);
                }
                b if b == ch => {
                    let run = self.run_length(j, end, ch);
                    let fits = match count {
                        1 => run == 1 || run >= 3,
                        _ => run >= count,
                    };
                    let after = bytes.get(j + run).copied();
                    let left_flanking = j > from && !bytes[j - 1].is_ascii_whitespace();
                    let word_ok = ch != b'_' || !after.is_some_and(|a| a.is_ascii_alphanumeric());
                    if fits && left_flanking && word_ok {
                        return Some(j + run - count);
                    }
                    j += run;
                }
                _ => j += 1,
            }
        }
        None
    }

    fn emphasis(&mut self, i: usize, end: usize) -> Matched {
        let ch = self.src.as_bytes()[i];
        let run = self.run_length(i, end, ch);
        let next = self.byte(i + run);
        let prev_alnum = i > 0 && self.src.as_bytes()[i - 1].is_ascii_alphanumeric();
        if next.is_none_or(|n| n.is_ascii_whitespace()) || (ch == b'_' && prev_alnum) {
            let literal = (ch as char).to_string().repeat(run);
            return Some((vec![self.text_node(&literal, i, i + run)], i + run));
        }
        if run >= 2 {
            if let Some(close) = self.find_closer(i + 2, end, ch, 2) {
                let children = self.parse(i + 2, close);
                let node = Node::with_children(NodeKind::Strong, children).at(self.info(i, close + 2));
                return Some((vec![node], close + 2));
            }
        }
        if let Some(close) = self.find_closer(i + 1, end, ch, 1) {
            let children = self.parse(i + 1, close);
            let node = Node::with_children(NodeKind::Emphasis, children).at(self.info(i, close + 1));
            return Some((vec![node], close + 1));
        }
        let literal = (ch as char).to_string().repeat(run);
        Some((vec![self.text_node(&literal, i, i + run)], i + run))
    }

    fn strikethrough(&mut self, i: usize, end: usize) -> Matched {
        if self.run_length(i, end, b'~') != 2 {
            return None;
        }
        let close = self.find_closer(i + 2, end, b'~', 2)?;
        let children = self.parse(i + 2, close);
        let node = Node::with_children(NodeKind::Delete, children).at(self.info(i, close + 2));
        Some((vec![node], close + 2))
    }

    /// Index of the `]` matching the `[` at `i`.
    fn matching_bracket(&self, i: usize, end: usize, open: u8, close: u8) -> Option<usize> {
        let bytes = self.src.as_bytes();
        let mut depth = 0usize;
        let mut j = i;
        while j < end {
            let b = bytes[j];
            if b == b'\\' {
                j += 2;
                continue;
            }
            if b == b'`' {
                let n = self.run_length(j, end, b'`');
                j = self
                    .find_backticks(j + n, end, n)
                    .map(|c| c + n)
                    .unwrap_or(j + n);
                continue;
            }
            if b == open {
                depth += 1;
            } else if b == close {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            j += 1;
        }
        None
    }

    /// `(destination, title, end)` of `(dest "title")` starting at `paren`.
    fn destination(&self, paren: usize, end: usize) -> Option<(String, Option<String>, usize)> {
        if self.byte(paren) != Some(b'(') {
            return None;
        }
        let close = self.matching_bracket(paren, end, b'(', b')')?;
        let inner = self.src[paren + 1..close].trim();
        let (dest, rest) = if let Some(stripped) = inner.strip_prefix('<') {
            let gt = stripped.find('>')?;
            (&stripped[..gt], &stripped[gt + 1..])
        } else {
            match inner.find(char::is_whitespace) {
                Some(ws) => (&inner[..ws], &inner[ws..]),
                None => (inner, ""),
            }
        };
        let rest = rest.trim();
        let title = match (rest.chars().next(), rest.chars().last()) {
            (Some('"'), Some('"')) | (Some('\''), Some('\'')) | (Some('('), Some(')'))
                if rest.len() >= 2 =>
            {
                Some(rest[1..rest.len() - 1].to_string())
            }
            _ if rest.is_empty() => None,
            _ => return None,
        };
        Some((dest.to_string(), title, close + 1))
    }

    fn image(&mut self, i: usize, end: usize) -> Matched {
        if self.byte(i + 1) != Some(b'[') {
            return None;
        }
        let close = self.matching_bracket(i + 1, end, b'[', b']')?;
        let (url, title, next) = self.destination(close + 1, end)?;
        let alt = self.src[i + 2..close].to_string();
        let node = Node::new(NodeKind::Image {
            url,
            alt: (!alt.is_empty()).then_some(alt),
            title,
            width: None,
            align: None,
        })
        .at(self.info(i, next));
        Some((vec![node], next))
    }

    fn bracket(&mut self, i: usize, end: usize) -> Matched {
        if self.byte(i + 1) == Some(b'^') {
            return self.footnote_reference(i, end);
        }
        let close = self.matching_bracket(i, end, b'[', b']')?;
        if let Some((url, title, next)) = self.destination(close + 1, end) {
            let children = self.parse(i + 1, close);
            let position = self.info(i, next);
            let node = match url.strip_prefix('#') {
                Some(label) if !label.is_empty() => Node::with_children(
                    NodeKind::CrossReference {
                        style: ReferenceStyle::Link,
                        template: None,
                        target_kind: None,
                        url: None,
                        resolved: false,
                    },
                    children,
                )
                .labelled(label),
                _ => Node::with_children(NodeKind::Link { url, title }, children),
            };
            return Some((vec![node.at(position)], next));
        }
        self.citation_group(i, close)
    }

    fn footnote_reference(&self, i: usize, end: usize) -> Matched {
        let close = self.src[i..end].find(']').map(|c| c + i)?;
        let label = &self.src[i + 2..close];
        if label.is_empty() || label.contains(char::is_whitespace) {
            return None;
        }
        let node = Node::new(NodeKind::FootnoteReference)
            .labelled(label)
            .at(self.info(i, close + 1));
        Some((vec![node], close + 1))
    }

    /// `[see @doe2020, p. 3; @roe]`
    fn citation_group(&self, i: usize, close: usize) -> Matched {
        let content = &self.src[i + 1..close];
        if !content.contains('@') {
            return None;
        }
        let position = self.info(i, close + 1);
        let mut cites = Vec::new();
        for part in content.split(';') {
            let at = part.find('@')?;
            let key_len = citation_key_len(&part[at + 1..]);
            if key_len == 0 {
                return None;
            }
            let key = &part[at + 1..at + 1 + key_len];
            let prefix = part[..at].trim();
            let suffix = part[at + 1 + key_len..]
                .trim()
                .trim_start_matches(',')
                .trim();
            cites.push(cite_node(
                key,
                CiteKind::Parenthetical,
                (!prefix.is_empty()).then(|| prefix.to_string()),
                (!suffix.is_empty()).then(|| suffix.to_string()),
                position,
            ));
        }
        let group = Node::with_children(
            NodeKind::CiteGroup {
                kind: CiteKind::Parenthetical,
            },
            cites,
        )
        .at(position);
        Some((vec![group], close + 1))
    }

    fn narrative_citation(&self, i: usize, end: usize) -> Matched {
        if i > 0 {
            let prev = self.src.as_bytes()[i - 1];
            if prev.is_ascii_alphanumeric() || prev == b'@' {
                return None;
            }
        }
        let key_len = citation_key_len(&self.src[i + 1..end]);
        if key_len == 0 {
            return None;
        }
        let key = &self.src[i + 1..i + 1 + key_len];
        let position = self.info(i, i + 1 + key_len);
        let cite = cite_node(key, CiteKind::Narrative, None, None, position);
        let group = Node::with_children(
            NodeKind::CiteGroup {
                kind: CiteKind::Narrative,
            },
            vec![cite],
        )
        .at(position);
        Some((vec![group], i + 1 + key_len))
    }

    fn autolink(&self, i: usize, end: usize) -> Matched {
        let close = self.src[i + 1..end].find('>').map(|c| c + i + 1)?;
        let target = &self.src[i + 1..close];
        if !AUTOLINK.is_match(target) {
            return None;
        }
        let url = if target.contains(':') {
            target.to_string()
        } else {
            format!("mailto:{target}")
        };
        let text = self.text_node(target, i + 1, close);
        let node = Node::with_children(NodeKind::Link { url, title: None }, vec![text])
            .at(self.info(i, close + 1));
        Some((vec![node], close + 1))
    }
}

fn cite_node(
    key: &str,
    kind: CiteKind,
    prefix: Option<String>,
    suffix: Option<String>,
    position: SourceInfo,
) -> Node {
    let mut cite = Node::new(NodeKind::Cite {
        key: key.to_string(),
        kind,
        prefix,
        suffix,
        error: false,
    })
    .at(position);
    cite.label = Some(key.to_string());
    cite.identifier = Some(key.to_string());
    cite
}

/// Length of a citation key at the start of `text`; trailing punctuation is
/// not part of the key.
fn citation_key_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    if !bytes
        .first()
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
    {
        return 0;
    }
    let mut len = bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || b"_:.#$%&-+?<>~/".contains(b))
        .count();
    while len > 0 && b".:,;?!/".contains(&bytes[len - 1]) {
        len -= 1;
    }
    len
}

/// Content of a code span: newlines become spaces and one surrounding space
/// is stripped when present on both sides.
fn code_content(raw: &str) -> String {
    let value = raw.replace('\n', " ");
    if value.len() >= 2
        && value.starts_with(' ')
        && value.ends_with(' ')
        && !value.trim().is_empty()
    {
        value[1..value.len() - 1].to_string()
    } else {
        value
    }
}

/// Merge adjacent text nodes.
fn merge_text(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let (Some(last), NodeKind::Text { value }) = (out.last_mut(), &node.kind) {
            if let NodeKind::Text { value: previous } = &mut last.kind {
                previous.push_str(value);
                last.position = match (last.position, node.position) {
                    (Some(a), Some(b)) => Some(a.combine(&b)),
                    (a, b) => a.or(b),
                };
                continue;
            }
        }
        out.push(node);
    }
    out
}
