/*
 * lines.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Line splitting and line-level recognizers.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// One source line without its terminator, with the absolute offset of its
/// first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Line<'a> {
    pub text: &'a str,
    pub offset: usize,
}

impl<'a> Line<'a> {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    /// Drop up to `n` leading spaces.
    pub fn dedent(&self, n: usize) -> Line<'a> {
        let strip = self
            .text
            .bytes()
            .take(n)
            .take_while(|b| *b == b' ')
            .count();
        Line {
            text: &self.text[strip..],
            offset: self.offset + strip,
        }
    }

    /// Drop `n` bytes from the front.
    pub fn skip(&self, n: usize) -> Line<'a> {
        let n = n.min(self.text.len());
        Line {
            text: &self.text[n..],
            offset: self.offset + n,
        }
    }

    /// Leading whitespace removed.
    pub fn trim_start(&self) -> Line<'a> {
        let trimmed = self.text.trim_start();
        self.skip(self.text.len() - trimmed.len())
    }
}

/// Split text into lines, dropping `\r` before `\n`.
pub(crate) fn split_lines(text: &str, base: usize) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            let end = if i > start && text.as_bytes()[i - 1] == b'\r' {
                i - 1
            } else {
                i
            };
            lines.push(Line {
                text: &text[start..end],
                offset: base + start,
            });
            start = i + 1;
        }
    }
    if start < text.len() {
        lines.push(Line {
            text: &text[start..],
            offset: base + start,
        });
    }
    lines
}

/// Join lines back into one string. The offset is that of the first line.
pub(crate) fn join_lines(lines: &[Line<'_>]) -> (String, usize) {
    let offset = lines.first().map(|l| l.offset).unwrap_or(0);
    let text = lines.iter().map(|l| l.text).collect::<Vec<_>>().join("\n");
    (text, offset)
}

/// Number of leading spaces, with tabs counted as four.
pub(crate) fn indent_width(text: &str) -> usize {
    let mut width = 0;
    for b in text.bytes() {
        match b {
            b' ' => width += 1,
            b'\t' => width += 4,
            _ => break,
        }
    }
    width
}

/// An opening code, directive or colon fence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fence<'a> {
    pub ch: u8,
    pub len: usize,
    pub info: &'a str,
}

pub(crate) fn fence_open(text: &str) -> Option<Fence<'_>> {
    if indent_width(text) > 3 {
        return None;
    }
    let t = text.trim_start();
    let ch = *t.as_bytes().first()?;
    if !matches!(ch, b'`' | b'~' | b':') {
        return None;
    }
    let len = t.bytes().take_while(|b| *b == ch).count();
    if len < 3 {
        return None;
    }
    let info = t[len..].trim();
    if ch == b'`' && info.contains('`') {
        return None;
    }
    Some(Fence { ch, len, info })
}

/// Whether `text` closes a fence of `ch` at least `len` long.
pub(crate) fn fence_close(text: &str, ch: u8, len: usize) -> Option<usize> {
    if indent_width(text) > 3 {
        return None;
    }
    let t = text.trim();
    let run = t.bytes().take_while(|b| *b == ch).count();
    (run >= len && run == t.len()).then_some(run)
}

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?(?:[ \t]+#+)?[ \t]*$").expect("valid regex"));
static THEMATIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(?:(?:\*[ \t]*){3,}|(?:-[ \t]*){3,}|(?:_[ \t]*){3,})$")
        .expect("valid regex")
});
static TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}\(([^()\s][^()]*)\)=\s*$").expect("valid regex"));
static FOOTNOTE_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}\[\^([^\]\s]+)\]:[ \t]?").expect("valid regex"));
static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^( {0,3})([-*+])(?:([ \t]+)|$)").expect("valid regex"));
static ORDERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^( {0,3})(\d{1,9})([.)])(?:([ \t]+)|$)").expect("valid regex"));
static TABLE_DELIMITER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}\|?[ \t]*:?-+:?[ \t]*(?:\|[ \t]*:?-+:?[ \t]*)*\|?[ \t]*$")
        .expect("valid regex")
});
static SETEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(=+|-+)[ \t]*$").expect("valid regex"));

/// `(depth, title start, title)` of an ATX heading.
pub(crate) fn atx_heading(text: &str) -> Option<(u8, usize, &str)> {
    let caps = HEADING.captures(text)?;
    let depth = caps.get(1)?.as_str().len() as u8;
    match caps.get(2) {
        Some(title) => Some((depth, title.start(), title.as_str())),
        None => Some((depth, text.len(), "")),
    }
}

pub(crate) fn is_thematic_break(text: &str) -> bool {
    THEMATIC.is_match(text)
}

/// Label of a `(label)=` target line.
pub(crate) fn target_label(text: &str) -> Option<&str> {
    TARGET
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// `(label, content start)` of a footnote definition's first line.
pub(crate) fn footnote_definition(text: &str) -> Option<(&str, usize)> {
    let caps = FOOTNOTE_DEF.captures(text)?;
    let whole = caps.get(0)?;
    Some((caps.get(1)?.as_str(), whole.end()))
}

/// Setext underline level (1 for `=`, 2 for `-`).
pub(crate) fn setext_level(text: &str) -> Option<u8> {
    let caps = SETEXT.captures(text)?;
    let underline = caps.get(1)?.as_str();
    Some(if underline.starts_with('=') { 1 } else { 2 })
}

pub(crate) fn is_table_delimiter(text: &str) -> bool {
    text.contains('-') && text.contains('|') && TABLE_DELIMITER.is_match(text)
}

/// A list item marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListMarker {
    pub ordered: bool,
    pub start: u32,
    /// `-`, `*`, `+`, `.` or `)`
    pub delimiter: u8,
    /// Column of the marker
    pub indent: usize,
    /// Column where the item content starts
    pub content: usize,
}

pub(crate) fn list_marker(text: &str) -> Option<ListMarker> {
    if let Some(caps) = BULLET.captures(text) {
        let indent = caps.get(1)?.as_str().len();
        let delimiter = caps.get(2)?.as_str().as_bytes()[0];
        let spaces = caps.get(3).map(|m| m.as_str().len()).unwrap_or(1);
        let spaces = if spaces > 4 { 1 } else { spaces };
        return Some(ListMarker {
            ordered: false,
            start: 1,
            delimiter,
            indent,
            content: indent + 1 + spaces,
        });
    }
    let caps = ORDERED.captures(text)?;
    let indent = caps.get(1)?.as_str().len();
    let digits = caps.get(2)?.as_str();
    let delimiter = caps.get(3)?.as_str().as_bytes()[0];
    let spaces = caps.get(4).map(|m| m.as_str().len()).unwrap_or(1);
    let spaces = if spaces > 4 { 1 } else { spaces };
    Some(ListMarker {
        ordered: true,
        start: digits.parse().ok()?,
        delimiter,
        indent,
        content: indent + digits.len() + 1 + spaces,
    })
}

/// Whether a line starts a block that interrupts a paragraph.
pub(crate) fn interrupts_paragraph(text: &str) -> bool {
    let t = text.trim_start();
    if indent_width(text) > 3 {
        return false;
    }
    atx_heading(text).is_some()
        || fence_open(text).is_some()
        || t.starts_with('>')
        || t.starts_with("$$")
        || t.starts_with("+++")
        || (t.starts_with('%') && indent_width(text) == 0)
        || is_thematic_break(text)
        || target_label(text).is_some()
        || footnote_definition(text).is_some()
        || list_marker(text).is_some_and(|m| {
            // an empty item or an ordered item not starting at 1 can't interrupt
            !text.trim().is_empty() && text.trim().len() > 1 && (!m.ordered || m.start == 1)
        })
}
