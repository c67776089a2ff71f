/*
 * docx.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * WordprocessingML backend, written as a Flat OPC package.
 */

//! Word output as a single Flat OPC XML file (`pkg:package`), which Word
//! opens directly and which converts losslessly to a zipped `.docx`.
//!
//! The package holds the main document part, a minimal style sheet, the
//! footnotes part when the document has footnotes, and the relationships
//! for external hyperlinks. Images are written as links to their source,
//! not embedded.

use std::collections::HashMap;

use myst_ast::{Node, NodeKind, visit};
use myst_core::Document;

use crate::xml::XmlOut;
use crate::{
    Artifact, Backend, BackendError, BackendOptions, caption_label, container_parts, is_hidden,
    output_text,
};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_NS: &str = "http://schemas.microsoft.com/office/2006/xmlPackage";
const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const RELS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";
const DOCUMENT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const STYLES_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
const FOOTNOTES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.footnotes+xml";

/// Paragraph styles: id, display name, bold, size in half-points.
const PARAGRAPH_STYLES: &[(&str, &str, bool, Option<&str>)] = &[
    ("Title", "Title", true, Some("40")),
    ("Author", "Author", false, None),
    ("Heading1", "heading 1", true, Some("32")),
    ("Heading2", "heading 2", true, Some("28")),
    ("Heading3", "heading 3", true, Some("26")),
    ("Heading4", "heading 4", true, Some("24")),
    ("Heading5", "heading 5", true, None),
    ("Heading6", "heading 6", true, None),
    ("Caption", "caption", false, Some("20")),
    ("SourceCode", "Source Code", false, Some("20")),
    ("Equation", "Equation", false, None),
    ("ListParagraph", "List Paragraph", false, None),
    ("FootnoteText", "footnote text", false, Some("20")),
    ("Bibliography", "Bibliography", false, None),
];

pub struct DocxBackend;

impl Backend for DocxBackend {
    fn name(&self) -> &str {
        "docx"
    }

    fn serialize(&self, doc: &Document, options: &BackendOptions) -> Result<Artifact, BackendError> {
        let definitions = visit::select(&doc.root, |n| matches!(n.kind, NodeKind::FootnoteDefinition));
        let mut w = DocxWriter::new(&definitions);

        w.out.start("w:document", &[("xmlns:w", W_NS), ("xmlns:r", R_NS)])?;
        w.out.start("w:body", &[])?;
        if options.standalone {
            w.title_block(doc)?;
        }
        w.blocks(&doc.root.children)?;
        if options.bibliography && !doc.references.bibliography.is_empty() {
            w.styled_paragraph("Heading1", "References")?;
            for item in &doc.references.bibliography {
                w.styled_paragraph("Bibliography", &item.reference())?;
            }
        }
        w.out.end("w:body")?;
        w.out.end("w:document")?;
        let document = w.take_part()?;

        if !options.standalone {
            return Ok(Artifact::text(document, "application/xml", "xml"));
        }

        let footnotes = if definitions.is_empty() {
            None
        } else {
            w.out
                .start("w:footnotes", &[("xmlns:w", W_NS), ("xmlns:r", R_NS)])?;
            for (i, definition) in definitions.iter().enumerate() {
                let id = (i + 1).to_string();
                w.out.start("w:footnote", &[("w:id", id.as_str())])?;
                w.pending.footnote_mark = true;
                w.paragraph_style = Some("FootnoteText");
                let before = w.paragraphs;
                w.blocks(&definition.children)?;
                if w.paragraphs == before {
                    w.paragraph(|_| Ok(()))?;
                }
                w.paragraph_style = None;
                w.out.end("w:footnote")?;
            }
            w.out.end("w:footnotes")?;
            Some(w.take_part()?)
        };

        let mut pkg = XmlOut::new();
        pkg.declaration()?;
        pkg.raw("\n<?mso-application progid=\"Word.Document\"?>\n")?;
        pkg.start("pkg:package", &[("xmlns:pkg", PKG_NS)])?;
        part(&mut pkg, "/_rels/.rels", RELS_CONTENT_TYPE, &package_relationships()?)?;
        part(&mut pkg, "/word/document.xml", DOCUMENT_CONTENT_TYPE, &document)?;
        part(
            &mut pkg,
            "/word/_rels/document.xml.rels",
            RELS_CONTENT_TYPE,
            &document_relationships(&w.links, footnotes.is_some())?,
        )?;
        part(&mut pkg, "/word/styles.xml", STYLES_CONTENT_TYPE, &styles()?)?;
        if let Some(footnotes) = &footnotes {
            part(&mut pkg, "/word/footnotes.xml", FOOTNOTES_CONTENT_TYPE, footnotes)?;
        }
        pkg.end("pkg:package")?;

        Ok(Artifact {
            content: pkg.finish()?,
            media_type: "application/xml",
            extension: "xml",
        })
    }
}

fn part(pkg: &mut XmlOut, name: &str, content_type: &str, xml: &str) -> Result<(), BackendError> {
    pkg.start("pkg:part", &[("pkg:name", name), ("pkg:contentType", content_type)])?;
    pkg.start("pkg:xmlData", &[])?;
    pkg.raw(xml)?;
    pkg.end("pkg:xmlData")?;
    pkg.end("pkg:part")
}

fn into_string(out: XmlOut) -> Result<String, BackendError> {
    String::from_utf8(out.finish()?).map_err(|err| BackendError::Xml(err.to_string()))
}

fn package_relationships() -> Result<String, BackendError> {
    let mut out = XmlOut::new();
    out.start("Relationships", &[("xmlns", RELS_NS)])?;
    let kind = format!("{REL_TYPE}/officeDocument");
    out.empty(
        "Relationship",
        &[("Id", "rId1"), ("Type", kind.as_str()), ("Target", "word/document.xml")],
    )?;
    out.end("Relationships")?;
    into_string(out)
}

fn document_relationships(links: &[String], footnotes: bool) -> Result<String, BackendError> {
    let mut out = XmlOut::new();
    out.start("Relationships", &[("xmlns", RELS_NS)])?;
    let styles = format!("{REL_TYPE}/styles");
    out.empty(
        "Relationship",
        &[("Id", "rIdStyles"), ("Type", styles.as_str()), ("Target", "styles.xml")],
    )?;
    if footnotes {
        let kind = format!("{REL_TYPE}/footnotes");
        out.empty(
            "Relationship",
            &[("Id", "rIdFootnotes"), ("Type", kind.as_str()), ("Target", "footnotes.xml")],
        )?;
    }
    let hyperlink = format!("{REL_TYPE}/hyperlink");
    for (i, url) in links.iter().enumerate() {
        let id = link_id(i);
        out.empty(
            "Relationship",
            &[
                ("Id", id.as_str()),
                ("Type", hyperlink.as_str()),
                ("Target", url.as_str()),
                ("TargetMode", "External"),
            ],
        )?;
    }
    out.end("Relationships")?;
    into_string(out)
}

fn link_id(index: usize) -> String {
    format!("rIdLink{}", index + 1)
}

fn styles() -> Result<String, BackendError> {
    let mut out = XmlOut::new();
    out.start("w:styles", &[("xmlns:w", W_NS)])?;
    for &(id, name, bold, size) in PARAGRAPH_STYLES {
        out.start("w:style", &[("w:type", "paragraph"), ("w:styleId", id)])?;
        out.empty("w:name", &[("w:val", name)])?;
        if let Some(level) = id.strip_prefix("Heading") {
            let level = level.parse::<u8>().unwrap_or(1).saturating_sub(1).to_string();
            out.start("w:pPr", &[])?;
            out.empty("w:outlineLvl", &[("w:val", level.as_str())])?;
            out.end("w:pPr")?;
        }
        if bold || size.is_some() {
            out.start("w:rPr", &[])?;
            if bold {
                out.empty("w:b", &[])?;
            }
            if let Some(size) = size {
                out.empty("w:sz", &[("w:val", size)])?;
            }
            out.end("w:rPr")?;
        }
        out.end("w:style")?;
    }
    for (id, name) in [("Hyperlink", "Hyperlink"), ("FootnoteReference", "footnote reference")] {
        out.start("w:style", &[("w:type", "character"), ("w:styleId", id)])?;
        out.empty("w:name", &[("w:val", name)])?;
        out.start("w:rPr", &[])?;
        if id == "Hyperlink" {
            out.empty("w:color", &[("w:val", "0563C1")])?;
            out.empty("w:u", &[("w:val", "single")])?;
        } else {
            out.empty("w:vertAlign", &[("w:val", "superscript")])?;
        }
        out.end("w:rPr")?;
        out.end("w:style")?;
    }
    out.end("w:styles")?;
    into_string(out)
}

/// Character formatting in effect for the runs being written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RunStyle {
    character_style: Option<&'static str>,
    code: bool,
    bold: bool,
    italic: bool,
    strike: bool,
    underline: bool,
    vertical: Option<&'static str>,
}

/// Content attached to the next paragraph that gets written.
#[derive(Debug, Default)]
struct Pending {
    bookmark: Option<String>,
    marker: Option<String>,
    footnote_mark: bool,
}

struct DocxWriter {
    out: XmlOut,
    style: RunStyle,
    pending: Pending,
    /// Style applied to paragraphs that set none of their own
    paragraph_style: Option<&'static str>,
    indent: usize,
    paragraphs: usize,
    bookmarks: usize,
    links: Vec<String>,
    footnote_ids: HashMap<String, usize>,
}

impl DocxWriter {
    fn new(definitions: &[&Node]) -> Self {
        let mut footnote_ids = HashMap::new();
        for (i, definition) in definitions.iter().enumerate() {
            if let Some(id) = &definition.identifier {
                footnote_ids.entry(id.clone()).or_insert(i + 1);
            }
        }
        DocxWriter {
            out: XmlOut::new(),
            style: RunStyle::default(),
            pending: Pending::default(),
            paragraph_style: None,
            indent: 0,
            paragraphs: 0,
            bookmarks: 0,
            links: Vec::new(),
            footnote_ids,
        }
    }

    fn take_part(&mut self) -> Result<String, BackendError> {
        into_string(std::mem::replace(&mut self.out, XmlOut::new()))
    }

    fn title_block(&mut self, doc: &Document) -> Result<(), BackendError> {
        if let Some(title) = doc.title() {
            self.styled_paragraph("Title", title)?;
        }
        if let Some(subtitle) = &doc.frontmatter.subtitle {
            self.styled_paragraph("Author", subtitle)?;
        }
        let authors: Vec<&str> = doc
            .frontmatter
            .authors
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        if !authors.is_empty() {
            self.styled_paragraph("Author", &authors.join(", "))?;
        }
        Ok(())
    }

    fn styled_paragraph(&mut self, style: &'static str, text: &str) -> Result<(), BackendError> {
        let saved = self.paragraph_style.replace(style);
        self.paragraph(|w| w.run(text))?;
        self.paragraph_style = saved;
        Ok(())
    }

    /// `<w:p>` with the current paragraph style, indent and pending content.
    fn paragraph(
        &mut self,
        content: impl FnOnce(&mut Self) -> Result<(), BackendError>,
    ) -> Result<(), BackendError> {
        self.paragraphs += 1;
        self.out.start("w:p", &[])?;
        if self.paragraph_style.is_some() || self.indent > 0 {
            self.out.start("w:pPr", &[])?;
            if let Some(style) = self.paragraph_style {
                self.out.empty("w:pStyle", &[("w:val", style)])?;
            }
            if self.indent > 0 {
                let left = (720 * self.indent).to_string();
                self.out.empty("w:ind", &[("w:left", left.as_str())])?;
            }
            self.out.end("w:pPr")?;
        }
        let pending = std::mem::take(&mut self.pending);
        if pending.footnote_mark {
            self.out.start("w:r", &[])?;
            self.out.start("w:rPr", &[])?;
            self.out.empty("w:rStyle", &[("w:val", "FootnoteReference")])?;
            self.out.end("w:rPr")?;
            self.out.empty("w:footnoteRef", &[])?;
            self.out.end("w:r")?;
            self.run(" ")?;
        }
        if let Some(marker) = &pending.marker {
            self.run(marker)?;
        }
        let bookmark = match &pending.bookmark {
            Some(name) => {
                let id = self.bookmarks.to_string();
                self.bookmarks += 1;
                self.out
                    .empty("w:bookmarkStart", &[("w:id", id.as_str()), ("w:name", name.as_str())])?;
                Some(id)
            }
            None => None,
        };
        content(self)?;
        if let Some(id) = bookmark {
            self.out.empty("w:bookmarkEnd", &[("w:id", id.as_str())])?;
        }
        self.out.end("w:p")
    }

    fn with_paragraph_style(
        &mut self,
        style: &'static str,
        content: impl FnOnce(&mut Self) -> Result<(), BackendError>,
    ) -> Result<(), BackendError> {
        let saved = self.paragraph_style.replace(style);
        let result = self.paragraph(content);
        self.paragraph_style = saved;
        result
    }

    fn with_style(
        &mut self,
        change: impl FnOnce(&mut RunStyle),
        node: &Node,
    ) -> Result<(), BackendError> {
        let saved = self.style;
        change(&mut self.style);
        let result = self.inlines(&node.children);
        self.style = saved;
        result
    }

    fn run_properties(&mut self) -> Result<(), BackendError> {
        let s = self.style;
        if s == RunStyle::default() {
            return Ok(());
        }
        self.out.start("w:rPr", &[])?;
        if let Some(style) = s.character_style {
            self.out.empty("w:rStyle", &[("w:val", style)])?;
        }
        if s.code {
            self.out
                .empty("w:rFonts", &[("w:ascii", "Courier New"), ("w:hAnsi", "Courier New")])?;
        }
        if s.bold {
            self.out.empty("w:b", &[])?;
        }
        if s.italic {
            self.out.empty("w:i", &[])?;
        }
        if s.strike {
            self.out.empty("w:strike", &[])?;
        }
        if s.underline {
            self.out.empty("w:u", &[("w:val", "single")])?;
        }
        if let Some(vertical) = s.vertical {
            self.out.empty("w:vertAlign", &[("w:val", vertical)])?;
        }
        self.out.end("w:rPr")
    }

    fn run(&mut self, text: &str) -> Result<(), BackendError> {
        if text.is_empty() {
            return Ok(());
        }
        self.out.start("w:r", &[])?;
        self.run_properties()?;
        self.out.element("w:t", &[("xml:space", "preserve")], text)?;
        self.out.end("w:r")
    }

    /// Block children; consecutive inline children share one paragraph.
    fn blocks(&mut self, children: &[Node]) -> Result<(), BackendError> {
        let mut inline: Vec<&Node> = Vec::new();
        for child in children {
            if is_hidden(child) {
                continue;
            }
            if child.kind.is_inline() {
                inline.push(child);
                continue;
            }
            self.flush_inline(&mut inline)?;
            self.block(child)?;
        }
        self.flush_inline(&mut inline)
    }

    fn flush_inline(&mut self, inline: &mut Vec<&Node>) -> Result<(), BackendError> {
        if inline.is_empty() {
            return Ok(());
        }
        let nodes = std::mem::take(inline);
        self.paragraph(|w| {
            for node in nodes {
                w.inline(node)?;
            }
            Ok(())
        })
    }

    fn block(&mut self, node: &Node) -> Result<(), BackendError> {
        match &node.kind {
            NodeKind::Paragraph => {
                self.pending.bookmark = node.html_id.clone().or(self.pending.bookmark.take());
                self.paragraph(|w| w.inlines(&node.children))
            }
            NodeKind::Heading { depth } => {
                let style = match depth {
                    1 => "Heading1",
                    2 => "Heading2",
                    3 => "Heading3",
                    4 => "Heading4",
                    5 => "Heading5",
                    _ => "Heading6",
                };
                self.pending.bookmark = node.html_id.clone();
                if let Some(number) = &node.enumerator {
                    self.pending.marker = Some(format!("{number} "));
                }
                self.with_paragraph_style(style, |w| w.inlines(&node.children))
            }
            NodeKind::Code { value, .. } => {
                self.pending.bookmark = node.html_id.clone();
                self.code_paragraph(value)
            }
            NodeKind::Math { value } => {
                self.pending.bookmark = node.html_id.clone();
                self.with_paragraph_style("Equation", |w| {
                    w.run(value)?;
                    if let Some(number) = &node.enumerator {
                        w.out.start("w:r", &[])?;
                        w.out.empty("w:tab", &[])?;
                        w.out.end("w:r")?;
                        w.run(&format!("({number})"))?;
                    }
                    Ok(())
                })
            }
            NodeKind::List { ordered, start } => {
                let first = start.unwrap_or(1) as usize;
                self.indent += 1;
                for (i, item) in node.children.iter().enumerate() {
                    self.pending.marker = Some(if *ordered {
                        format!("{}. ", first + i)
                    } else {
                        "\u{2022} ".to_string()
                    });
                    let saved = self.paragraph_style.replace("ListParagraph");
                    let result = self.blocks(&item.children);
                    self.paragraph_style = saved;
                    result?;
                }
                self.indent -= 1;
                Ok(())
            }
            NodeKind::Blockquote | NodeKind::Admonition { .. } => {
                self.indent += 1;
                let result = self.blocks(&node.children);
                self.indent -= 1;
                result
            }
            NodeKind::AdmonitionTitle => self.paragraph(|w| {
                let saved = w.style;
                w.style.bold = true;
                let result = w.inlines(&node.children);
                w.style = saved;
                result
            }),
            NodeKind::ThematicBreak => {
                self.out.start("w:p", &[])?;
                self.out.start("w:pPr", &[])?;
                self.out.start("w:pBdr", &[])?;
                self.out.empty(
                    "w:bottom",
                    &[("w:val", "single"), ("w:sz", "6"), ("w:space", "1"), ("w:color", "auto")],
                )?;
                self.out.end("w:pBdr")?;
                self.out.end("w:pPr")?;
                self.out.end("w:p")
            }
            NodeKind::Container { .. } => {
                let (body, caption, legend) = container_parts(node);
                self.pending.bookmark = node.html_id.clone();
                for child in body {
                    if child.kind.is_inline() {
                        self.paragraph(|w| w.inline(child))?;
                    } else {
                        self.block(child)?;
                    }
                }
                if let Some(label) = caption_label(node) {
                    self.pending.marker = Some(match caption {
                        Some(_) => format!("{label}: "),
                        None => label,
                    });
                }
                if caption.is_some() || self.pending.marker.is_some() {
                    self.with_paragraph_style("Caption", |w| match caption {
                        Some(caption) => w.inlines(&caption.children),
                        None => Ok(()),
                    })?;
                }
                if let Some(legend) = legend {
                    self.blocks(&legend.children)?;
                }
                Ok(())
            }
            NodeKind::Table => self.table(node),
            NodeKind::FootnoteDefinition => Ok(()),
            NodeKind::Raw { format, value } => {
                if format == "openxml" || format == "docx" {
                    self.out.raw(value)?;
                }
                Ok(())
            }
            NodeKind::Output { jupyter_data } => match output_text(jupyter_data) {
                Some(text) => self.code_paragraph(text.trim_end()),
                None => Ok(()),
            },
            _ => self.blocks(&node.children),
        }
    }

    fn code_paragraph(&mut self, value: &str) -> Result<(), BackendError> {
        self.with_paragraph_style("SourceCode", |w| {
            let saved = w.style;
            w.style.code = true;
            for (i, line) in value.lines().enumerate() {
                if i > 0 {
                    w.out.start("w:r", &[])?;
                    w.out.empty("w:br", &[])?;
                    w.out.end("w:r")?;
                }
                w.run(line)?;
            }
            w.style = saved;
            Ok(())
        })
    }

    fn table(&mut self, node: &Node) -> Result<(), BackendError> {
        let columns = node.children.first().map_or(1, |row| row.children.len().max(1));
        self.out.start("w:tbl", &[])?;
        self.out.start("w:tblPr", &[])?;
        self.out.empty("w:tblW", &[("w:w", "0"), ("w:type", "auto")])?;
        self.out.end("w:tblPr")?;
        self.out.start("w:tblGrid", &[])?;
        for _ in 0..columns {
            self.out.empty("w:gridCol", &[])?;
        }
        self.out.end("w:tblGrid")?;
        for row in &node.children {
            let header = row
                .children
                .iter()
                .any(|c| matches!(c.kind, NodeKind::TableCell { header: true, .. }));
            self.out.start("w:tr", &[])?;
            if header {
                self.out.start("w:trPr", &[])?;
                self.out.empty("w:tblHeader", &[])?;
                self.out.end("w:trPr")?;
            }
            for cell in &row.children {
                self.out.start("w:tc", &[])?;
                let saved = self.style;
                self.style.bold |= header;
                let before = self.paragraphs;
                let result = self.blocks(&cell.children);
                self.style = saved;
                result?;
                // every cell needs at least one paragraph
                if self.paragraphs == before {
                    self.paragraph(|_| Ok(()))?;
                }
                self.out.end("w:tc")?;
            }
            self.out.end("w:tr")?;
        }
        self.out.end("w:tbl")
    }

    fn inlines(&mut self, children: &[Node]) -> Result<(), BackendError> {
        for child in children {
            self.inline(child)?;
        }
        Ok(())
    }

    fn inline(&mut self, node: &Node) -> Result<(), BackendError> {
        if is_hidden(node) {
            return Ok(());
        }
        match &node.kind {
            NodeKind::Text { value } => self.run(value),
            NodeKind::Emphasis => self.with_style(|s| s.italic = true, node),
            NodeKind::Strong => self.with_style(|s| s.bold = true, node),
            NodeKind::Underline => self.with_style(|s| s.underline = true, node),
            NodeKind::Delete => self.with_style(|s| s.strike = true, node),
            NodeKind::Subscript => self.with_style(|s| s.vertical = Some("subscript"), node),
            NodeKind::Superscript => self.with_style(|s| s.vertical = Some("superscript"), node),
            NodeKind::Keyboard => self.with_style(|s| s.code = true, node),
            NodeKind::InlineCode { value } => {
                let saved = self.style;
                self.style.code = true;
                let result = self.run(value);
                self.style = saved;
                result
            }
            NodeKind::InlineMath { value } => {
                let saved = self.style;
                self.style.italic = true;
                let result = self.run(value);
                self.style = saved;
                result
            }
            NodeKind::Break => {
                self.out.start("w:r", &[])?;
                self.out.empty("w:br", &[])?;
                self.out.end("w:r")
            }
            NodeKind::Link { url, .. } => self.hyperlink(url, |w| w.inlines(&node.children)),
            NodeKind::Image { url, alt, .. } => {
                let text = alt.clone().unwrap_or_else(|| url.clone());
                self.hyperlink(url, |w| w.run(&text))
            }
            NodeKind::CrossReference { url, resolved, .. } => match url.as_deref() {
                Some(url) if *resolved => self.hyperlink(url, |w| w.inlines(&node.children)),
                _ => self.inlines(&node.children),
            },
            NodeKind::FootnoteReference => {
                let id = node
                    .identifier
                    .as_ref()
                    .and_then(|id| self.footnote_ids.get(id))
                    .copied();
                match id {
                    Some(id) => {
                        let id = id.to_string();
                        self.out.start("w:r", &[])?;
                        self.out.start("w:rPr", &[])?;
                        self.out.empty("w:rStyle", &[("w:val", "FootnoteReference")])?;
                        self.out.end("w:rPr")?;
                        self.out.empty("w:footnoteReference", &[("w:id", id.as_str())])?;
                        self.out.end("w:r")
                    }
                    None => {
                        let saved = self.style;
                        self.style.vertical = Some("superscript");
                        let result = self.run(node.enumerator.as_deref().unwrap_or("?"));
                        self.style = saved;
                        result
                    }
                }
            }
            _ => self.inlines(&node.children),
        }
    }

    /// Internal anchors (`#id`, `page#id`) link to bookmarks; anything else
    /// gets an external relationship.
    fn hyperlink(
        &mut self,
        url: &str,
        content: impl FnOnce(&mut Self) -> Result<(), BackendError>,
    ) -> Result<(), BackendError> {
        let internal = url
            .split_once('#')
            .filter(|(page, _)| !page.contains(':') && !page.contains('.'))
            .map(|(_, anchor)| anchor.to_string());
        match internal {
            Some(anchor) => self.out.start("w:hyperlink", &[("w:anchor", anchor.as_str())])?,
            None => {
                let id = link_id(self.links.len());
                self.links.push(url.to_string());
                self.out.start("w:hyperlink", &[("r:id", id.as_str())])?;
            }
        }
        let saved = self.style;
        self.style.character_style = Some("Hyperlink");
        let result = content(self);
        self.style = saved;
        result?;
        self.out.end("w:hyperlink")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myst_ast::ContainerKind;

    fn render(doc: &Document, standalone: bool) -> String {
        let options = BackendOptions {
            standalone,
            bibliography: true,
        };
        String::from_utf8(DocxBackend.serialize(doc, &options).unwrap().content).unwrap()
    }

    fn doc(children: Vec<Node>) -> Document {
        let mut doc = Document::new(0, "a.md", "");
        doc.root = Node::root(children);
        doc
    }

    #[test]
    fn test_runs_carry_formatting() {
        let doc = doc(vec![Node::paragraph(vec![
            Node::text("a "),
            Node::with_children(NodeKind::Strong, vec![Node::text("b")]),
        ])]);
        let xml = render(&doc, false);
        assert!(xml.contains(
            "<w:p><w:r><w:t xml:space=\"preserve\">a </w:t></w:r>\
             <w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">b</w:t></w:r></w:p>"
        ));
    }

    #[test]
    fn test_numbered_heading_gets_style_and_bookmark() {
        let mut heading = Node::with_children(NodeKind::Heading { depth: 2 }, vec![Node::text("Intro")]);
        heading.html_id = Some("intro".into());
        heading.enumerator = Some("1.1".into());
        let xml = render(&doc(vec![heading]), false);
        assert!(xml.contains("<w:pStyle w:val=\"Heading2\"/>"));
        assert!(xml.contains("<w:t xml:space=\"preserve\">1.1 </w:t>"));
        assert!(xml.contains("<w:bookmarkStart w:id=\"0\" w:name=\"intro\"/>"));
        assert!(xml.contains("<w:bookmarkEnd w:id=\"0\"/>"));
    }

    #[test]
    fn test_cross_reference_links_to_bookmark() {
        let reference = Node::with_children(
            NodeKind::CrossReference {
                style: myst_ast::ReferenceStyle::Numref,
                template: None,
                target_kind: None,
                url: Some("#fig-a".into()),
                resolved: true,
            },
            vec![Node::text("Figure 1")],
        );
        let xml = render(&doc(vec![Node::paragraph(vec![reference])]), false);
        assert!(xml.contains("<w:hyperlink w:anchor=\"fig-a\">"));
    }

    #[test]
    fn test_figure_caption_is_labelled() {
        let mut figure = Node::with_children(
            NodeKind::Container {
                kind: ContainerKind::Figure,
                class: None,
            },
            vec![
                Node::new(NodeKind::Image {
                    url: "a.png".into(),
                    alt: None,
                    title: None,
                    width: None,
                    align: None,
                }),
                Node::with_children(NodeKind::Caption, vec![Node::paragraph(vec![Node::text("A cat")])]),
            ],
        );
        figure.enumerator = Some("2".into());
        let xml = render(&doc(vec![figure]), false);
        assert!(xml.contains("<w:pStyle w:val=\"Caption\"/>"));
        assert!(xml.contains("Figure 2: "));
        assert!(xml.contains("A cat"));
    }

    #[test]
    fn test_package_has_parts() {
        let mut reference = Node::new(NodeKind::FootnoteReference).labelled("n");
        reference.enumerator = Some("1".into());
        let definition = Node::with_children(
            NodeKind::FootnoteDefinition,
            vec![Node::paragraph(vec![Node::text("Note")])],
        )
        .labelled("n");
        let link = Node::with_children(
            NodeKind::Link {
                url: "https://example.org".into(),
                title: None,
            },
            vec![Node::text("site")],
        );
        let mut doc = doc(vec![Node::paragraph(vec![reference, link]), definition]);
        doc.frontmatter.title = Some("Report".into());

        let xml = render(&doc, true);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("pkg:name=\"/word/document.xml\""));
        assert!(xml.contains("pkg:name=\"/word/footnotes.xml\""));
        assert!(xml.contains("<w:footnoteReference w:id=\"1\"/>"));
        assert!(xml.contains("<w:footnote w:id=\"1\">"));
        assert!(xml.contains("Target=\"https://example.org\" TargetMode=\"External\""));
        assert!(xml.contains("<w:hyperlink r:id=\"rIdLink1\">"));
        assert!(xml.contains("<w:pStyle w:val=\"Title\"/>"));
        assert!(xml.trim_end().ends_with("</pkg:package>"));
    }
}
