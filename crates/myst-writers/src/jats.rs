/*
 * jats.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * JATS journal XML backend.
 */

//! JATS (Journal Article Tag Suite) output.
//!
//! Headings open nested `<sec>` elements, closed when a heading of the same
//! or a higher level starts. Footnotes go to `<back><fn-group>`, cited
//! entries to `<back><ref-list>`.

use myst_ast::{ContainerKind, Node, NodeKind};
use myst_core::Document;

use crate::xml::XmlOut;
use crate::{Artifact, Backend, BackendError, BackendOptions, caption_label, container_parts, is_hidden};

const DOCTYPE: &str = "<!DOCTYPE article PUBLIC \"-//NLM//DTD JATS (Z39.96) Journal Archiving and Interchange DTD v1.3 20210610//EN\" \"JATS-archivearticle1-3.dtd\">\n";

pub struct JatsBackend;

impl Backend for JatsBackend {
    fn name(&self) -> &str {
        "jats"
    }

    fn serialize(&self, doc: &Document, options: &BackendOptions) -> Result<Artifact, BackendError> {
        let mut w = JatsWriter {
            out: XmlOut::new(),
            sections: Vec::new(),
            footnotes: Vec::new(),
        };
        if options.standalone {
            w.out.declaration()?;
            w.out.raw("\n")?;
            w.out.raw(DOCTYPE)?;
            w.out.start(
                "article",
                &[
                    ("xmlns:xlink", "http://www.w3.org/1999/xlink"),
                    ("xmlns:mml", "http://www.w3.org/1998/Math/MathML"),
                    ("article-type", "research-article"),
                ],
            )?;
            w.front(doc)?;
        }
        w.out.start("body", &[])?;
        w.children(&doc.root)?;
        w.close_sections(0)?;
        w.out.end("body")?;
        let footnotes = std::mem::take(&mut w.footnotes);
        let bibliography = options.bibliography && !doc.references.bibliography.is_empty();
        if options.standalone && (bibliography || !footnotes.is_empty()) {
            w.out.start("back", &[])?;
            if !footnotes.is_empty() {
                w.out.start("fn-group", &[])?;
                for note in footnotes {
                    w.footnote(note)?;
                }
                w.out.end("fn-group")?;
            }
            if bibliography {
                w.out.start("ref-list", &[])?;
                w.out.element("title", &[], "References")?;
                for item in &doc.references.bibliography {
                    let id = format!("ref-{}", item.id);
                    w.out.start("ref", &[("id", id.as_str())])?;
                    w.out.element("mixed-citation", &[], &item.reference())?;
                    w.out.end("ref")?;
                }
                w.out.end("ref-list")?;
            }
            w.out.end("back")?;
        }
        if options.standalone {
            w.out.end("article")?;
        }
        Ok(Artifact {
            content: w.out.finish()?,
            media_type: "application/jats+xml",
            extension: "xml",
        })
    }
}

struct JatsWriter<'a> {
    out: XmlOut,
    /// Depths of the open `<sec>` elements
    sections: Vec<u8>,
    footnotes: Vec<&'a Node>,
}

impl<'a> JatsWriter<'a> {
    fn front(&mut self, doc: &Document) -> Result<(), BackendError> {
        let fm = &doc.frontmatter;
        self.out.start("front", &[])?;
        self.out.start("article-meta", &[])?;
        if let Some(doi) = &fm.doi {
            self.out.element("article-id", &[("pub-id-type", "doi")], doi)?;
        }
        self.out.start("title-group", &[])?;
        self.out
            .element("article-title", &[], doc.title().unwrap_or_default())?;
        if let Some(subtitle) = &fm.subtitle {
            self.out.element("subtitle", &[], subtitle)?;
        }
        self.out.end("title-group")?;
        if !fm.authors.is_empty() {
            self.out.start("contrib-group", &[])?;
            for author in &fm.authors {
                let corresp = if author.corresponding { "yes" } else { "no" };
                self.out
                    .start("contrib", &[("contrib-type", "author"), ("corresp", corresp)])?;
                if let Some(orcid) = &author.orcid {
                    self.out
                        .element("contrib-id", &[("contrib-id-type", "orcid")], orcid)?;
                }
                self.out.element("string-name", &[], &author.name)?;
                if let Some(email) = &author.email {
                    self.out.element("email", &[], email)?;
                }
                for affiliation in &author.affiliations {
                    self.out
                        .empty("xref", &[("ref-type", "aff"), ("rid", affiliation.as_str())])?;
                }
                self.out.end("contrib")?;
            }
            for (i, affiliation) in fm.affiliations.iter().enumerate() {
                let id = affiliation.id.clone().unwrap_or_else(|| format!("aff-{}", i + 1));
                self.out.element("aff", &[("id", id.as_str())], &affiliation.name)?;
            }
            self.out.end("contrib-group")?;
        }
        if !fm.keywords.is_empty() {
            self.out.start("kwd-group", &[])?;
            for keyword in &fm.keywords {
                self.out.element("kwd", &[], keyword)?;
            }
            self.out.end("kwd-group")?;
        }
        self.out.end("article-meta")?;
        self.out.end("front")
    }

    fn close_sections(&mut self, depth: u8) -> Result<(), BackendError> {
        while self.sections.last().is_some_and(|open| *open >= depth) {
            self.sections.pop();
            self.out.end("sec")?;
        }
        Ok(())
    }

    fn children(&mut self, node: &'a Node) -> Result<(), BackendError> {
        for child in &node.children {
            self.node(child)?;
        }
        Ok(())
    }

    fn wrap(&mut self, tag: &str, node: &'a Node) -> Result<(), BackendError> {
        self.out.start(tag, &[])?;
        self.children(node)?;
        self.out.end(tag)
    }

    fn node(&mut self, node: &'a Node) -> Result<(), BackendError> {
        if is_hidden(node) {
            return Ok(());
        }
        let id = node.html_id.as_deref();
        match &node.kind {
            NodeKind::Text { value } => self.out.text(value),
            NodeKind::Paragraph => self.wrap("p", node),
            NodeKind::Heading { depth } => {
                self.close_sections(*depth)?;
                match id {
                    Some(id) => self.out.start("sec", &[("id", id)])?,
                    None => self.out.start("sec", &[])?,
                }
                self.sections.push(*depth);
                if let Some(number) = &node.enumerator {
                    self.out.element("label", &[], number)?;
                }
                self.wrap("title", node)
            }
            NodeKind::Emphasis => self.wrap("italic", node),
            NodeKind::Strong => self.wrap("bold", node),
            NodeKind::Underline => self.wrap("underline", node),
            NodeKind::Delete => self.wrap("strike", node),
            NodeKind::Subscript => self.wrap("sub", node),
            NodeKind::Superscript => self.wrap("sup", node),
            NodeKind::Keyboard => self.wrap("monospace", node),
            NodeKind::InlineCode { value } => self.out.element("monospace", &[], value),
            NodeKind::Code { lang, value, .. } => {
                let mut attributes = Vec::new();
                if let Some(lang) = lang {
                    attributes.push(("language", lang.as_str()));
                }
                if let Some(id) = id {
                    attributes.push(("id", id));
                }
                self.out.element("code", &attributes, value)
            }
            NodeKind::Link { url, .. } => {
                self.out.start(
                    "ext-link",
                    &[("ext-link-type", "uri"), ("xlink:href", url.as_str())],
                )?;
                self.children(node)?;
                self.out.end("ext-link")
            }
            NodeKind::Image { url, .. } => self.out.empty("graphic", &[("xlink:href", url.as_str())]),
            NodeKind::List { ordered, .. } => {
                let kind = if *ordered { "order" } else { "bullet" };
                self.out.start("list", &[("list-type", kind)])?;
                self.children(node)?;
                self.out.end("list")
            }
            NodeKind::ListItem => self.wrap("list-item", node),
            NodeKind::Blockquote => self.wrap("disp-quote", node),
            NodeKind::ThematicBreak => Ok(()),
            NodeKind::Break => self.out.empty("break", &[]),
            NodeKind::Math { value } => {
                match id {
                    Some(id) => self.out.start("disp-formula", &[("id", id)])?,
                    None => self.out.start("disp-formula", &[])?,
                }
                if let Some(number) = &node.enumerator {
                    self.out.element("label", &[], &format!("({number})"))?;
                }
                self.out.element("tex-math", &[], value)?;
                self.out.end("disp-formula")
            }
            NodeKind::InlineMath { value } => {
                self.out.start("inline-formula", &[])?;
                self.out.element("tex-math", &[], value)?;
                self.out.end("inline-formula")
            }
            NodeKind::Admonition { kind, .. } => {
                self.out.start("boxed-text", &[("content-type", kind.as_str())])?;
                self.children(node)?;
                self.out.end("boxed-text")
            }
            NodeKind::AdmonitionTitle => self.wrap("caption", node),
            NodeKind::Container { kind, .. } => self.container(node, *kind),
            NodeKind::Table => self.wrap("table", node),
            NodeKind::TableRow => self.wrap("tr", node),
            NodeKind::TableCell { header, .. } => self.wrap(if *header { "th" } else { "td" }, node),
            NodeKind::CrossReference {
                target_kind,
                resolved,
                url,
                ..
            } => {
                let rid = url
                    .as_deref()
                    .filter(|_| *resolved)
                    .and_then(|u| u.rsplit_once('#'))
                    .map(|(_, anchor)| anchor);
                match rid {
                    Some(rid) => {
                        let ref_type = match target_kind {
                            Some(myst_ast::TargetKind::Figure) => "fig",
                            Some(myst_ast::TargetKind::Table) => "table",
                            Some(myst_ast::TargetKind::Equation) => "disp-formula",
                            Some(myst_ast::TargetKind::Heading) => "sec",
                            _ => "other",
                        };
                        self.out.start("xref", &[("ref-type", ref_type), ("rid", rid)])?;
                        self.children(node)?;
                        self.out.end("xref")
                    }
                    None => self.children(node),
                }
            }
            NodeKind::Cite { key, error, .. } => {
                if *error {
                    return self.children(node);
                }
                let rid = format!("ref-{key}");
                self.out.start("xref", &[("ref-type", "bibr"), ("rid", rid.as_str())])?;
                self.children(node)?;
                self.out.end("xref")
            }
            NodeKind::FootnoteReference => {
                let target = footnote_id(node);
                let number = node.enumerator.as_deref().unwrap_or("?");
                self.out.start("xref", &[("ref-type", "fn"), ("rid", target.as_str())])?;
                self.out.text(number)?;
                self.out.end("xref")
            }
            NodeKind::FootnoteDefinition => {
                self.footnotes.push(node);
                Ok(())
            }
            NodeKind::Raw { .. } | NodeKind::Output { .. } => Ok(()),
            _ => self.children(node),
        }
    }

    fn container(&mut self, node: &'a Node, kind: ContainerKind) -> Result<(), BackendError> {
        let (body, caption, legend) = container_parts(node);
        let tag = match kind {
            ContainerKind::Figure => "fig",
            ContainerKind::Table => "table-wrap",
            ContainerKind::Code => "boxed-text",
            ContainerKind::Quote => "disp-quote",
        };
        match node.html_id.as_deref() {
            Some(id) => self.out.start(tag, &[("id", id)])?,
            None => self.out.start(tag, &[])?,
        }
        if let Some(label) = caption_label(node) {
            self.out.element("label", &[], &label)?;
        }
        if caption.is_some() || legend.is_some() {
            self.out.start("caption", &[])?;
            if let Some(caption) = caption {
                self.children(caption)?;
            }
            if let Some(legend) = legend {
                self.children(legend)?;
            }
            self.out.end("caption")?;
        }
        for child in body {
            self.node(child)?;
        }
        self.out.end(tag)
    }

    fn footnote(&mut self, node: &'a Node) -> Result<(), BackendError> {
        let id = footnote_id(node);
        self.out.start("fn", &[("id", id.as_str())])?;
        if let Some(number) = &node.enumerator {
            self.out.element("label", &[], number)?;
        }
        self.children(node)?;
        self.out.end("fn")
    }
}

/// `fn-<id>`, the anchor the html-ids pass gives footnote definitions.
fn footnote_id(node: &Node) -> String {
    let id = node.identifier.as_deref().unwrap_or_default();
    myst_ast::create_html_id(id)
        .map(|id| format!("fn-{id}"))
        .unwrap_or_else(|| "fn".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(doc: &Document, standalone: bool) -> String {
        let options = BackendOptions {
            standalone,
            bibliography: true,
        };
        String::from_utf8(JatsBackend.serialize(doc, &options).unwrap().content).unwrap()
    }

    fn heading(depth: u8, text: &str) -> Node {
        Node::with_children(NodeKind::Heading { depth }, vec![Node::text(text)])
    }

    #[test]
    fn test_sections_nest_and_close() {
        let mut doc = Document::new(0, "a.md", "");
        doc.root = Node::root(vec![
            heading(1, "A"),
            heading(2, "A.1"),
            Node::paragraph(vec![Node::text("x")]),
            heading(1, "B"),
        ]);
        assert_eq!(
            render(&doc, false),
            "<body><sec><title>A</title><sec><title>A.1</title><p>x</p></sec></sec>\
             <sec><title>B</title></sec></body>"
        );
    }

    #[test]
    fn test_front_matter_and_footnotes() {
        let mut doc = Document::new(0, "a.md", "");
        doc.frontmatter.title = Some("Paper & Co".into());
        doc.frontmatter.keywords = vec!["rust".into()];
        let mut reference = Node::new(NodeKind::FootnoteReference).labelled("n");
        reference.enumerator = Some("1".into());
        let mut definition = Node::with_children(
            NodeKind::FootnoteDefinition,
            vec![Node::paragraph(vec![Node::text("Note")])],
        )
        .labelled("n");
        definition.enumerator = Some("1".into());
        doc.root = Node::root(vec![Node::paragraph(vec![reference]), definition]);

        let xml = render(&doc, true);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE article"));
        assert!(xml.contains("<article-title>Paper &amp; Co</article-title>"));
        assert!(xml.contains("<kwd>rust</kwd>"));
        assert!(xml.contains("<xref ref-type=\"fn\" rid=\"fn-n\">1</xref>"));
        assert!(xml.contains("<back><fn-group><fn id=\"fn-n\"><label>1</label><p>Note</p></fn></fn-group></back>"));
        assert!(xml.ends_with("</article>"));
    }
}
