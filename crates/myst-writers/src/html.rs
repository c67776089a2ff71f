/*
 * html.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * HTML backend.
 */

use std::io::Write;

use myst_ast::{ContainerKind, Node, NodeKind};
use myst_core::Document;

use crate::{
    Artifact, Backend, BackendError, BackendOptions, caption_label, container_parts, is_hidden,
    output_text,
};

pub struct HtmlBackend;

impl Backend for HtmlBackend {
    fn name(&self) -> &str {
        "html"
    }

    fn serialize(&self, doc: &Document, options: &BackendOptions) -> Result<Artifact, BackendError> {
        let mut ctx = HtmlWriterContext::new(Vec::new());
        if options.standalone {
            write_page_start(doc, &mut ctx)?;
        }
        write_node(&doc.root, &mut ctx)?;
        write_footnotes(&mut ctx)?;
        if options.bibliography && !doc.references.bibliography.is_empty() {
            writeln!(ctx, "<section class=\"references\">")?;
            writeln!(ctx, "<h2>References</h2>")?;
            writeln!(ctx, "<ol>")?;
            for item in &doc.references.bibliography {
                writeln!(
                    ctx,
                    "<li id=\"cite-{}\">{}</li>",
                    escape_html(&item.id),
                    escape_html(&item.reference())
                )?;
            }
            writeln!(ctx, "</ol>")?;
            writeln!(ctx, "</section>")?;
        }
        if options.standalone {
            writeln!(ctx, "</main>\n</body>\n</html>")?;
        }
        Ok(Artifact {
            content: ctx.into_inner(),
            media_type: "text/html",
            extension: "html",
        })
    }
}

// =============================================================================
// Context
// =============================================================================

/// Context threaded through the writer functions.
///
/// Implements `Write`, so `write!` can target the context directly.
/// Footnote definitions are collected while walking and written at the end.
pub struct HtmlWriterContext<'ast, W: Write> {
    writer: W,
    footnotes: Vec<&'ast Node>,
}

impl<W: Write> Write for HtmlWriterContext<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl<'ast, W: Write> HtmlWriterContext<'ast, W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            footnotes: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Escape HTML special characters
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn id_attr(node: &Node) -> String {
    match &node.html_id {
        Some(id) => format!(" id=\"{}\"", escape_html(id)),
        None => String::new(),
    }
}

fn write_page_start<W: Write>(doc: &Document, ctx: &mut HtmlWriterContext<'_, W>) -> std::io::Result<()> {
    let title = doc.title().unwrap_or(doc.slug());
    writeln!(ctx, "<!DOCTYPE html>")?;
    writeln!(ctx, "<html>\n<head>")?;
    writeln!(ctx, "<meta charset=\"utf-8\" />")?;
    writeln!(ctx, "<title>{}</title>", escape_html(title))?;
    writeln!(ctx, "</head>\n<body>\n<main>")?;
    if let Some(title) = doc.title() {
        writeln!(ctx, "<header>\n<h1 class=\"title\">{}</h1>", escape_html(title))?;
        let authors: Vec<&str> = doc.frontmatter.authors.iter().map(|a| a.name.as_str()).collect();
        if !authors.is_empty() {
            writeln!(ctx, "<p class=\"authors\">{}</p>", escape_html(&authors.join(", ")))?;
        }
        writeln!(ctx, "</header>")?;
    }
    Ok(())
}

fn write_children<'ast, W: Write>(
    node: &'ast Node,
    ctx: &mut HtmlWriterContext<'ast, W>,
) -> std::io::Result<()> {
    for child in &node.children {
        write_node(child, ctx)?;
    }
    Ok(())
}

fn wrap<'ast, W: Write>(
    tag: &str,
    node: &'ast Node,
    ctx: &mut HtmlWriterContext<'ast, W>,
) -> std::io::Result<()> {
    write!(ctx, "<{tag}{}>", id_attr(node))?;
    write_children(node, ctx)?;
    write!(ctx, "</{tag}>")
}

// =============================================================================
// Nodes
// =============================================================================

fn write_node<'ast, W: Write>(
    node: &'ast Node,
    ctx: &mut HtmlWriterContext<'ast, W>,
) -> std::io::Result<()> {
    if is_hidden(node) {
        return Ok(());
    }
    match &node.kind {
        NodeKind::Text { value } => write!(ctx, "{}", escape_html(value)),
        NodeKind::Paragraph => {
            wrap("p", node, ctx)?;
            writeln!(ctx)
        }
        NodeKind::Heading { depth } => {
            let tag = format!("h{}", (*depth).clamp(1, 6));
            write!(ctx, "<{tag}{}>", id_attr(node))?;
            if let Some(number) = &node.enumerator {
                write!(ctx, "<span class=\"heading-number\">{}</span> ", escape_html(number))?;
            }
            write_children(node, ctx)?;
            writeln!(ctx, "</{tag}>")
        }
        NodeKind::Emphasis => wrap("em", node, ctx),
        NodeKind::Strong => wrap("strong", node, ctx),
        NodeKind::Underline => wrap("u", node, ctx),
        NodeKind::Delete => wrap("del", node, ctx),
        NodeKind::Subscript => wrap("sub", node, ctx),
        NodeKind::Superscript => wrap("sup", node, ctx),
        NodeKind::Keyboard => wrap("kbd", node, ctx),
        NodeKind::Abbreviation { title } => {
            match title {
                Some(title) => write!(ctx, "<abbr title=\"{}\">", escape_html(title))?,
                None => write!(ctx, "<abbr>")?,
            }
            write_children(node, ctx)?;
            write!(ctx, "</abbr>")
        }
        NodeKind::InlineCode { value } => write!(ctx, "<code>{}</code>", escape_html(value)),
        NodeKind::Code { lang, value, .. } => {
            write!(ctx, "<pre{}><code", id_attr(node))?;
            if let Some(lang) = lang {
                write!(ctx, " class=\"language-{}\"", escape_html(lang))?;
            }
            writeln!(ctx, ">{}</code></pre>", escape_html(value))
        }
        NodeKind::Link { url, title } => {
            write!(ctx, "<a href=\"{}\"", escape_html(url))?;
            if let Some(title) = title {
                write!(ctx, " title=\"{}\"", escape_html(title))?;
            }
            write!(ctx, ">")?;
            write_children(node, ctx)?;
            write!(ctx, "</a>")
        }
        NodeKind::Image {
            url, alt, title, width, ..
        } => {
            write!(
                ctx,
                "<img src=\"{}\" alt=\"{}\"",
                escape_html(url),
                escape_html(alt.as_deref().unwrap_or_default())
            )?;
            if let Some(title) = title {
                write!(ctx, " title=\"{}\"", escape_html(title))?;
            }
            if let Some(width) = width {
                write!(ctx, " width=\"{}\"", escape_html(width))?;
            }
            write!(ctx, " />")
        }
        NodeKind::List { ordered, start } => {
            let tag = if *ordered { "ol" } else { "ul" };
            write!(ctx, "<{tag}")?;
            if let Some(start) = start.filter(|s| *ordered && *s != 1) {
                write!(ctx, " start=\"{start}\"")?;
            }
            writeln!(ctx, ">")?;
            write_children(node, ctx)?;
            writeln!(ctx, "</{tag}>")
        }
        NodeKind::ListItem => {
            wrap("li", node, ctx)?;
            writeln!(ctx)
        }
        NodeKind::Blockquote => {
            wrap("blockquote", node, ctx)?;
            writeln!(ctx)
        }
        NodeKind::ThematicBreak => writeln!(ctx, "<hr />"),
        NodeKind::Break => writeln!(ctx, "<br />"),
        NodeKind::Math { value } => {
            write!(ctx, "<div class=\"math display\"{}>\\[{}\\]", id_attr(node), escape_html(value))?;
            if let Some(number) = &node.enumerator {
                write!(ctx, "<span class=\"equation-number\">({})</span>", escape_html(number))?;
            }
            writeln!(ctx, "</div>")
        }
        NodeKind::InlineMath { value } => {
            write!(ctx, "<span class=\"math inline\">\\({}\\)</span>", escape_html(value))
        }
        NodeKind::Admonition { kind, class } => {
            let class = match class {
                Some(extra) => format!("admonition {kind} {extra}"),
                None => format!("admonition {kind}"),
            };
            write!(ctx, "<aside class=\"{}\"{}>", escape_html(&class), id_attr(node))?;
            write_children(node, ctx)?;
            writeln!(ctx, "</aside>")
        }
        NodeKind::AdmonitionTitle => {
            write!(ctx, "<p class=\"admonition-title\">")?;
            write_children(node, ctx)?;
            writeln!(ctx, "</p>")
        }
        NodeKind::Container { kind, .. } => write_container(node, *kind, ctx),
        NodeKind::Caption | NodeKind::Legend => {
            write!(ctx, "<div class=\"{}\">", node.type_name())?;
            write_children(node, ctx)?;
            write!(ctx, "</div>")
        }
        NodeKind::Table => {
            writeln!(ctx, "<table{}>", id_attr(node))?;
            write_children(node, ctx)?;
            writeln!(ctx, "</table>")
        }
        NodeKind::TableRow => {
            write!(ctx, "<tr>")?;
            write_children(node, ctx)?;
            writeln!(ctx, "</tr>")
        }
        NodeKind::TableCell { header, align } => {
            let tag = if *header { "th" } else { "td" };
            write!(ctx, "<{tag}")?;
            if let Some(align) = align {
                write!(ctx, " style=\"text-align: {}\"", escape_html(align))?;
            }
            write!(ctx, ">")?;
            write_children(node, ctx)?;
            write!(ctx, "</{tag}>")
        }
        NodeKind::Aside { kind } => {
            let class = kind.as_deref().unwrap_or("margin");
            write!(ctx, "<aside class=\"{}\"{}>", escape_html(class), id_attr(node))?;
            write_children(node, ctx)?;
            writeln!(ctx, "</aside>")
        }
        NodeKind::Div { class } | NodeKind::Span { class } => {
            let tag = if node.kind.is_inline() { "span" } else { "div" };
            write!(ctx, "<{tag}{}", id_attr(node))?;
            if let Some(class) = class {
                write!(ctx, " class=\"{}\"", escape_html(class))?;
            }
            write!(ctx, ">")?;
            write_children(node, ctx)?;
            write!(ctx, "</{tag}>")
        }
        NodeKind::CrossReference { url, resolved, .. } => match url.as_deref().filter(|_| *resolved) {
            Some(url) => {
                write!(ctx, "<a class=\"xref\" href=\"{}\">", escape_html(url))?;
                write_children(node, ctx)?;
                write!(ctx, "</a>")
            }
            None => {
                write!(ctx, "<span class=\"xref unresolved\">")?;
                write_children(node, ctx)?;
                write!(ctx, "</span>")
            }
        },
        NodeKind::CiteGroup { .. } => {
            write!(ctx, "<span class=\"cite-group\">")?;
            write_children(node, ctx)?;
            write!(ctx, "</span>")
        }
        NodeKind::Cite { key, error, .. } => {
            if *error {
                write!(ctx, "<span class=\"cite error\">")?;
            } else {
                write!(ctx, "<a class=\"cite\" href=\"#cite-{}\">", escape_html(key))?;
            }
            write_children(node, ctx)?;
            write!(ctx, "{}", if *error { "</span>" } else { "</a>" })
        }
        NodeKind::FootnoteReference => {
            let id = node.identifier.as_deref().unwrap_or_default();
            let number = node.enumerator.as_deref().unwrap_or(id);
            write!(
                ctx,
                "<sup class=\"footnote-ref\"><a href=\"#fn-{}\">{}</a></sup>",
                escape_html(id),
                escape_html(number)
            )
        }
        NodeKind::FootnoteDefinition => {
            ctx.footnotes.push(node);
            Ok(())
        }
        NodeKind::Raw { format, value } => {
            if format == "html" {
                write!(ctx, "{value}")?;
            }
            Ok(())
        }
        NodeKind::Outputs => {
            write!(ctx, "<div class=\"outputs\">")?;
            write_children(node, ctx)?;
            writeln!(ctx, "</div>")
        }
        NodeKind::Output { jupyter_data } => match output_text(jupyter_data) {
            Some(text) => write!(ctx, "<pre class=\"output\">{}</pre>", escape_html(&text)),
            None => Ok(()),
        },
        // root, blocks and anything this writer does not know: children only
        _ => write_children(node, ctx),
    }
}

fn write_container<'ast, W: Write>(
    node: &'ast Node,
    kind: ContainerKind,
    ctx: &mut HtmlWriterContext<'ast, W>,
) -> std::io::Result<()> {
    let (body, caption, legend) = container_parts(node);
    write!(ctx, "<figure class=\"{}\"{}>", container_class(kind), id_attr(node))?;
    for child in body {
        write_node(child, ctx)?;
    }
    if caption.is_some() || node.enumerator.is_some() {
        write!(ctx, "<figcaption>")?;
        if let Some(label) = caption_label(node) {
            write!(ctx, "<span class=\"caption-number\">{}</span> ", escape_html(&label))?;
        }
        if let Some(caption) = caption {
            write_children(caption, ctx)?;
        }
        if let Some(legend) = legend {
            write_node(legend, ctx)?;
        }
        write!(ctx, "</figcaption>")?;
    }
    writeln!(ctx, "</figure>")
}

fn container_class(kind: ContainerKind) -> &'static str {
    match kind {
        ContainerKind::Figure => "figure",
        ContainerKind::Table => "table",
        ContainerKind::Code => "code",
        ContainerKind::Quote => "quote",
    }
}

fn write_footnotes<W: Write>(ctx: &mut HtmlWriterContext<'_, W>) -> std::io::Result<()> {
    if ctx.footnotes.is_empty() {
        return Ok(());
    }
    let mut notes = std::mem::take(&mut ctx.footnotes);
    notes.sort_by_key(|n| {
        n.enumerator
            .as_deref()
            .and_then(|e| e.parse::<u32>().ok())
            .unwrap_or(u32::MAX)
    });
    writeln!(ctx, "<section class=\"footnotes\">\n<ol>")?;
    for note in notes {
        write!(ctx, "<li{}>", id_attr(note))?;
        write_children(note, ctx)?;
        writeln!(ctx, "</li>")?;
    }
    writeln!(ctx, "</ol>\n</section>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use myst_ast::ReferenceStyle;
    use pretty_assertions::assert_eq;

    fn render(children: Vec<Node>) -> String {
        let mut doc = Document::new(0, "a.md", "");
        doc.root = Node::root(children);
        let options = BackendOptions {
            standalone: false,
            bibliography: false,
        };
        let artifact = HtmlBackend.serialize(&doc, &options).unwrap();
        artifact.as_str().unwrap().to_string()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_paragraph_and_inlines() {
        let html = render(vec![Node::paragraph(vec![
            Node::text("a < b "),
            Node::with_children(NodeKind::Strong, vec![Node::text("bold")]),
        ])]);
        assert_eq!(html, "<p>a &lt; b <strong>bold</strong></p>\n");
    }

    #[test]
    fn test_numbered_figure() {
        let mut figure = Node::with_children(
            NodeKind::Container {
                kind: ContainerKind::Figure,
                class: None,
            },
            vec![Node::with_children(NodeKind::Caption, vec![Node::paragraph(vec![Node::text("Cap")])])],
        );
        figure.enumerator = Some("2".into());
        figure.html_id = Some("fig-a".into());
        let html = render(vec![figure]);
        assert!(html.starts_with("<figure class=\"figure\" id=\"fig-a\">"));
        assert!(html.contains("<span class=\"caption-number\">Figure 2</span> <p>Cap</p>"));
    }

    #[test]
    fn test_reference_link() {
        let reference = Node::with_children(
            NodeKind::CrossReference {
                style: ReferenceStyle::Ref,
                template: None,
                target_kind: None,
                url: Some("b#x".into()),
                resolved: true,
            },
            vec![Node::text("Figure 1")],
        );
        assert_eq!(
            render(vec![reference]),
            "<a class=\"xref\" href=\"b#x\">Figure 1</a>"
        );
    }

    #[test]
    fn test_footnotes_written_at_end() {
        let mut reference = Node::new(NodeKind::FootnoteReference).labelled("n");
        reference.enumerator = Some("1".into());
        let mut definition = Node::with_children(
            NodeKind::FootnoteDefinition,
            vec![Node::paragraph(vec![Node::text("Note.")])],
        )
        .labelled("n");
        definition.html_id = Some("fn-n".into());
        let html = render(vec![definition, Node::paragraph(vec![reference])]);
        let body = html.find("footnote-ref").unwrap();
        let notes = html.find("<section class=\"footnotes\">").unwrap();
        assert!(body < notes);
        assert!(html.contains("<li id=\"fn-n\"><p>Note.</p>\n</li>"));
    }
}
