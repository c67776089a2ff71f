/*
 * typst.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Typst backend.
 */

use myst_ast::{ContainerKind, Node, NodeKind};
use myst_core::Document;

use crate::{Artifact, Backend, BackendError, BackendOptions, container_parts, is_hidden, output_text};

pub struct TypstBackend;

impl Backend for TypstBackend {
    fn name(&self) -> &str {
        "typst"
    }

    fn serialize(&self, doc: &Document, options: &BackendOptions) -> Result<Artifact, BackendError> {
        let mut out = String::new();
        if options.standalone {
            if let Some(title) = doc.title() {
                let authors: Vec<String> = doc
                    .frontmatter
                    .authors
                    .iter()
                    .map(|a| format!("\"{}\"", string_literal(&a.name)))
                    .collect();
                out.push_str(&format!(
                    "#set document(title: \"{}\", author: ({}))\n",
                    string_literal(title),
                    authors.iter().map(|a| format!("{a},")).collect::<String>()
                ));
                out.push_str(&format!(
                    "#align(center, text(17pt)[*{}*])\n\n",
                    escape_typst(title)
                ));
            }
            if doc.frontmatter.numbering.heading.enabled {
                out.push_str("#set heading(numbering: \"1.1\")\n\n");
            }
        }
        write_children(&doc.root, &mut out);
        if options.bibliography && !doc.references.bibliography.is_empty() {
            out.push_str("\n= References\n\n");
            for item in &doc.references.bibliography {
                out.push_str(&format!("- {}\n", escape_typst(&item.reference())));
            }
        }
        Ok(Artifact::text(out, "text/x-typst", "typ"))
    }
}

/// Escape characters with markup meaning in Typst content.
pub fn escape_typst(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '\\' | '#' | '*' | '_' | '`' | '$' | '<' | '>' | '@' | '[' | ']' | '=' | '-' | '+' | '/' | '~'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn string_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn label(node: &Node, out: &mut String) {
    if let Some(id) = &node.identifier {
        // typst labels cannot contain spaces; identifiers never do
        out.push_str(&format!(" <{id}>"));
    }
}

fn write_children(node: &Node, out: &mut String) {
    for child in &node.children {
        write_node(child, out);
    }
}

fn wrapped(open: &str, close: &str, node: &Node, out: &mut String) {
    out.push_str(open);
    write_children(node, out);
    out.push_str(close);
}

fn write_node(node: &Node, out: &mut String) {
    if is_hidden(node) {
        return;
    }
    match &node.kind {
        NodeKind::Text { value } => out.push_str(&escape_typst(value)),
        NodeKind::Paragraph => {
            write_children(node, out);
            out.push_str("\n\n");
        }
        NodeKind::Heading { depth } => {
            out.push_str(&"=".repeat((*depth).clamp(1, 6) as usize));
            out.push(' ');
            write_children(node, out);
            label(node, out);
            out.push_str("\n\n");
        }
        NodeKind::Emphasis => wrapped("#emph[", "]", node, out),
        NodeKind::Strong => wrapped("#strong[", "]", node, out),
        NodeKind::Underline => wrapped("#underline[", "]", node, out),
        NodeKind::Delete => wrapped("#strike[", "]", node, out),
        NodeKind::Subscript => wrapped("#sub[", "]", node, out),
        NodeKind::Superscript => wrapped("#super[", "]", node, out),
        NodeKind::InlineCode { value } => {
            out.push_str(&format!("#raw(\"{}\")", string_literal(value)));
        }
        NodeKind::Code { lang, value, .. } => {
            out.push_str("```");
            out.push_str(lang.as_deref().unwrap_or_default());
            out.push('\n');
            out.push_str(value);
            out.push_str("\n```\n\n");
        }
        NodeKind::Link { url, .. } => {
            out.push_str(&format!("#link(\"{}\")[", string_literal(url)));
            write_children(node, out);
            out.push(']');
        }
        NodeKind::Image { url, .. } => {
            out.push_str(&format!("#image(\"{}\")\n", string_literal(url)));
        }
        NodeKind::List { ordered, .. } => {
            let marker = if *ordered { "+ " } else { "- " };
            for item in &node.children {
                out.push_str(marker);
                let mut inner = String::new();
                write_children(item, &mut inner);
                out.push_str(inner.trim_end());
                out.push('\n');
            }
            out.push('\n');
        }
        NodeKind::Blockquote => {
            wrapped("#quote(block: true)[\n", "]\n\n", node, out);
        }
        NodeKind::ThematicBreak => out.push_str("#line(length: 100%)\n\n"),
        NodeKind::Break => out.push_str("\\\n"),
        NodeKind::Math { value } => {
            out.push_str(&format!("$ {value} $"));
            label(node, out);
            out.push_str("\n\n");
        }
        NodeKind::InlineMath { value } => out.push_str(&format!("${value}$")),
        NodeKind::Admonition { .. } => {
            wrapped("#block(inset: 8pt, stroke: 0.5pt)[\n", "]\n\n", node, out);
        }
        NodeKind::AdmonitionTitle => wrapped("*", "*\n\n", node, out),
        NodeKind::Container { kind, .. } => write_container(node, *kind, out),
        NodeKind::Table => {
            let columns = node.children.first().map_or(1, |row| row.children.len().max(1));
            out.push_str(&format!("#table(columns: {columns},\n"));
            for row in &node.children {
                for cell in &row.children {
                    out.push_str("  [");
                    write_children(cell, out);
                    out.push_str("],\n");
                }
            }
            out.push_str(")\n\n");
        }
        NodeKind::CrossReference { .. } => write_children(node, out),
        NodeKind::FootnoteReference => {
            let number = node.enumerator.as_deref().unwrap_or("?");
            out.push_str(&format!("#super[{}]", escape_typst(number)));
        }
        NodeKind::FootnoteDefinition => {
            let number = node.enumerator.as_deref().unwrap_or("?");
            out.push_str(&format!("#super[{}] ", escape_typst(number)));
            write_children(node, out);
        }
        NodeKind::Raw { format, value } => {
            if format == "typst" {
                out.push_str(value);
            }
        }
        NodeKind::Output { jupyter_data } => {
            if let Some(text) = output_text(jupyter_data) {
                out.push_str("```\n");
                out.push_str(text.trim_end());
                out.push_str("\n```\n\n");
            }
        }
        _ => write_children(node, out),
    }
}

fn write_container(node: &Node, kind: ContainerKind, out: &mut String) {
    let (body, caption, _) = container_parts(node);
    if kind == ContainerKind::Quote {
        out.push_str("#quote(block: true)[\n");
        for child in body {
            write_node(child, out);
        }
        out.push_str("]\n\n");
        return;
    }
    out.push_str("#figure(\n  [\n");
    for child in body {
        write_node(child, out);
    }
    out.push_str("  ],\n");
    if let Some(caption) = caption {
        let mut text = String::new();
        write_children(caption, &mut text);
        out.push_str(&format!("  caption: [{}],\n", text.trim()));
    }
    if node.enumerator.is_none() {
        out.push_str("  numbering: none,\n");
    }
    out.push(')');
    label(node, out);
    out.push_str("\n\n");
}
