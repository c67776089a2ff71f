/*
 * latex.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * LaTeX backend.
 */

//! LaTeX source for an external engine (`latexmk`).
//!
//! Labels become `\label{}` and resolved references keep the text the
//! resolver generated, so the output does not depend on a second LaTeX run
//! for numbering.

use myst_ast::{ContainerKind, Node, NodeKind};
use myst_core::Document;

use crate::{Artifact, Backend, BackendError, BackendOptions, container_parts, is_hidden, output_text};

pub struct LatexBackend;

impl Backend for LatexBackend {
    fn name(&self) -> &str {
        "latex"
    }

    fn serialize(&self, doc: &Document, options: &BackendOptions) -> Result<Artifact, BackendError> {
        let mut out = LatexWriter::default();
        out.node(&doc.root);
        let body = out.finish();

        let mut text = String::new();
        if options.standalone {
            text.push_str(&preamble(doc));
        }
        text.push_str(&body);
        if options.bibliography && !doc.references.bibliography.is_empty() {
            text.push_str("\n\\section*{References}\n\\begin{itemize}\n");
            for item in &doc.references.bibliography {
                text.push_str(&format!("\\item {}\n", escape_latex(&item.reference())));
            }
            text.push_str("\\end{itemize}\n");
        }
        if options.standalone {
            text.push_str("\n\\end{document}\n");
        }
        Ok(Artifact::text(text, "application/x-latex", "tex"))
    }
}

fn preamble(doc: &Document) -> String {
    let mut text = String::from(
        "\\documentclass{article}\n\
         \\usepackage[utf8]{inputenc}\n\
         \\usepackage{amsmath}\n\
         \\usepackage{graphicx}\n\
         \\usepackage{hyperref}\n\
         \\usepackage{ulem}\n",
    );
    if let Some(title) = doc.title() {
        text.push_str(&format!("\\title{{{}}}\n", escape_latex(title)));
        let authors: Vec<String> = doc
            .frontmatter
            .authors
            .iter()
            .map(|a| escape_latex(&a.name))
            .collect();
        text.push_str(&format!("\\author{{{}}}\n", authors.join(" \\and ")));
    }
    text.push_str("\n\\begin{document}\n");
    if doc.title().is_some() {
        text.push_str("\\maketitle\n");
    }
    text.push('\n');
    text
}

/// Escape LaTeX special characters.
pub fn escape_latex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' | '}' | '$' | '&' | '#' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Default)]
struct LatexWriter {
    out: String,
}

impl LatexWriter {
    fn finish(self) -> String {
        self.out
    }

    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn label(&mut self, node: &Node) {
        if let Some(id) = &node.identifier {
            self.push(&format!("\\label{{{}}}", escape_latex(id)));
        }
    }

    fn children(&mut self, node: &Node) {
        for child in &node.children {
            self.node(child);
        }
    }

    fn command(&mut self, name: &str, node: &Node) {
        self.push(&format!("\\{name}{{"));
        self.children(node);
        self.push("}");
    }

    fn environment(&mut self, name: &str, node: &Node) {
        self.push(&format!("\\begin{{{name}}}\n"));
        self.children(node);
        self.push(&format!("\\end{{{name}}}\n"));
    }

    fn node(&mut self, node: &Node) {
        if is_hidden(node) {
            return;
        }
        match &node.kind {
            NodeKind::Text { value } => self.push(&escape_latex(value)),
            NodeKind::Paragraph => {
                self.children(node);
                self.push("\n\n");
            }
            NodeKind::Heading { depth } => {
                let command = match depth {
                    1 => "section",
                    2 => "subsection",
                    3 => "subsubsection",
                    4 => "paragraph",
                    _ => "subparagraph",
                };
                let star = if node.enumerator.is_some() { "" } else { "*" };
                self.push(&format!("\\{command}{star}{{"));
                self.children(node);
                self.push("}");
                self.label(node);
                self.push("\n\n");
            }
            NodeKind::Emphasis => self.command("emph", node),
            NodeKind::Strong => self.command("textbf", node),
            NodeKind::Underline => self.command("uline", node),
            NodeKind::Delete => self.command("sout", node),
            NodeKind::Subscript => self.command("textsubscript", node),
            NodeKind::Superscript => self.command("textsuperscript", node),
            NodeKind::Keyboard => self.command("texttt", node),
            NodeKind::InlineCode { value } => {
                self.push(&format!("\\texttt{{{}}}", escape_latex(value)));
            }
            NodeKind::Code { value, .. } => {
                self.push("\\begin{verbatim}\n");
                self.push(value);
                self.push("\n\\end{verbatim}\n");
            }
            NodeKind::Link { url, .. } => {
                self.push(&format!("\\href{{{}}}{{", url.replace('%', "\\%").replace('#', "\\#")));
                self.children(node);
                self.push("}");
            }
            NodeKind::Image { url, .. } => {
                self.push(&format!("\\includegraphics[width=0.8\\linewidth]{{{url}}}\n"));
            }
            NodeKind::List { ordered, .. } => {
                self.environment(if *ordered { "enumerate" } else { "itemize" }, node);
            }
            NodeKind::ListItem => {
                self.push("\\item ");
                self.children(node);
            }
            NodeKind::Blockquote => self.environment("quote", node),
            NodeKind::ThematicBreak => self.push("\\bigskip\\hrule\\bigskip\n\n"),
            NodeKind::Break => self.push("\\\\\n"),
            NodeKind::Math { value } => {
                if node.enumerator.is_some() {
                    self.push("\\begin{equation}\n");
                    self.push(value);
                    self.label(node);
                    self.push("\n\\end{equation}\n");
                } else {
                    self.push("\\[\n");
                    self.push(value);
                    self.push("\n\\]\n");
                }
            }
            NodeKind::InlineMath { value } => self.push(&format!("${value}$")),
            NodeKind::Admonition { .. } => {
                self.push("\\begin{quote}\n");
                self.children(node);
                self.push("\\end{quote}\n");
            }
            NodeKind::AdmonitionTitle => {
                self.command("textbf", node);
                self.push("\n\n");
            }
            NodeKind::Container { kind, .. } => self.container(node, *kind),
            NodeKind::Table => self.table(node),
            NodeKind::CrossReference { .. } => self.children(node),
            NodeKind::FootnoteReference => {
                let number = node.enumerator.as_deref().unwrap_or("?");
                self.push(&format!("\\textsuperscript{{{}}}", escape_latex(number)));
            }
            NodeKind::FootnoteDefinition => {
                let number = node.enumerator.as_deref().unwrap_or("?");
                self.push(&format!("\\noindent\\textsuperscript{{{}}} ", escape_latex(number)));
                self.children(node);
            }
            NodeKind::Raw { format, value } => {
                if format == "latex" || format == "tex" {
                    self.push(value);
                }
            }
            NodeKind::Output { jupyter_data } => {
                if let Some(text) = output_text(jupyter_data) {
                    self.push("\\begin{verbatim}\n");
                    self.push(text.trim_end());
                    self.push("\n\\end{verbatim}\n");
                }
            }
            _ => self.children(node),
        }
    }

    fn container(&mut self, node: &Node, kind: ContainerKind) {
        let (body, caption, _) = container_parts(node);
        let environment = match kind {
            ContainerKind::Table => "table",
            ContainerKind::Quote => {
                self.push("\\begin{quote}\n");
                for child in body {
                    self.node(child);
                }
                self.push("\\end{quote}\n");
                return;
            }
            ContainerKind::Figure | ContainerKind::Code => "figure",
        };
        self.push(&format!("\\begin{{{environment}}}[htbp]\n\\centering\n"));
        for child in body {
            self.node(child);
        }
        if let Some(caption) = caption {
            let mut inner = LatexWriter::default();
            inner.children(caption);
            let text = inner.finish();
            let star = if node.enumerator.is_some() { "" } else { "*" };
            self.push(&format!("\\caption{star}{{{}}}\n", text.trim()));
        }
        self.label(node);
        self.push(&format!("\n\\end{{{environment}}}\n\n"));
    }

    fn table(&mut self, node: &Node) {
        let columns = node.children.first().map_or(1, |row| row.children.len().max(1));
        self.push(&format!("\\begin{{tabular}}{{{}}}\n\\hline\n", "l".repeat(columns)));
        for row in &node.children {
            let header = row
                .children
                .iter()
                .any(|c| matches!(c.kind, NodeKind::TableCell { header: true, .. }));
            for (i, cell) in row.children.iter().enumerate() {
                if i > 0 {
                    self.push(" & ");
                }
                self.children(cell);
            }
            self.push(" \\\\\n");
            if header {
                self.push("\\hline\n");
            }
        }
        self.push("\\hline\n\\end{tabular}\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body(children: Vec<Node>) -> String {
        let mut doc = Document::new(0, "a.md", "");
        doc.root = Node::root(children);
        let options = BackendOptions {
            standalone: false,
            bibliography: false,
        };
        LatexBackend
            .serialize(&doc, &options)
            .unwrap()
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_escape_latex() {
        assert_eq!(escape_latex("50% of $x_1 & #2"), "50\\% of \\$x\\_1 \\& \\#2");
        assert_eq!(escape_latex("a\\b~"), "a\\textbackslash{}b\\textasciitilde{}");
    }

    #[test]
    fn test_numbered_equation_has_label() {
        let mut math = Node::new(NodeKind::Math { value: "E=mc^2".into() }).labelled("eq-e");
        math.enumerator = Some("1".into());
        assert_eq!(
            body(vec![math]),
            "\\begin{equation}\nE=mc^2\\label{eq-e}\n\\end{equation}\n"
        );
    }

    #[test]
    fn test_unnumbered_heading_is_starred() {
        let heading = Node::with_children(NodeKind::Heading { depth: 2 }, vec![Node::text("Intro")]);
        assert_eq!(body(vec![heading]), "\\subsection*{Intro}\n\n");
    }

    #[test]
    fn test_standalone_document() {
        let mut doc = Document::new(0, "a.md", "");
        doc.frontmatter.title = Some("On & Off".into());
        doc.root = Node::root(vec![Node::paragraph(vec![Node::text("Hi")])]);
        let artifact = LatexBackend.serialize(&doc, &BackendOptions::default()).unwrap();
        let text = artifact.as_str().unwrap();
        assert!(text.starts_with("\\documentclass{article}"));
        assert!(text.contains("\\title{On \\& Off}"));
        assert!(text.contains("\\maketitle"));
        assert!(text.trim_end().ends_with("\\end{document}"));
        assert_eq!(artifact.extension, "tex");
    }
}
