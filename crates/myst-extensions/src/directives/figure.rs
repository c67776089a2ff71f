/*
 * directives/figure.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Figures and tables.
 */

use myst_ast::{ContainerKind, Node, NodeKind};

use super::{apply_label, body_blocks};
use crate::context::ExpandContext;
use crate::data::DirectiveData;
use crate::registry::Directive;
use crate::spec::{BodyKind, DirectiveSpec, ValueType};

/// `figure`: an image with an optional caption.
///
/// The first paragraph of the body becomes the caption, anything after it
/// the legend.
pub struct FigureDirective {
    spec: DirectiveSpec,
}

impl FigureDirective {
    pub fn new() -> Self {
        FigureDirective {
            spec: DirectiveSpec::new("figure")
                .arg(ValueType::String, true)
                .common_options()
                .option("alt", ValueType::String)
                .option("width", ValueType::String)
                .option("align", ValueType::String)
                .option("nonumber", ValueType::Boolean)
                .body(BodyKind::Markdown, false),
        }
    }
}

impl Default for FigureDirective {
    fn default() -> Self {
        Self::new()
    }
}

impl Directive for FigureDirective {
    fn spec(&self) -> &DirectiveSpec {
        &self.spec
    }

    fn expand(&self, data: DirectiveData, ctx: &mut ExpandContext<'_>) -> Vec<Node> {
        let url = data.arg_str().unwrap_or_default().trim().to_string();
        let image = Node::new(NodeKind::Image {
            url,
            alt: data.option_str("alt").map(str::to_string),
            title: None,
            width: data.option_str("width").map(str::to_string),
            align: data.option_str("align").map(str::to_string),
        })
        .at_opt(data.position);

        let mut children = vec![image];
        let mut body = body_blocks(&data, ctx).into_iter();
        if let Some(first) = body.next() {
            children.push(Node::with_children(NodeKind::Caption, vec![first]));
        }
        let legend: Vec<Node> = body.collect();
        if !legend.is_empty() {
            children.push(Node::with_children(NodeKind::Legend, legend));
        }

        let mut figure = Node::with_children(
            NodeKind::Container {
                kind: ContainerKind::Figure,
                class: data.class(),
            },
            children,
        )
        .at_opt(data.position);
        apply_label(&mut figure, &data);
        if data.flag("nonumber") {
            figure.enumerated = Some(false);
        }
        vec![figure]
    }
}

/// `table`: a captioned table. The argument is the caption.
pub struct TableDirective {
    spec: DirectiveSpec,
}

impl TableDirective {
    pub fn new() -> Self {
        TableDirective {
            spec: DirectiveSpec::new("table")
                .alias("list-table")
                .arg(ValueType::Markdown, false)
                .common_options()
                .option("align", ValueType::String)
                .option("nonumber", ValueType::Boolean)
                .body(BodyKind::Markdown, true),
        }
    }
}

impl Default for TableDirective {
    fn default() -> Self {
        Self::new()
    }
}

impl Directive for TableDirective {
    fn spec(&self) -> &DirectiveSpec {
        &self.spec
    }

    fn expand(&self, data: DirectiveData, ctx: &mut ExpandContext<'_>) -> Vec<Node> {
        let mut children = Vec::new();
        if let Some(caption) = data.arg_str().filter(|c| !c.trim().is_empty()) {
            let offset = data.position.map(|p| p.start_offset()).unwrap_or(0);
            let inlines = ctx.parse_inlines(caption.trim(), offset);
            children.push(Node::with_children(
                NodeKind::Caption,
                vec![Node::paragraph(inlines)],
            ));
        }
        children.extend(body_blocks(&data, ctx));
        let mut table = Node::with_children(
            NodeKind::Container {
                kind: ContainerKind::Table,
                class: data.class(),
            },
            children,
        )
        .at_opt(data.position);
        apply_label(&mut table, &data);
        if data.flag("nonumber") {
            table.enumerated = Some(false);
        }
        vec![table]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::test_support::{raw, run};

    #[test]
    fn test_figure_caption_and_legend() {
        let mut r = raw(
            "figure",
            Some("plot.png"),
            Some("The caption.\n\nA longer legend."),
        );
        r.options
            .insert("label".into(), serde_json::json!("fig:one"));
        let (nodes, diagnostics) = run(&FigureDirective::new(), r);
        assert!(diagnostics.is_empty());
        let fig = &nodes[0];
        assert_eq!(fig.identifier.as_deref(), Some("fig:one"));
        assert!(matches!(fig.children[0].kind, NodeKind::Image { .. }));
        assert_eq!(fig.children[1].kind, NodeKind::Caption);
        assert_eq!(fig.children[2].kind, NodeKind::Legend);
    }

    #[test]
    fn test_figure_nonumber() {
        let mut r = raw("figure", Some("a.png"), None);
        r.options.insert("nonumber".into(), serde_json::Value::Null);
        let (nodes, _) = run(&FigureDirective::new(), r);
        assert_eq!(nodes[0].enumerated, Some(false));
        assert_eq!(nodes[0].children.len(), 1);
    }

    #[test]
    fn test_table_requires_body() {
        let (nodes, diagnostics) = run(&TableDirective::new(), raw("table", Some("Caption"), None));
        assert!(nodes.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].title.contains("table"));
    }
}
