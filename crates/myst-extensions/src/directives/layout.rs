/*
 * directives/layout.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Generic containers: div, asides and quotes.
 */

use myst_ast::{ContainerKind, Node, NodeKind};

use super::{apply_label, body_blocks};
use crate::context::ExpandContext;
use crate::data::DirectiveData;
use crate::registry::Directive;
use crate::spec::{BodyKind, DirectiveSpec, ValueType};

pub struct DivDirective {
    spec: DirectiveSpec,
}

impl DivDirective {
    pub fn new() -> Self {
        DivDirective {
            spec: DirectiveSpec::new("div")
                .arg(ValueType::String, false)
                .common_options()
                .body(BodyKind::Markdown, false),
        }
    }
}

impl Default for DivDirective {
    fn default() -> Self {
        Self::new()
    }
}

impl Directive for DivDirective {
    fn spec(&self) -> &DirectiveSpec {
        &self.spec
    }

    fn expand(&self, data: DirectiveData, ctx: &mut ExpandContext<'_>) -> Vec<Node> {
        // the argument is an alternative spelling of `class`
        let class = data
            .class()
            .or_else(|| data.arg_str().map(|a| a.trim().to_string()));
        let mut div = Node::with_children(NodeKind::Div { class }, body_blocks(&data, ctx))
            .at_opt(data.position);
        apply_label(&mut div, &data);
        vec![div]
    }
}

/// `margin`, `aside` and `sidebar`. An argument becomes a bold title.
pub struct AsideDirective {
    spec: DirectiveSpec,
}

impl AsideDirective {
    pub fn new() -> Self {
        AsideDirective {
            spec: DirectiveSpec::new("aside")
                .alias("margin")
                .alias("sidebar")
                .arg(ValueType::Markdown, false)
                .common_options()
                .body(BodyKind::Markdown, false),
        }
    }
}

impl Default for AsideDirective {
    fn default() -> Self {
        Self::new()
    }
}

impl Directive for AsideDirective {
    fn spec(&self) -> &DirectiveSpec {
        &self.spec
    }

    fn expand(&self, data: DirectiveData, ctx: &mut ExpandContext<'_>) -> Vec<Node> {
        let mut children = Vec::new();
        if let Some(title) = data.arg_str().filter(|t| !t.trim().is_empty()) {
            let offset = data.position.map(|p| p.start_offset()).unwrap_or(0);
            let inlines = ctx.parse_inlines(title.trim(), offset);
            children.push(Node::paragraph(vec![Node::with_children(
                NodeKind::Strong,
                inlines,
            )]));
        }
        children.extend(body_blocks(&data, ctx));
        let mut aside = Node::with_children(
            NodeKind::Aside {
                kind: Some(data.name.clone()),
            },
            children,
        )
        .at_opt(data.position);
        apply_label(&mut aside, &data);
        vec![aside]
    }
}

/// `epigraph`, `pull-quote` and `blockquote`, with optional attribution.
pub struct QuoteDirective {
    spec: DirectiveSpec,
}

impl QuoteDirective {
    pub fn new() -> Self {
        QuoteDirective {
            spec: DirectiveSpec::new("blockquote")
                .alias("epigraph")
                .alias("pull-quote")
                .common_options()
                .option("attribution", ValueType::Markdown)
                .body(BodyKind::Markdown, true),
        }
    }
}

impl Default for QuoteDirective {
    fn default() -> Self {
        Self::new()
    }
}

impl Directive for QuoteDirective {
    fn spec(&self) -> &DirectiveSpec {
        &self.spec
    }

    fn expand(&self, data: DirectiveData, ctx: &mut ExpandContext<'_>) -> Vec<Node> {
        let quote = Node::with_children(NodeKind::Blockquote, body_blocks(&data, ctx));
        let mut children = vec![quote];
        if let Some(attribution) = data.option_str("attribution").filter(|a| !a.trim().is_empty()) {
            let offset = data.position.map(|p| p.start_offset()).unwrap_or(0);
            let inlines = ctx.parse_inlines(attribution.trim(), offset);
            children.push(Node::with_children(
                NodeKind::Caption,
                vec![Node::paragraph(inlines)],
            ));
        }
        let class = data.class().or_else(|| Some(data.name.clone()));
        let mut container = Node::with_children(
            NodeKind::Container {
                kind: ContainerKind::Quote,
                class,
            },
            children,
        )
        .at_opt(data.position);
        apply_label(&mut container, &data);
        vec![container]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::test_support::{raw, run};

    #[test]
    fn test_div_class_from_argument() {
        let (nodes, _) = run(&DivDirective::new(), raw("div", Some("wide"), Some("Text")));
        assert_eq!(
            nodes[0].kind,
            NodeKind::Div {
                class: Some("wide".into())
            }
        );
        assert_eq!(nodes[0].children.len(), 1);
    }

    #[test]
    fn test_margin_keeps_invoked_name() {
        let (nodes, _) = run(
            &AsideDirective::new(),
            raw("margin", Some("Note"), Some("Side text")),
        );
        assert_eq!(
            nodes[0].kind,
            NodeKind::Aside {
                kind: Some("margin".into())
            }
        );
        assert_eq!(nodes[0].children.len(), 2);
    }

    #[test]
    fn test_epigraph_attribution() {
        let mut r = raw("epigraph", None, Some("To be or not to be."));
        r.options.insert("attribution".into(), serde_json::json!("Hamlet"));
        let (nodes, _) = run(&QuoteDirective::new(), r);
        assert_eq!(nodes[0].children[0].kind, NodeKind::Blockquote);
        assert_eq!(nodes[0].children[1].kind, NodeKind::Caption);
    }
}
