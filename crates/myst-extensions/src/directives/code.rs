/*
 * directives/code.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Code blocks and executable cells.
 */

use myst_ast::{ContainerKind, Node, NodeKind};

use super::apply_label;
use crate::context::ExpandContext;
use crate::data::DirectiveData;
use crate::registry::Directive;
use crate::spec::{BodyKind, DirectiveSpec, ValueType};

/// Block kind marking an executable cell with its outputs.
pub const NOTEBOOK_CODE: &str = "notebook-code";

fn code_value(data: &DirectiveData) -> String {
    data.body_text().trim_end_matches('\n').to_string()
}

/// `code` / `code-block` / `sourcecode`.
///
/// With a `caption` the code is wrapped in a numbered code container that
/// carries the label; without one the label goes on the code node.
pub struct CodeDirective {
    spec: DirectiveSpec,
}

impl CodeDirective {
    pub fn new() -> Self {
        CodeDirective {
            spec: DirectiveSpec::new("code")
                .alias("code-block")
                .alias("sourcecode")
                .arg(ValueType::String, false)
                .common_options()
                .option("caption", ValueType::Markdown)
                .option("linenos", ValueType::Boolean)
                .body(BodyKind::Raw, false),
        }
    }
}

impl Default for CodeDirective {
    fn default() -> Self {
        Self::new()
    }
}

impl Directive for CodeDirective {
    fn spec(&self) -> &DirectiveSpec {
        &self.spec
    }

    fn expand(&self, data: DirectiveData, ctx: &mut ExpandContext<'_>) -> Vec<Node> {
        let code = Node::new(NodeKind::Code {
            lang: data.arg_str().map(|l| l.trim().to_string()),
            meta: None,
            value: code_value(&data),
            executable: false,
            show_line_numbers: data.flag("linenos"),
        })
        .at_opt(data.position);

        let Some(caption) = data.option_str("caption").filter(|c| !c.trim().is_empty()) else {
            let mut code = code;
            apply_label(&mut code, &data);
            return vec![code];
        };
        let offset = data.position.map(|p| p.start_offset()).unwrap_or(0);
        let caption = Node::with_children(
            NodeKind::Caption,
            vec![Node::paragraph(ctx.parse_inlines(caption.trim(), offset))],
        );
        let mut container = Node::with_children(
            NodeKind::Container {
                kind: ContainerKind::Code,
                class: data.class(),
            },
            vec![caption, code],
        )
        .at_opt(data.position);
        apply_label(&mut container, &data);
        vec![container]
    }
}

/// `code-cell`: source to be executed, followed by its outputs.
pub struct CodeCellDirective {
    spec: DirectiveSpec,
}

impl CodeCellDirective {
    pub fn new() -> Self {
        CodeCellDirective {
            spec: DirectiveSpec::new("code-cell")
                .arg(ValueType::String, false)
                .common_options()
                .option("tags", ValueType::String)
                .body(BodyKind::Raw, false),
        }
    }
}

impl Default for CodeCellDirective {
    fn default() -> Self {
        Self::new()
    }
}

impl Directive for CodeCellDirective {
    fn spec(&self) -> &DirectiveSpec {
        &self.spec
    }

    fn expand(&self, data: DirectiveData, _ctx: &mut ExpandContext<'_>) -> Vec<Node> {
        let code = Node::new(NodeKind::Code {
            lang: data.arg_str().map(|l| l.trim().to_string()),
            meta: data.option_str("tags").map(str::to_string),
            value: code_value(&data),
            executable: true,
            show_line_numbers: false,
        })
        .at_opt(data.position);
        let mut block = Node::with_children(
            NodeKind::Block {
                kind: Some(NOTEBOOK_CODE.to_string()),
                meta: None,
            },
            vec![code, Node::new(NodeKind::Outputs)],
        )
        .at_opt(data.position);
        apply_label(&mut block, &data);
        vec![block]
    }
}
