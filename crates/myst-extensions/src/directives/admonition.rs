/*
 * directives/admonition.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Callout boxes.
 */

use myst_ast::{Node, NodeKind};

use super::{apply_label, body_blocks};
use crate::context::ExpandContext;
use crate::data::DirectiveData;
use crate::registry::Directive;
use crate::spec::{BodyKind, DirectiveSpec, ValueType};

/// Admonition kinds with their own directive name.
pub const ADMONITION_KINDS: [&str; 10] = [
    "note",
    "tip",
    "hint",
    "important",
    "attention",
    "caution",
    "warning",
    "danger",
    "error",
    "seealso",
];

/// `admonition` (title required) and the typed variants (title optional).
pub struct AdmonitionDirective {
    spec: DirectiveSpec,
    kind: String,
}

impl AdmonitionDirective {
    pub fn generic() -> Self {
        AdmonitionDirective {
            spec: DirectiveSpec::new("admonition")
                .arg(ValueType::Markdown, true)
                .common_options()
                .body(BodyKind::Markdown, false),
            kind: "admonition".to_string(),
        }
    }

    pub fn typed(kind: &str) -> Self {
        AdmonitionDirective {
            spec: DirectiveSpec::new(kind)
                .arg(ValueType::Markdown, false)
                .common_options()
                .body(BodyKind::Markdown, false),
            kind: kind.to_string(),
        }
    }
}

impl Default for AdmonitionDirective {
    fn default() -> Self {
        Self::generic()
    }
}

impl Directive for AdmonitionDirective {
    fn spec(&self) -> &DirectiveSpec {
        &self.spec
    }

    fn expand(&self, data: DirectiveData, ctx: &mut ExpandContext<'_>) -> Vec<Node> {
        let mut children = Vec::new();
        if let Some(title) = data.arg_str().filter(|t| !t.trim().is_empty()) {
            let offset = data.position.map(|p| p.start_offset()).unwrap_or(0);
            children.push(Node::with_children(
                NodeKind::AdmonitionTitle,
                ctx.parse_inlines(title.trim(), offset),
            ));
        }
        children.extend(body_blocks(&data, ctx));
        let mut node = Node::with_children(
            NodeKind::Admonition {
                kind: self.kind.clone(),
                class: data.class(),
            },
            children,
        )
        .at_opt(data.position);
        apply_label(&mut node, &data);
        vec![node]
    }
}
