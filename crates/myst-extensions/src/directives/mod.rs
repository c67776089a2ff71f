/*
 * directives/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Built-in directives.
 */

use std::sync::Arc;

use myst_ast::Node;

use crate::context::ExpandContext;
use crate::data::DirectiveData;
use crate::registry::Directive;

mod admonition;
mod code;
mod figure;
mod include;
mod layout;
mod math;

pub use admonition::{ADMONITION_KINDS, AdmonitionDirective};
pub use code::{CodeCellDirective, CodeDirective, NOTEBOOK_CODE};
pub use figure::{FigureDirective, TableDirective};
pub use include::IncludeDirective;
pub use layout::{AsideDirective, DivDirective, QuoteDirective};
pub use math::MathDirective;

/// Every built-in directive, in registration order.
pub fn builtins() -> Vec<Arc<dyn Directive>> {
    let mut out: Vec<Arc<dyn Directive>> = Vec::new();
    out.push(Arc::new(AdmonitionDirective::generic()));
    for kind in ADMONITION_KINDS {
        out.push(Arc::new(AdmonitionDirective::typed(kind)));
    }
    out.push(Arc::new(FigureDirective::new()));
    out.push(Arc::new(TableDirective::new()));
    out.push(Arc::new(CodeDirective::new()));
    out.push(Arc::new(CodeCellDirective::new()));
    out.push(Arc::new(MathDirective::new()));
    out.push(Arc::new(IncludeDirective::new()));
    out.push(Arc::new(DivDirective::new()));
    out.push(Arc::new(AsideDirective::new()));
    out.push(Arc::new(QuoteDirective::new()));
    out
}

/// Apply the `label`/`name` option to a node.
pub(crate) fn apply_label(node: &mut Node, data: &DirectiveData) {
    if let Some(label) = data.label() {
        node.set_label(label);
    }
}

/// Parse the body as block content.
pub(crate) fn body_blocks(data: &DirectiveData, ctx: &mut ExpandContext<'_>) -> Vec<Node> {
    match data.body.as_deref() {
        Some(body) if !body.trim().is_empty() => ctx.parse_blocks(body, data.body_offset),
        _ => Vec::new(),
    }
}
