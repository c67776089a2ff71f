/*
 * passes/lift.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Unwrapping of directive and role wrappers.
 */

use async_trait::async_trait;
use myst_ast::visit::splice;
use myst_ast::{Node, NodeKind};

use crate::document::Document;
use crate::error::PassError;
use crate::pipeline::DocumentPass;
use crate::session::Session;

/// Replaces every successful `mystDirective` and `mystRole` wrapper by its
/// expansion. Failed invocations stay as placeholders.
pub struct LiftExtensionsPass;

#[async_trait]
impl DocumentPass for LiftExtensionsPass {
    fn name(&self) -> &str {
        "lift-extensions"
    }

    async fn run(&self, doc: &mut Document, _session: &Session) -> Result<(), PassError> {
        splice(&mut doc.root, &mut |node: Node| match node.kind {
            NodeKind::MystDirective { error: false, .. } | NodeKind::MystRole { error: false, .. } => {
                node.children
            }
            _ => vec![node],
        });
        Ok(())
    }
}
