/*
 * passes/html_ids.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Anchor ids.
 */

//! The `html-ids` pass.
//!
//! Gives every target, every heading and every footnote definition an
//! anchor id unique within its document. Ids come from the identifier, or
//! from the heading text for unlabelled headings; clashes get `-1`, `-2`,
//! ... suffixes in document order.

use std::collections::HashSet;

use async_trait::async_trait;
use myst_ast::visit::walk_mut;
use myst_ast::{Node, NodeKind, create_html_id};

use crate::document::Document;
use crate::error::PassError;
use crate::pipeline::DocumentPass;
use crate::project::is_target;
use crate::session::Session;

pub struct HtmlIdsPass;

#[async_trait]
impl DocumentPass for HtmlIdsPass {
    fn name(&self) -> &str {
        "html-ids"
    }

    async fn run(&self, doc: &mut Document, _session: &Session) -> Result<(), PassError> {
        let mut taken: HashSet<String> = HashSet::new();
        walk_mut(&mut doc.root, &mut |node: &mut Node| {
            let Some(base) = anchor_base(node) else {
                return;
            };
            let mut id = base.clone();
            let mut n = 0;
            while taken.contains(&id) {
                n += 1;
                id = format!("{base}-{n}");
            }
            taken.insert(id.clone());
            node.html_id = Some(id);
        });
        Ok(())
    }
}

fn anchor_base(node: &Node) -> Option<String> {
    if node.kind == NodeKind::FootnoteDefinition {
        let id = create_html_id(node.identifier.as_deref()?)?;
        return Some(format!("fn-{id}"));
    }
    if is_target(node) {
        return create_html_id(node.identifier.as_deref()?);
    }
    if matches!(node.kind, NodeKind::Heading { .. }) {
        return create_html_id(&myst_ast::to_text(node));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildOptions;
    use crate::session::MemoryLoader;
    use std::sync::Arc;

    fn heading(text: &str) -> Node {
        Node::with_children(NodeKind::Heading { depth: 2 }, vec![Node::text(text)])
    }

    #[tokio::test]
    async fn test_ids_are_unique_in_document_order() {
        let session = Session::new(BuildOptions::default(), Arc::new(MemoryLoader::new()));
        let mut doc = Document::new(0, "a.md", "");
        doc.root = Node::root(vec![
            heading("Results"),
            heading("Results"),
            Node::new(NodeKind::Math { value: "x".into() }).labelled("results"),
            Node::paragraph(vec![Node::text("plain")]),
            Node::new(NodeKind::FootnoteDefinition).labelled("1"),
        ]);
        HtmlIdsPass.run(&mut doc, &session).await.unwrap();
        let ids: Vec<Option<&str>> = doc
            .root
            .children
            .iter()
            .map(|n| n.html_id.as_deref())
            .collect();
        assert_eq!(
            ids,
            vec![
                Some("results"),
                Some("results-1"),
                Some("results-2"),
                None,
                Some("fn-id-1")
            ]
        );
    }
}
