/*
 * passes/targets.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Label propagation and enumerable-node marking.
 */

//! The `targets` pass.
//!
//! A `(label)=` line labels the next node among its siblings. Comments are
//! skipped when looking for that node, and directive or role wrappers are
//! looked through, so a target written above a figure directive labels the
//! figure itself. A target that finds no unlabelled node stays in the tree
//! as a plain anchor.
//!
//! The pass then marks every node that takes part in numbering according to
//! the page's numbering policy, and records the labels the page declares.

use async_trait::async_trait;
use myst_ast::visit::walk;
use myst_ast::{ContainerKind, Node, NodeKind};
use myst_frontmatter::Numbering;

use crate::document::Document;
use crate::error::PassError;
use crate::pipeline::DocumentPass;
use crate::project::{is_target, target_kind};
use crate::session::Session;

pub struct TargetsPass;

#[async_trait]
impl DocumentPass for TargetsPass {
    fn name(&self) -> &str {
        "targets"
    }

    async fn run(&self, doc: &mut Document, _session: &Session) -> Result<(), PassError> {
        attach_targets(&mut doc.root);
        mark_enumerated(&mut doc.root, &doc.frontmatter.numbering, false);

        let mut labels = Vec::new();
        walk(&doc.root, &mut |node| {
            if is_target(node)
                && let Some(identifier) = &node.identifier
            {
                labels.push(identifier.clone());
            }
        });
        doc.references.labels = labels;
        Ok(())
    }
}

fn attach_targets(node: &mut Node) {
    for child in &mut node.children {
        attach_targets(child);
    }
    if !node
        .children
        .iter()
        .any(|c| c.kind == NodeKind::MystTarget)
    {
        return;
    }

    let children = std::mem::take(&mut node.children);
    let mut out = Vec::with_capacity(children.len());
    let mut pending: Vec<Node> = Vec::new();
    for mut child in children {
        match child.kind {
            NodeKind::MystTarget if child.identifier.is_some() => pending.push(child),
            NodeKind::Comment { .. } => out.push(child),
            _ => {
                if let Some(target) = pending.pop() {
                    let host = label_host(&mut child);
                    if host.identifier.is_none() {
                        host.label = target.label;
                        host.identifier = target.identifier;
                    } else {
                        pending.push(target);
                    }
                }
                out.append(&mut pending);
                out.push(child);
            }
        }
    }
    out.append(&mut pending);
    node.children = out;
}

/// The node a target above `node` should label.
fn label_host(node: &mut Node) -> &mut Node {
    if matches!(
        node.kind,
        NodeKind::MystDirective { error: false, .. } | NodeKind::MystRole { error: false, .. }
    ) && node.children.len() == 1
    {
        return label_host(&mut node.children[0]);
    }
    node
}

fn mark_enumerated(node: &mut Node, numbering: &Numbering, in_container: bool) {
    let candidate = match &node.kind {
        NodeKind::Container { kind, .. } => *kind != ContainerKind::Quote,
        NodeKind::Math { .. } => true,
        NodeKind::Code { .. } | NodeKind::Table => !in_container && node.identifier.is_some(),
        NodeKind::Heading { depth } => numbering.numbers_heading(*depth),
        _ => false,
    };
    if candidate && node.enumerated != Some(false) {
        let enabled = numbering.policy(target_kind(node)).enabled;
        node.enumerated = Some(enabled);
    }
    let in_container = in_container || matches!(node.kind, NodeKind::Container { .. });
    for child in &mut node.children {
        mark_enumerated(child, numbering, in_container);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildOptions;
    use crate::session::MemoryLoader;
    use indexmap::IndexMap;
    use std::sync::Arc;

    fn target(label: &str) -> Node {
        Node::new(NodeKind::MystTarget).labelled(label)
    }

    fn figure() -> Node {
        Node::new(NodeKind::Container {
            kind: ContainerKind::Figure,
            class: None,
        })
    }

    fn wrapper(child: Node) -> Node {
        Node::with_children(
            NodeKind::MystDirective {
                name: "figure".into(),
                args: None,
                options: IndexMap::new(),
                value: None,
                error: false,
            },
            vec![child],
        )
    }

    async fn run(children: Vec<Node>, numbering: Numbering) -> Document {
        let session = Session::new(BuildOptions::default(), Arc::new(MemoryLoader::new()));
        let mut doc = Document::new(0, "a.md", "");
        doc.root = Node::root(children);
        doc.frontmatter.numbering = numbering;
        TargetsPass.run(&mut doc, &session).await.unwrap();
        doc
    }

    #[tokio::test]
    async fn test_target_labels_next_node_through_wrapper() {
        let doc = run(
            vec![
                target("fig:plot"),
                Node::new(NodeKind::Comment { value: "x".into() }),
                wrapper(figure()),
            ],
            Numbering::default(),
        )
        .await;
        assert_eq!(doc.root.children.len(), 2);
        let figure = &doc.root.children[1].children[0];
        assert_eq!(figure.identifier.as_deref(), Some("fig:plot"));
        assert_eq!(figure.enumerated, Some(true));
        assert_eq!(doc.references.labels, vec!["fig:plot"]);
    }

    #[tokio::test]
    async fn test_trailing_target_stays_as_anchor() {
        let doc = run(
            vec![Node::paragraph(vec![Node::text("a")]), target("end")],
            Numbering::default(),
        )
        .await;
        assert_eq!(doc.root.children[1].kind, NodeKind::MystTarget);
        assert_eq!(doc.references.labels, vec!["end"]);
    }

    #[tokio::test]
    async fn test_existing_label_is_kept() {
        let doc = run(
            vec![target("outer"), figure().labelled("inner")],
            Numbering::default(),
        )
        .await;
        assert_eq!(doc.root.children.len(), 2);
        assert_eq!(doc.references.labels, vec!["outer", "inner"]);
    }

    #[tokio::test]
    async fn test_marks_per_policy() {
        let mut nonumber = Node::new(NodeKind::Math { value: "y".into() });
        nonumber.enumerated = Some(false);
        let doc = run(
            vec![
                Node::new(NodeKind::Heading { depth: 1 }),
                Node::new(NodeKind::Math { value: "x".into() }),
                nonumber,
                Node::new(NodeKind::Code {
                    lang: None,
                    meta: None,
                    value: "1".into(),
                    executable: false,
                    show_line_numbers: false,
                }),
            ],
            Numbering::default(),
        )
        .await;
        let marks: Vec<Option<bool>> = doc.root.children.iter().map(|n| n.enumerated).collect();
        assert_eq!(marks, vec![None, Some(true), Some(false), None]);

        let doc = run(vec![Node::new(NodeKind::Heading { depth: 2 })], Numbering::all(true)).await;
        assert_eq!(doc.root.children[0].enumerated, Some(true));
    }
}
