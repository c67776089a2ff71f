/*
 * text.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Plain-text extraction.
 */

use crate::kind::NodeKind;
use crate::node::Node;

/// Concatenated text content of a subtree.
///
/// Used for titles, reference text and anchor ids. Formatting is dropped;
/// breaks become spaces.
pub fn to_text(node: &Node) -> String {
    let mut out = String::new();
    push_text(node, &mut out);
    out
}

/// Text of a list of sibling nodes.
pub fn children_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        push_text(node, &mut out);
    }
    out
}

fn push_text(node: &Node, out: &mut String) {
    match &node.kind {
        NodeKind::Text { value }
        | NodeKind::InlineCode { value }
        | NodeKind::InlineMath { value } => out.push_str(value),
        NodeKind::Break => out.push(' '),
        NodeKind::Comment { .. } | NodeKind::FootnoteReference => {}
        _ => {
            for child in &node.children {
                push_text(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_text_flattens_formatting() {
        let node = Node::paragraph(vec![
            Node::text("Hello "),
            Node::with_children(NodeKind::Strong, vec![Node::text("bold")]),
            Node::new(NodeKind::Break),
            Node::new(NodeKind::InlineCode {
                value: "x".into(),
            }),
        ]);
        assert_eq!(to_text(&node), "Hello bold x");
    }

    #[test]
    fn test_footnote_reference_has_no_text() {
        let nodes = vec![Node::text("a"), Node::new(NodeKind::FootnoteReference)];
        assert_eq!(children_text(&nodes), "a");
    }
}
