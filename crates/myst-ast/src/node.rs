/*
 * node.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The document node.
 */

use myst_source_map::SourceInfo;
use serde::{Deserialize, Serialize};

use crate::identifiers::normalize_label;
use crate::kind::NodeKind;

/// An entry for the generated index, attached by the `index` role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub entry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subentry: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub emphasis: bool,
}

/// A node in a document tree.
///
/// Children are owned, so a node has exactly one parent and a tree cannot
/// contain itself. Passes that need to move nodes do so by value.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,

    /// Normalized label, unique within a project
    pub identifier: Option<String>,
    /// Label as written by the author
    pub label: Option<String>,
    /// Anchor id, unique within a document
    pub html_id: Option<String>,

    /// Whether this node takes part in numbering
    pub enumerated: Option<bool>,
    pub enumerator: Option<String>,

    pub index_entries: Vec<IndexEntry>,
    pub position: Option<SourceInfo>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            children: Vec::new(),
            identifier: None,
            label: None,
            html_id: None,
            enumerated: None,
            enumerator: None,
            index_entries: Vec::new(),
            position: None,
        }
    }

    pub fn with_children(kind: NodeKind, children: Vec<Node>) -> Self {
        Node {
            children,
            ..Node::new(kind)
        }
    }

    pub fn root(children: Vec<Node>) -> Self {
        Node::with_children(NodeKind::Root, children)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Node::new(NodeKind::Text {
            value: value.into(),
        })
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::with_children(NodeKind::Paragraph, children)
    }

    pub fn at(mut self, position: SourceInfo) -> Self {
        self.position = Some(position);
        self
    }

    pub fn at_opt(mut self, position: Option<SourceInfo>) -> Self {
        self.position = position;
        self
    }

    /// Set the label and derive the identifier from it.
    ///
    /// Labels that normalize to nothing leave the node unlabelled.
    pub fn labelled(mut self, label: &str) -> Self {
        self.set_label(label);
        self
    }

    pub fn set_label(&mut self, label: &str) {
        if let Some(identifier) = normalize_label(label) {
            self.label = Some(label.trim().to_string());
            self.identifier = Some(identifier);
        }
    }

    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Node::size).sum::<usize>()
    }
}
