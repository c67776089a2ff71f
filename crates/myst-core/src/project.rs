/*
 * project.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Project state for the project phase, and the symbol table.
 */

//! Whole-project state.
//!
//! After the barrier, the documents that finished their document passes
//! are gathered into a [`Project`] in input order. Project passes read and
//! rewrite them through it. The [`SymbolTable`] is rebuilt by every build
//! and never persisted.

use std::collections::HashMap;

use myst_ast::{ContainerKind, Node, NodeKind, TargetKind};
use myst_error_reporting::DiagnosticCollector;

use crate::document::Document;

/// A labelled node, as seen from the rest of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub identifier: String,
    /// Index of the declaring document
    pub file: usize,
    /// Path of the declaring document
    pub path: String,
    pub slug: String,
    pub kind: TargetKind,
    pub enumerator: Option<String>,
    /// Plain-text title: heading text or caption
    pub title: String,
    pub html_id: Option<String>,
    /// Reference template of the declaring document's numbering policy
    pub reference_template: Option<String>,
}

impl Symbol {
    /// Link to the symbol from the document at index `from`.
    pub fn url_from(&self, from: usize) -> String {
        let anchor = self.html_id.as_deref().unwrap_or(&self.identifier);
        if from == self.file {
            format!("#{anchor}")
        } else {
            format!("{}#{anchor}", self.slug)
        }
    }
}

/// Identifier to symbol, first declaration wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
    order: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `symbol` unless its identifier is taken. On a clash the
    /// existing symbol is returned and the table is unchanged.
    pub fn insert(&mut self, symbol: Symbol) -> Result<(), &Symbol> {
        if self.symbols.contains_key(&symbol.identifier) {
            return Err(&self.symbols[&symbol.identifier]);
        }
        self.order.push(symbol.identifier.clone());
        self.symbols.insert(symbol.identifier.clone(), symbol);
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> Option<&Symbol> {
        self.symbols.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Symbols in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.order.iter().filter_map(|id| self.symbols.get(id))
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
        self.order.clear();
    }
}

/// State shared by project passes.
#[derive(Debug)]
pub struct Project {
    /// Successful documents, in input order
    pub documents: Vec<Document>,
    pub symbols: SymbolTable,
    /// Messages not tied to one document
    pub diagnostics: DiagnosticCollector,
}

impl Project {
    pub fn new(documents: Vec<Document>) -> Self {
        Project {
            documents,
            symbols: SymbolTable::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    pub fn document(&self, path: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.path == path)
    }
}

/// Whether a labelled node declares a project target. References, cites
/// and footnotes carry identifiers too, but only point at things.
pub fn is_target(node: &Node) -> bool {
    node.identifier.is_some()
        && !matches!(
            node.kind,
            NodeKind::CrossReference { .. }
                | NodeKind::Cite { .. }
                | NodeKind::CiteGroup { .. }
                | NodeKind::FootnoteReference
                | NodeKind::FootnoteDefinition
                | NodeKind::MystDirective { .. }
                | NodeKind::MystRole { .. }
        )
}

/// The target kind a node is referenced as, if it can be a target.
pub fn target_kind(node: &Node) -> TargetKind {
    match &node.kind {
        NodeKind::Heading { .. } => TargetKind::Heading,
        NodeKind::Container { kind, .. } => match kind {
            ContainerKind::Figure => TargetKind::Figure,
            ContainerKind::Table => TargetKind::Table,
            ContainerKind::Code => TargetKind::Code,
            ContainerKind::Quote => TargetKind::Other,
        },
        NodeKind::Math { .. } => TargetKind::Equation,
        NodeKind::Code { .. } => TargetKind::Code,
        NodeKind::Table => TargetKind::Table,
        _ => TargetKind::Other,
    }
}

/// Caption text of a container, or the text of a heading.
pub fn title_text(node: &Node) -> String {
    match &node.kind {
        NodeKind::Container { .. } => node
            .children
            .iter()
            .find(|c| c.kind == NodeKind::Caption)
            .map(|c| myst_ast::to_text(c).trim().to_string())
            .unwrap_or_default(),
        NodeKind::Math { .. } | NodeKind::Code { .. } => String::new(),
        _ => myst_ast::to_text(node).trim().to_string(),
    }
}
