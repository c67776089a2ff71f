/*
 * passes/footnotes.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Footnote numbering.
 */

//! The `footnotes` pass.
//!
//! Footnotes are numbered per document in order of first reference;
//! definitions nobody references are numbered after the rest, in document
//! order. References get the enumerator of their definition.

use std::collections::HashMap;

use async_trait::async_trait;
use myst_ast::visit::{walk, walk_mut};
use myst_ast::{Node, NodeKind};
use myst_error_reporting::{DiagnosticMessageBuilder, rules};

use crate::document::Document;
use crate::error::PassError;
use crate::pipeline::DocumentPass;
use crate::session::Session;

pub struct FootnotesPass;

#[async_trait]
impl DocumentPass for FootnotesPass {
    fn name(&self) -> &str {
        "footnotes"
    }

    async fn run(&self, doc: &mut Document, _session: &Session) -> Result<(), PassError> {
        let mut definitions: Vec<String> = Vec::new();
        let mut references: Vec<(String, Option<myst_source_map::SourceInfo>)> = Vec::new();
        walk(&doc.root, &mut |node| match (&node.kind, &node.identifier) {
            (NodeKind::FootnoteDefinition, Some(id)) => definitions.push(id.clone()),
            (NodeKind::FootnoteReference, Some(id)) => references.push((id.clone(), node.position)),
            _ => {}
        });
        if definitions.is_empty() && references.is_empty() {
            return Ok(());
        }

        let mut numbers: HashMap<String, usize> = HashMap::new();
        let mut reports = Vec::new();
        for (id, position) in &references {
            if !definitions.contains(id) {
                reports.push(
                    DiagnosticMessageBuilder::warning("Footnote has no definition")
                        .with_code(rules::FOOTNOTE_TARGET_RESOLVES)
                        .with_optional_location(*position)
                        .problem(format!("No footnote is defined for `[^{id}]`"))
                        .build(),
                );
                continue;
            }
            let next = numbers.len() + 1;
            numbers.entry(id.clone()).or_insert(next);
        }
        for id in &definitions {
            let next = numbers.len() + 1;
            numbers.entry(id.clone()).or_insert(next);
        }

        walk_mut(&mut doc.root, &mut |node: &mut Node| {
            if matches!(
                node.kind,
                NodeKind::FootnoteDefinition | NodeKind::FootnoteReference
            ) && let Some(number) = node.identifier.as_ref().and_then(|id| numbers.get(id))
            {
                node.enumerator = Some(number.to_string());
            }
        });
        for report in reports {
            doc.report(report);
        }
        Ok(())
    }
}
