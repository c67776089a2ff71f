/*
 * passes/resolve.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Cross-reference resolution.
 */

//! The `resolve-references` pass.
//!
//! Once the symbol table is complete it is only read, and each document's
//! references are rewritten independently. Documents are split across
//! scoped threads, one chunk per worker.
//!
//! A reference that finds its target gets the target's kind, enumerator
//! and URL, and generated text when the author wrote none. A reference that
//! does not is left unresolved, shows its label, and produces a warning.

use myst_ast::visit::walk_mut;
use myst_ast::{Node, NodeKind, ReferenceStyle, TargetKind};
use myst_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, rules};

use crate::document::Document;
use crate::error::PassError;
use crate::pipeline::ProjectPass;
use crate::project::{Project, Symbol, SymbolTable};
use crate::session::Session;

pub struct ResolveReferencesPass;

impl ProjectPass for ResolveReferencesPass {
    fn name(&self) -> &str {
        "resolve-references"
    }

    fn run(&self, project: &mut Project, session: &Session) -> Result<(), PassError> {
        if project.documents.is_empty() {
            return Ok(());
        }
        let workers = session.options.worker_count().min(project.documents.len());
        let chunk = project.documents.len().div_ceil(workers);
        let symbols = &project.symbols;
        let cancellation = &session.cancellation;

        std::thread::scope(|scope| {
            for docs in project.documents.chunks_mut(chunk) {
                scope.spawn(move || {
                    for doc in docs {
                        if cancellation.is_cancelled() {
                            return;
                        }
                        resolve_document(doc, symbols);
                    }
                });
            }
        });

        if session.cancellation.is_cancelled() {
            return Err(PassError::Cancelled);
        }
        Ok(())
    }
}

fn resolve_document(doc: &mut Document, symbols: &SymbolTable) {
    let from = doc.index;
    let mut reports: Vec<DiagnosticMessage> = Vec::new();
    walk_mut(&mut doc.root, &mut |node: &mut Node| {
        let NodeKind::CrossReference { style, template, .. } = &node.kind else {
            return;
        };
        let (style, template) = (*style, template.clone());
        let Some(identifier) = node.identifier.clone() else {
            return;
        };

        let Some(symbol) = symbols.get(&identifier) else {
            reports.push(
                DiagnosticMessageBuilder::warning("Cross-reference target not found")
                    .with_code(rules::REFERENCE_TARGET_RESOLVES)
                    .with_optional_location(node.position)
                    .problem(format!("No target `{identifier}` exists in the project"))
                    .add_hint("Check the label, or add `(label)=` above the target")
                    .build(),
            );
            if let NodeKind::CrossReference { resolved, .. } = &mut node.kind {
                *resolved = false;
            }
            if node.children.is_empty() {
                let shown = node.label.clone().unwrap_or(identifier);
                node.children.push(Node::text(shown));
            }
            return;
        };

        if node.children.is_empty() {
            node.children
                .push(Node::text(reference_text(style, template.as_deref(), symbol)));
        }
        node.enumerator = symbol.enumerator.clone();
        if let NodeKind::CrossReference {
            target_kind,
            url,
            resolved,
            ..
        } = &mut node.kind
        {
            *target_kind = Some(symbol.kind);
            *url = Some(symbol.url_from(from));
            *resolved = true;
        }
    });
    for report in reports {
        doc.report(report);
    }
}

fn kind_name(kind: TargetKind) -> Option<&'static str> {
    match kind {
        TargetKind::Heading => Some("Section"),
        TargetKind::Figure => Some("Figure"),
        TargetKind::Table => Some("Table"),
        TargetKind::Code => Some("Program"),
        TargetKind::Equation => Some("Equation"),
        TargetKind::Other => None,
    }
}

/// Text generated for a reference with no text of its own.
pub fn reference_text(style: ReferenceStyle, template: Option<&str>, symbol: &Symbol) -> String {
    let fallback = || {
        if symbol.title.is_empty() {
            symbol.identifier.clone()
        } else {
            symbol.title.clone()
        }
    };
    let Some(number) = symbol.enumerator.as_deref() else {
        return fallback();
    };
    match style {
        ReferenceStyle::Eq => format!("({number})"),
        ReferenceStyle::Numref => {
            let template = template
                .map(str::to_string)
                .or_else(|| symbol.reference_template.clone())
                .or_else(|| kind_name(symbol.kind).map(|name| format!("{name} %s")))
                .unwrap_or_else(|| "%s".to_string());
            template
                .replace("%s", number)
                .replace("{number}", number)
                .replace("{name}", &symbol.title)
        }
        ReferenceStyle::Ref | ReferenceStyle::Link => {
            match (&symbol.reference_template, kind_name(symbol.kind)) {
                (Some(template), _) => template.replace("%s", number),
                (None, Some(name)) => format!("{name} {number}"),
                (None, None) => fallback(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildOptions;
    use crate::session::MemoryLoader;
    use std::sync::Arc;

    fn symbol(kind: TargetKind, enumerator: Option<&str>, title: &str) -> Symbol {
        Symbol {
            identifier: "target".into(),
            file: 0,
            path: "a.md".into(),
            slug: "a".into(),
            kind,
            enumerator: enumerator.map(str::to_string),
            title: title.into(),
            html_id: Some("target".into()),
            reference_template: None,
        }
    }

    fn reference(style: ReferenceStyle, label: &str) -> Node {
        Node::new(NodeKind::CrossReference {
            style,
            template: None,
            target_kind: None,
            url: None,
            resolved: false,
        })
        .labelled(label)
    }

    #[test]
    fn test_reference_text() {
        let figure = symbol(TargetKind::Figure, Some("2"), "A plot");
        assert_eq!(reference_text(ReferenceStyle::Ref, None, &figure), "Figure 2");
        assert_eq!(reference_text(ReferenceStyle::Eq, None, &figure), "(2)");
        assert_eq!(
            reference_text(ReferenceStyle::Numref, Some("Fig. {number}: {name}"), &figure),
            "Fig. 2: A plot"
        );
        assert_eq!(reference_text(ReferenceStyle::Numref, None, &figure), "Figure 2");

        let section = symbol(TargetKind::Heading, None, "Methods");
        assert_eq!(reference_text(ReferenceStyle::Ref, None, &section), "Methods");

        let mut custom = symbol(TargetKind::Figure, Some("3"), "");
        custom.reference_template = Some("Fig. %s".into());
        assert_eq!(reference_text(ReferenceStyle::Ref, None, &custom), "Fig. 3");
    }

    #[test]
    fn test_resolves_across_documents() {
        let mut a = Document::new(0, "a.md", "");
        a.root = Node::root(Vec::new());
        let mut b = Document::new(1, "b.md", "");
        b.root = Node::root(vec![
            Node::paragraph(vec![reference(ReferenceStyle::Ref, "target")]),
            Node::paragraph(vec![reference(ReferenceStyle::Ref, "missing")]),
        ]);
        let mut project = Project::new(vec![a, b]);
        project
            .symbols
            .insert(symbol(TargetKind::Figure, Some("1"), ""))
            .unwrap();

        let session = Session::new(
            BuildOptions {
                workers: 2,
                ..BuildOptions::default()
            },
            Arc::new(MemoryLoader::new()),
        );
        ResolveReferencesPass.run(&mut project, &session).unwrap();

        let b = &project.documents[1];
        let hit = &b.root.children[0].children[0];
        assert_eq!(myst_ast::to_text(hit), "Figure 1");
        assert!(matches!(
            &hit.kind,
            NodeKind::CrossReference { resolved: true, url: Some(url), target_kind: Some(TargetKind::Figure), .. }
                if url == "a#target"
        ));
        let miss = &b.root.children[1].children[0];
        assert_eq!(myst_ast::to_text(miss), "missing");
        assert!(matches!(&miss.kind, NodeKind::CrossReference { resolved: false, .. }));
        assert_eq!(
            b.diagnostics.with_code(rules::REFERENCE_TARGET_RESOLVES).count(),
            1
        );
        assert!(project.documents[0].diagnostics.is_empty());
    }
}
