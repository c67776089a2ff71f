/*
 * passes/citations.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Citation rendering.
 */

//! The `citations` pass.
//!
//! Cites are looked up in the session catalog, extended with the CSL-JSON
//! files the page lists under `bibliography`. Each cite gets author-year
//! text; parenthetical groups are enclosed in parentheses with `; `
//! between cites. Unknown keys are marked as errors on the node, show the
//! key, and produce a warning.
//!
//! Each document's `references` records the keys it cites, in order of
//! first use, and the sorted entries for its reference list.

use std::collections::HashMap;

use myst_ast::{CiteKind, Node, NodeKind};
use myst_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, rules};

use crate::citations::{CitationCatalog, CslItem};
use crate::document::Document;
use crate::error::PassError;
use crate::pipeline::ProjectPass;
use crate::project::Project;
use crate::session::{Session, resolve_relative};

pub struct CitationsPass;

impl ProjectPass for CitationsPass {
    fn name(&self) -> &str {
        "citations"
    }

    fn run(&self, project: &mut Project, session: &Session) -> Result<(), PassError> {
        let mut loaded: HashMap<String, Result<CitationCatalog, String>> = HashMap::new();

        for doc in &mut project.documents {
            if session.cancellation.is_cancelled() {
                return Err(PassError::Cancelled);
            }
            let mut catalog = (*session.citations).clone();
            for file in doc.frontmatter.bibliography.clone() {
                let path = resolve_relative(&doc.path, &file);
                let result = loaded
                    .entry(path.clone())
                    .or_insert_with(|| load_bibliography(session, &path));
                match result {
                    Ok(entries) => catalog.extend_missing(entries),
                    Err(problem) => doc.report(
                        DiagnosticMessageBuilder::warning("Bibliography not loaded")
                            .with_code(rules::CITATION_RENDERS)
                            .problem(problem.clone())
                            .build(),
                    ),
                }
            }
            render_document(doc, &catalog);
        }
        Ok(())
    }
}

fn load_bibliography(session: &Session, path: &str) -> Result<CitationCatalog, String> {
    if !path.ends_with(".json") {
        return Err(format!("`{path}` is not a CSL-JSON file"));
    }
    let text = session
        .loader
        .load(path)
        .map_err(|err| format!("Could not read `{path}`: {err}"))?;
    CitationCatalog::from_csl_json(&text).map_err(|err| format!("`{path}` is not valid CSL-JSON: {err}"))
}

fn render_document(doc: &mut Document, catalog: &CitationCatalog) {
    let mut state = RenderState {
        catalog,
        keys: Vec::new(),
        reports: Vec::new(),
    };
    state.render(&mut doc.root);

    let mut bibliography: Vec<CslItem> = state
        .keys
        .iter()
        .filter_map(|key| catalog.get(key).cloned())
        .collect();
    bibliography.sort_by_key(CslItem::sort_key);
    doc.references.citations = state.keys;
    doc.references.bibliography = bibliography;
    for report in state.reports {
        doc.report(report);
    }
}

struct RenderState<'c> {
    catalog: &'c CitationCatalog,
    keys: Vec<String>,
    reports: Vec<DiagnosticMessage>,
}

impl RenderState<'_> {
    fn render(&mut self, node: &mut Node) {
        match node.kind {
            NodeKind::CiteGroup { kind } => {
                for cite in &mut node.children {
                    self.render_cite(cite);
                }
                punctuate(node, kind);
            }
            NodeKind::Cite { .. } => self.render_cite(node),
            _ => {
                for child in &mut node.children {
                    self.render(child);
                }
            }
        }
    }

    fn render_cite(&mut self, node: &mut Node) {
        let NodeKind::Cite {
            key,
            kind,
            prefix,
            suffix,
            error,
        } = &mut node.kind
        else {
            return;
        };
        if !self.keys.contains(key) {
            self.keys.push(key.clone());
        }
        let text = match self.catalog.get(key) {
            Some(item) => {
                *error = false;
                let mut text = item.cite(*kind == CiteKind::Narrative);
                if let Some(prefix) = prefix.as_deref().filter(|p| !p.is_empty()) {
                    text = format!("{prefix} {text}");
                }
                if let Some(suffix) = suffix.as_deref().filter(|s| !s.is_empty()) {
                    text = format!("{text}, {suffix}");
                }
                text
            }
            None => {
                *error = true;
                self.reports.push(
                    DiagnosticMessageBuilder::warning("Citation not found")
                        .with_code(rules::CITATION_RENDERS)
                        .with_optional_location(node.position)
                        .problem(format!("No bibliography entry for `{key}`"))
                        .build(),
                );
                key.clone()
            }
        };
        node.children = vec![Node::text(text)];
    }
}

fn punctuate(group: &mut Node, kind: CiteKind) {
    let cites = std::mem::take(&mut group.children);
    let separator = match kind {
        CiteKind::Parenthetical => "; ",
        CiteKind::Narrative => ", ",
    };
    let mut out = Vec::with_capacity(cites.len() * 2 + 2);
    if kind == CiteKind::Parenthetical {
        out.push(Node::text("("));
    }
    for (i, cite) in cites.into_iter().enumerate() {
        if i > 0 {
            out.push(Node::text(separator));
        }
        out.push(cite);
    }
    if kind == CiteKind::Parenthetical {
        out.push(Node::text(")"));
    }
    group.children = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildOptions;
    use crate::session::MemoryLoader;
    use std::sync::Arc;

    const BIB: &str = r#"[
        {"id": "doe2020", "title": "On Things",
         "author": [{"family": "Doe", "given": "Jane"}],
         "issued": {"date-parts": [[2020]]}},
        {"id": "abe1999", "title": "Earlier",
         "author": [{"family": "Abe"}, {"family": "Bo"}],
         "issued": {"date-parts": [[1999]]}}
    ]"#;

    fn cite(key: &str, kind: CiteKind) -> Node {
        Node::new(NodeKind::Cite {
            key: key.into(),
            kind,
            prefix: None,
            suffix: None,
            error: false,
        })
    }

    fn group(kind: CiteKind, keys: &[&str]) -> Node {
        Node::with_children(
            NodeKind::CiteGroup { kind },
            keys.iter().map(|k| cite(k, kind)).collect(),
        )
    }

    fn project_with(children: Vec<Node>, bibliography: Vec<String>) -> Project {
        let mut doc = Document::new(0, "paper/main.md", "");
        doc.root = Node::root(vec![Node::paragraph(children)]);
        doc.frontmatter.bibliography = bibliography;
        Project::new(vec![doc])
    }

    #[test]
    fn test_renders_from_page_bibliography() {
        let loader = MemoryLoader::new().with_file("paper/refs.json", BIB);
        let session = Session::new(BuildOptions::default(), Arc::new(loader));
        let mut project = project_with(
            vec![
                group(CiteKind::Parenthetical, &["doe2020", "abe1999"]),
                Node::text(" and "),
                group(CiteKind::Narrative, &["doe2020"]),
            ],
            vec!["refs.json".into()],
        );
        CitationsPass.run(&mut project, &session).unwrap();

        let doc = &project.documents[0];
        assert_eq!(
            myst_ast::to_text(&doc.root),
            "(Doe, 2020; Abe & Bo, 1999) and Doe (2020)"
        );
        assert_eq!(doc.references.citations, vec!["doe2020", "abe1999"]);
        let order: Vec<&str> = doc.references.bibliography.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(order, vec!["abe1999", "doe2020"]);
        assert!(doc.diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_key_warns_and_shows_key() {
        let session = Session::new(BuildOptions::default(), Arc::new(MemoryLoader::new()))
            .with_citations(CitationCatalog::from_csl_json(BIB).unwrap());
        let mut project = project_with(vec![group(CiteKind::Narrative, &["nobody"])], Vec::new());
        CitationsPass.run(&mut project, &session).unwrap();

        let doc = &project.documents[0];
        let cite = &doc.root.children[0].children[0].children[0];
        assert!(matches!(cite.kind, NodeKind::Cite { error: true, .. }));
        assert_eq!(myst_ast::to_text(cite), "nobody");
        assert_eq!(doc.diagnostics.with_code(rules::CITATION_RENDERS).count(), 1);
        assert!(doc.references.bibliography.is_empty());
    }

    #[test]
    fn test_missing_bibliography_file_warns() {
        let session = Session::new(BuildOptions::default(), Arc::new(MemoryLoader::new()));
        let mut project = project_with(Vec::new(), vec!["refs.json".into(), "refs.bib".into()]);
        CitationsPass.run(&mut project, &session).unwrap();
        assert_eq!(
            project.documents[0]
                .diagnostics
                .with_code(rules::CITATION_RENDERS)
                .count(),
            2
        );
    }
}
