/*
 * passes/enumerate.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Enumerator assignment and symbol collection.
 */

//! The `enumerate` pass.
//!
//! Walks every document in input order, and each document in reading order,
//! assigning enumerators to the nodes the `targets` pass marked as
//! enumerated. Each kind has its own counter. A counter runs across the
//! whole project unless the kind's policy restarts it per file or per
//! top-level section. Headings are numbered hierarchically (`2.1.3`).
//!
//! Every target is entered into the project symbol table. When two nodes
//! declare the same identifier the first one in this traversal wins; each
//! later one is reported once, on its own document.

use std::collections::HashMap;

use myst_ast::visit::walk_mut;
use myst_ast::{Node, NodeKind, TargetKind};
use myst_error_reporting::{DiagnosticMessageBuilder, rules};
use myst_frontmatter::{Numbering, NumberingPolicy, NumberingScope};
use myst_source_map::SourceInfo;

use crate::error::PassError;
use crate::pipeline::ProjectPass;
use crate::project::{Project, Symbol, is_target, target_kind, title_text};
use crate::session::Session;

const HEADING_LEVELS: usize = 6;

pub struct EnumeratePass;

impl ProjectPass for EnumeratePass {
    fn name(&self) -> &str {
        "enumerate"
    }

    fn run(&self, project: &mut Project, session: &Session) -> Result<(), PassError> {
        project.symbols.clear();
        let mut counters = Counters::default();

        for doc in &mut project.documents {
            if session.cancellation.is_cancelled() {
                return Err(PassError::Cancelled);
            }
            let numbering = doc.frontmatter.numbering.clone();
            counters.start_file(&numbering);

            let mut found: Vec<(Symbol, Option<SourceInfo>)> = Vec::new();
            let (index, path, slug) = (doc.index, doc.path.clone(), doc.slug().to_string());
            walk_mut(&mut doc.root, &mut |node: &mut Node| {
                if let NodeKind::Heading { depth } = node.kind
                    && depth == 1
                {
                    counters.start_section(&numbering);
                }
                if node.enumerated == Some(true) {
                    node.enumerator = counters.next(node, &numbering);
                }
                if is_target(node)
                    && let Some(identifier) = &node.identifier
                {
                    let kind = target_kind(node);
                    found.push((
                        Symbol {
                            identifier: identifier.clone(),
                            file: index,
                            path: path.clone(),
                            slug: slug.clone(),
                            kind,
                            enumerator: node.enumerator.clone(),
                            title: title_text(node),
                            html_id: node.html_id.clone(),
                            reference_template: numbering.policy(kind).reference.clone(),
                        },
                        node.position,
                    ));
                }
            });

            for (symbol, position) in found {
                let identifier = symbol.identifier.clone();
                if let Err(existing) = project.symbols.insert(symbol) {
                    let first = existing.path.clone();
                    doc.report(
                        DiagnosticMessageBuilder::warning("Duplicate identifier")
                            .with_code(rules::IDENTIFIER_IS_UNIQUE)
                            .with_optional_location(position)
                            .problem(format!("`{identifier}` is already declared in `{first}`"))
                            .add_hint("References to it resolve to the first declaration")
                            .build(),
                    );
                }
            }
        }
        tracing::debug!(symbols = project.symbols.len(), "collected project symbols");
        Ok(())
    }
}

/// Running counters for one traversal of the project.
#[derive(Debug, Default)]
struct Counters {
    /// Items seen per kind since the kind's last restart
    seen: HashMap<TargetKind, u32>,
    /// Current number per heading level, `None` until a heading of that
    /// level appears under the current parent
    headings: [Option<u32>; HEADING_LEVELS],
    /// Top-level headings seen so far in the project
    chapter: u32,
}

impl Counters {
    fn start_file(&mut self, numbering: &Numbering) {
        for kind in TargetKind::NUMBERED {
            if numbering.policy(kind).scope == NumberingScope::File {
                self.restart(kind);
            }
        }
    }

    fn start_section(&mut self, numbering: &Numbering) {
        self.chapter = self.chapter.saturating_add(1);
        for kind in TargetKind::NUMBERED {
            if kind != TargetKind::Heading && numbering.policy(kind).scope == NumberingScope::Section {
                self.restart(kind);
            }
        }
    }

    fn restart(&mut self, kind: TargetKind) {
        if kind == TargetKind::Heading {
            self.headings = [None; HEADING_LEVELS];
        } else {
            self.seen.remove(&kind);
        }
    }

    fn next(&mut self, node: &Node, numbering: &Numbering) -> Option<String> {
        let kind = target_kind(node);
        let policy = numbering.policy(kind);
        if !policy.enabled {
            return None;
        }
        if let NodeKind::Heading { depth } = node.kind {
            return Some(self.next_heading(depth, policy));
        }
        let seen = self.seen.entry(kind).or_insert(0);
        let value = policy.start.saturating_add(*seen);
        *seen = seen.saturating_add(1);
        Some(match policy.scope {
            NumberingScope::Section if policy.template.is_none() => {
                format!("{}.{value}", self.chapter)
            }
            NumberingScope::Section => policy.format(&[self.chapter, value]),
            NumberingScope::Project | NumberingScope::File => policy.format(&[value]),
        })
    }

    fn next_heading(&mut self, depth: u8, policy: &NumberingPolicy) -> String {
        let level = (depth as usize).clamp(1, HEADING_LEVELS) - 1;
        self.headings[level] = Some(match self.headings[level] {
            Some(n) => n.saturating_add(1),
            None => policy.start,
        });
        for deeper in &mut self.headings[level + 1..] {
            *deeper = None;
        }
        // levels above the first heading seen are left out; skipped inner
        // levels print as 0
        let parts: Vec<u32> = self.headings[..=level]
            .iter()
            .skip_while(|n| n.is_none())
            .map(|n| n.unwrap_or(0))
            .collect();
        match &policy.template {
            Some(_) => policy.format(&parts),
            None => parts
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::options::BuildOptions;
    use crate::session::MemoryLoader;
    use myst_ast::ContainerKind;
    use std::sync::Arc;

    fn figure(label: Option<&str>) -> Node {
        let mut node = Node::new(NodeKind::Container {
            kind: ContainerKind::Figure,
            class: None,
        });
        if let Some(label) = label {
            node.set_label(label);
        }
        node.enumerated = Some(true);
        node
    }

    fn heading(depth: u8, text: &str) -> Node {
        let mut node = Node::with_children(NodeKind::Heading { depth }, vec![Node::text(text)]);
        node.enumerated = Some(true);
        node
    }

    fn doc(index: usize, children: Vec<Node>) -> Document {
        let mut doc = Document::new(index, format!("f{index}.md"), "");
        doc.root = Node::root(children);
        doc
    }

    fn session() -> Session {
        Session::new(BuildOptions::default(), Arc::new(MemoryLoader::new()))
    }

    fn enumerators(doc: &Document) -> Vec<Option<&str>> {
        doc.root
            .children
            .iter()
            .map(|n| n.enumerator.as_deref())
            .collect()
    }

    #[test]
    fn test_project_scope_continues_across_files() {
        let mut project = Project::new(vec![
            doc(0, vec![figure(Some("a")), figure(None)]),
            doc(1, vec![figure(Some("b"))]),
        ]);
        EnumeratePass.run(&mut project, &session()).unwrap();
        assert_eq!(enumerators(&project.documents[0]), vec![Some("1"), Some("2")]);
        assert_eq!(enumerators(&project.documents[1]), vec![Some("3")]);
        assert_eq!(project.symbols.get("b").unwrap().enumerator.as_deref(), Some("3"));
        assert_eq!(project.symbols.len(), 2);
    }

    #[test]
    fn test_file_scope_restarts() {
        let mut docs = vec![doc(0, vec![figure(None)]), doc(1, vec![figure(None)])];
        for d in &mut docs {
            d.frontmatter.numbering.figure.scope = NumberingScope::File;
        }
        let mut project = Project::new(docs);
        EnumeratePass.run(&mut project, &session()).unwrap();
        assert_eq!(enumerators(&project.documents[1]), vec![Some("1")]);
    }

    #[test]
    fn test_section_scope_is_chaptered() {
        let mut d = doc(
            0,
            vec![
                heading(1, "One"),
                figure(None),
                heading(1, "Two"),
                figure(None),
                figure(None),
            ],
        );
        d.frontmatter.numbering.figure.scope = NumberingScope::Section;
        let mut project = Project::new(vec![d]);
        EnumeratePass.run(&mut project, &session()).unwrap();
        let figures: Vec<Option<&str>> = enumerators(&project.documents[0])
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i % 2 == 1 || *i == 4)
            .map(|(_, e)| e)
            .collect();
        assert_eq!(figures, vec![Some("1.1"), Some("2.1"), Some("2.2")]);
    }

    #[test]
    fn test_hierarchical_headings() {
        let mut d = doc(
            0,
            vec![
                heading(1, "A"),
                heading(2, "A.1"),
                heading(2, "A.2"),
                heading(1, "B"),
                heading(3, "B.0.1"),
            ],
        );
        d.frontmatter.numbering.heading = NumberingPolicy::enabled();
        let mut project = Project::new(vec![d]);
        EnumeratePass.run(&mut project, &session()).unwrap();
        assert_eq!(
            enumerators(&project.documents[0]),
            vec![Some("1"), Some("1.1"), Some("1.2"), Some("2"), Some("2.0.1")]
        );
    }

    #[test]
    fn test_start_and_template() {
        let mut d = doc(0, vec![figure(None), figure(None)]);
        d.frontmatter.numbering.figure.start = 5;
        d.frontmatter.numbering.figure.template = Some("S%s".into());
        let mut project = Project::new(vec![d]);
        EnumeratePass.run(&mut project, &session()).unwrap();
        assert_eq!(enumerators(&project.documents[0]), vec![Some("S5"), Some("S6")]);
    }

    #[test]
    fn test_heading_start_zero() {
        let mut d = doc(
            0,
            vec![
                heading(2, "Zero"),
                heading(2, "One"),
                heading(3, "One.Zero"),
                heading(2, "Two"),
            ],
        );
        d.frontmatter.numbering.heading = NumberingPolicy::enabled();
        d.frontmatter.numbering.heading.start = 0;
        let mut project = Project::new(vec![d]);
        EnumeratePass.run(&mut project, &session()).unwrap();
        assert_eq!(
            enumerators(&project.documents[0]),
            vec![Some("0"), Some("1"), Some("1.0"), Some("2")]
        );
    }

    #[test]
    fn test_start_near_max_saturates() {
        let mut d = doc(0, vec![figure(None), figure(None), figure(None)]);
        d.frontmatter.numbering.figure.start = u32::MAX - 1;
        let mut project = Project::new(vec![d]);
        EnumeratePass.run(&mut project, &session()).unwrap();
        let max = u32::MAX.to_string();
        let below = (u32::MAX - 1).to_string();
        assert_eq!(
            enumerators(&project.documents[0]),
            vec![Some(below.as_str()), Some(max.as_str()), Some(max.as_str())]
        );
    }

    #[test]
    fn test_duplicate_identifier_first_wins() {
        let mut project = Project::new(vec![
            doc(0, vec![figure(Some("dup"))]),
            doc(1, vec![figure(Some("dup")), figure(Some("dup"))]),
        ]);
        EnumeratePass.run(&mut project, &session()).unwrap();
        assert_eq!(project.symbols.get("dup").unwrap().file, 0);
        assert!(project.documents[0].diagnostics.is_empty());
        assert_eq!(
            project.documents[1]
                .diagnostics
                .with_code(rules::IDENTIFIER_IS_UNIQUE)
                .count(),
            2
        );
        assert!(!project.documents[1].diagnostics.has_errors());
    }

    #[test]
    fn test_unnumbered_targets_have_no_enumerator() {
        let mut project = Project::new(vec![doc(
            0,
            vec![Node::paragraph(vec![Node::text("x")]).labelled("para")],
        )]);
        EnumeratePass.run(&mut project, &session()).unwrap();
        let symbol = project.symbols.get("para").unwrap();
        assert_eq!(symbol.kind, TargetKind::Other);
        assert_eq!(symbol.enumerator, None);
    }
}
