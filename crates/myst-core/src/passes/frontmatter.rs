/*
 * passes/frontmatter.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Frontmatter inheritance and title lifting.
 */

use async_trait::async_trait;
use myst_ast::{Node, NodeKind, to_text};
use myst_error_reporting::{DiagnosticMessageBuilder, rules};
use myst_frontmatter::{Frontmatter, merge_frontmatter};

use crate::document::Document;
use crate::error::PassError;
use crate::pipeline::DocumentPass;
use crate::session::Session;

/// Merges project frontmatter into the page, then takes the title from a
/// leading level-1 heading when the page has none.
pub struct FrontmatterPass;

#[async_trait]
impl DocumentPass for FrontmatterPass {
    fn name(&self) -> &str {
        "frontmatter"
    }

    async fn run(&self, doc: &mut Document, session: &Session) -> Result<(), PassError> {
        let merged = merge_frontmatter(&session.project_frontmatter, &doc.page_frontmatter);
        doc.frontmatter = match Frontmatter::from_value(merged) {
            Ok(frontmatter) => frontmatter,
            Err(err) => {
                doc.report(
                    DiagnosticMessageBuilder::warning("Invalid frontmatter")
                        .with_code(rules::FRONTMATTER_VALID)
                        .with_optional_location(doc.root.position)
                        .problem(err.to_string())
                        .add_hint("Only the project frontmatter applies to this page")
                        .build(),
                );
                Frontmatter::from_value(session.project_frontmatter.clone()).unwrap_or_default()
            }
        };
        if doc.frontmatter.title.is_none() {
            if let Some(title) = lift_title(&mut doc.root) {
                doc.frontmatter.title = Some(title);
            }
        }
        Ok(())
    }
}

/// Remove a level-1 heading that opens the document and return its text.
///
/// Comments before the heading are skipped; any other content means the
/// document has no leading title.
fn lift_title(root: &mut Node) -> Option<String> {
    let mut container = root;
    loop {
        let index = container
            .children
            .iter()
            .position(|c| !matches!(c.kind, NodeKind::Comment { .. }))?;
        match container.children[index].kind {
            NodeKind::Heading { depth: 1 } if container.children[index].identifier.is_none() => {
                let heading = container.children.remove(index);
                return Some(to_text(&heading).trim().to_string());
            }
            NodeKind::Block { .. } => container = &mut container.children[index],
            _ => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildOptions;
    use crate::session::MemoryLoader;
    use serde_json::json;
    use std::sync::Arc;

    fn doc_with(source_root: Node, page: serde_json::Value) -> Document {
        let mut doc = Document::new(0, "a.md", "");
        doc.root = source_root;
        doc.page_frontmatter = page;
        doc
    }

    fn session(project: serde_json::Value) -> Session {
        Session::new(BuildOptions::default(), Arc::new(MemoryLoader::new()))
            .with_project_frontmatter(project)
    }

    fn heading(depth: u8, text: &str) -> Node {
        Node::with_children(NodeKind::Heading { depth }, vec![Node::text(text)])
    }

    #[tokio::test]
    async fn test_inherits_and_overrides() {
        let session = session(json!({"title": "Book", "authors": ["Ada"], "license": "CC-BY-4.0"}));
        let mut doc = doc_with(Node::root(vec![]), json!({"title": "Chapter", "authors": ["Grace"]}));
        FrontmatterPass.run(&mut doc, &session).await.unwrap();
        assert_eq!(doc.frontmatter.title.as_deref(), Some("Chapter"));
        let names: Vec<&str> = doc.frontmatter.authors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Grace"]);
        assert!(doc.frontmatter.license.is_some());
    }

    #[tokio::test]
    async fn test_lifts_leading_heading() {
        let session = session(json!({}));
        let root = Node::root(vec![
            Node::new(NodeKind::Comment { value: "x".into() }),
            heading(1, "The Title"),
            Node::paragraph(vec![Node::text("body")]),
        ]);
        let mut doc = doc_with(root, json!({}));
        FrontmatterPass.run(&mut doc, &session).await.unwrap();
        assert_eq!(doc.title(), Some("The Title"));
        assert_eq!(doc.root.children.len(), 2);
    }

    #[tokio::test]
    async fn test_keeps_heading_when_title_set_or_not_leading() {
        let session = session(json!({}));
        let mut doc = doc_with(Node::root(vec![heading(1, "Heading")]), json!({"title": "Set"}));
        FrontmatterPass.run(&mut doc, &session).await.unwrap();
        assert_eq!(doc.root.children.len(), 1);

        let root = Node::root(vec![Node::paragraph(vec![Node::text("intro")]), heading(1, "Late")]);
        let mut doc = doc_with(root, json!({}));
        FrontmatterPass.run(&mut doc, &session).await.unwrap();
        assert_eq!(doc.title(), None);
        assert_eq!(doc.root.children.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_page_frontmatter_warns() {
        let session = session(json!({"title": "Book"}));
        let mut doc = doc_with(Node::root(vec![]), json!({"numbering": "sometimes"}));
        FrontmatterPass.run(&mut doc, &session).await.unwrap();
        assert_eq!(doc.diagnostics.len(), 1);
        assert!(doc.diagnostics.diagnostics()[0].has_code(rules::FRONTMATTER_VALID));
        assert_eq!(doc.title(), Some("Book"));
    }
}
