/*
 * passes/include.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Expansion of `include` nodes.
 */

//! The `include` pass.
//!
//! Each `include` node is replaced by the content of the file it names,
//! read through the session's source loader relative to the including
//! file. Markdown content is parsed with the session registry and expanded
//! recursively; literal includes become a code block. Included nodes take
//! the position of the include directive, since their own offsets refer to
//! a file that is not part of the build.
//!
//! A missing file, an include cycle or a chain deeper than the configured
//! limit is fatal for the including document.

use async_trait::async_trait;
use myst_ast::visit::{splice, walk_mut};
use myst_ast::{Node, NodeKind};
use myst_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, rules};
use myst_source_map::SourceInfo;

use crate::document::Document;
use crate::error::PassError;
use crate::pipeline::DocumentPass;
use crate::session::{Session, resolve_relative};

pub struct IncludePass;

#[async_trait]
impl DocumentPass for IncludePass {
    fn name(&self) -> &str {
        "include"
    }

    async fn run(&self, doc: &mut Document, session: &Session) -> Result<(), PassError> {
        let mut expander = Expander {
            session,
            stack: vec![doc.path.clone()],
            diagnostics: Vec::new(),
            error: None,
        };
        expander.expand(&mut doc.root, &doc.path.clone());
        for diagnostic in expander.diagnostics {
            doc.report(diagnostic);
        }
        match expander.error {
            Some(error) => Err(PassError::fatal(error)),
            None => Ok(()),
        }
    }
}

struct Expander<'s> {
    session: &'s Session,
    /// Files currently being expanded, outermost first
    stack: Vec<String>,
    diagnostics: Vec<DiagnosticMessage>,
    error: Option<DiagnosticMessage>,
}

impl Expander<'_> {
    fn expand(&mut self, root: &mut Node, from: &str) {
        splice(root, &mut |node| {
            if self.error.is_some() {
                return vec![node];
            }
            match &node.kind {
                NodeKind::Include { .. } => self.include(node, from),
                _ => vec![node],
            }
        });
    }

    fn include(&mut self, node: Node, from: &str) -> Vec<Node> {
        let NodeKind::Include {
            file,
            literal,
            lang,
            start_line,
            end_line,
        } = &node.kind
        else {
            return vec![node];
        };
        let path = resolve_relative(from, file);
        let position = node.position;

        if self.stack.contains(&path) {
            let chain = self.stack.join(" -> ");
            self.error = Some(
                DiagnosticMessageBuilder::error("Include cycle")
                    .with_code(rules::INCLUDE_CYCLE)
                    .with_optional_location(position)
                    .problem(format!("`{path}` includes itself through {chain}"))
                    .build(),
            );
            return Vec::new();
        }
        let limit = self.session.options.include_depth_limit;
        if self.stack.len() > limit {
            self.error = Some(
                DiagnosticMessageBuilder::error("Includes nested too deeply")
                    .with_code(rules::INCLUDE_CYCLE)
                    .with_optional_location(position)
                    .problem(format!("Include chains are limited to {limit} files"))
                    .build(),
            );
            return Vec::new();
        }

        let content = match self.session.loader.load(&path) {
            Ok(content) => content,
            Err(err) => {
                self.error = Some(
                    DiagnosticMessageBuilder::error("Included file not found")
                        .with_code(rules::INCLUDE_FILE_EXISTS)
                        .with_optional_location(position)
                        .problem(format!("Could not read `{path}`: {err}"))
                        .build(),
                );
                return Vec::new();
            }
        };
        let content = select_lines(&content, *start_line, *end_line);
        tracing::debug!(file = %path, literal = *literal, "including file");

        if *literal {
            let code = Node::new(NodeKind::Code {
                lang: lang.clone(),
                meta: None,
                value: content.trim_end_matches('\n').to_string(),
                executable: false,
                show_line_numbers: false,
            })
            .at_opt(position);
            return vec![code];
        }

        let parsed = myst_parser::parse_document(&content, &self.session.registry, node_file(&node));
        let mut root = parsed.root;
        for mut diagnostic in parsed.diagnostics {
            diagnostic.location = position;
            self.diagnostics.push(diagnostic);
        }
        self.stack.push(path.clone());
        self.expand(&mut root, &path);
        self.stack.pop();
        relocate(&mut root, position);
        root.children
    }
}

fn node_file(node: &Node) -> myst_source_map::FileId {
    node.position
        .map(|p| p.file_id)
        .unwrap_or(myst_source_map::FileId(0))
}

/// Keep lines `start..=end`, 1-based and inclusive; either bound may be
/// absent.
fn select_lines(content: &str, start: Option<usize>, end: Option<usize>) -> String {
    if start.is_none() && end.is_none() {
        return content.to_string();
    }
    let start = start.unwrap_or(1).max(1);
    let mut out = String::new();
    for (i, line) in content.lines().enumerate() {
        let number = i + 1;
        if number < start {
            continue;
        }
        if end.is_some_and(|end| number > end) {
            break;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Give every node of the subtree the include directive's position.
fn relocate(root: &mut Node, position: Option<SourceInfo>) {
    walk_mut(root, &mut |node| node.position = position);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildOptions;
    use crate::session::MemoryLoader;
    use std::sync::Arc;

    fn include(file: &str, literal: bool) -> Node {
        Node::new(NodeKind::Include {
            file: file.into(),
            literal,
            lang: literal.then(|| "python".to_string()),
            start_line: None,
            end_line: None,
        })
    }

    fn session(loader: MemoryLoader) -> Session {
        Session::new(BuildOptions::default(), Arc::new(loader))
    }

    fn doc(path: &str, children: Vec<Node>) -> Document {
        let mut doc = Document::new(0, path, "");
        doc.root = Node::root(children);
        doc
    }

    #[test]
    fn test_select_lines() {
        let text = "a\nb\nc\nd\n";
        assert_eq!(select_lines(text, Some(2), Some(3)), "b\nc\n");
        assert_eq!(select_lines(text, None, Some(1)), "a\n");
        assert_eq!(select_lines(text, Some(4), None), "d\n");
        assert_eq!(select_lines(text, None, None), text);
    }

    #[tokio::test]
    async fn test_markdown_include_is_parsed_in_place() {
        let loader = MemoryLoader::new().with_file("chapters/part.md", "Included *text*.\n");
        let session = session(loader);
        let mut doc = doc(
            "chapters/main.md",
            vec![Node::text("before"), include("part.md", false), Node::text("after")],
        );
        IncludePass.run(&mut doc, &session).await.unwrap();
        let kinds: Vec<&str> = doc.root.children.iter().map(Node::type_name).collect();
        assert_eq!(kinds, vec!["text", "paragraph", "text"]);
        assert_eq!(myst_ast::to_text(&doc.root.children[1]), "Included text.");
    }

    #[tokio::test]
    async fn test_nested_includes_resolve_relative_to_includer() {
        let loader = MemoryLoader::new()
            .with_file("a/one.md", "```{include} ../b/two.md\n```\n")
            .with_file("b/two.md", "Deep.\n");
        let session = session(loader);
        let mut doc = doc("main.md", vec![include("a/one.md", false)]);
        IncludePass.run(&mut doc, &session).await.unwrap();
        assert_eq!(myst_ast::to_text(&doc.root), "Deep.");
    }

    #[tokio::test]
    async fn test_literal_include() {
        let loader = MemoryLoader::new().with_file("script.py", "print(1)\n");
        let session = session(loader);
        let mut doc = doc("main.md", vec![include("script.py", true)]);
        IncludePass.run(&mut doc, &session).await.unwrap();
        assert_eq!(
            doc.root.children[0].kind,
            NodeKind::Code {
                lang: Some("python".into()),
                meta: None,
                value: "print(1)".into(),
                executable: false,
                show_line_numbers: false,
            }
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let session = session(MemoryLoader::new());
        let mut doc = doc("main.md", vec![include("nope.md", false)]);
        let err = IncludePass.run(&mut doc, &session).await.unwrap_err();
        match err {
            PassError::Fatal(d) => assert!(d.has_code(rules::INCLUDE_FILE_EXISTS)),
            PassError::Cancelled => panic!("expected fatal"),
        }
    }

    #[tokio::test]
    async fn test_cycle_is_fatal() {
        let loader = MemoryLoader::new()
            .with_file("a.md", "```{include} b.md\n```\n")
            .with_file("b.md", "```{include} a.md\n```\n");
        let session = session(loader);
        let mut doc = doc("main.md", vec![include("a.md", false)]);
        let err = IncludePass.run(&mut doc, &session).await.unwrap_err();
        match err {
            PassError::Fatal(d) => assert!(d.has_code(rules::INCLUDE_CYCLE)),
            PassError::Cancelled => panic!("expected fatal"),
        }
    }
}
