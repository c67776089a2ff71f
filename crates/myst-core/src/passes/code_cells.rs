/*
 * passes/code_cells.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Execution step for notebook code cells.
 */

//! The `code-cells` pass.
//!
//! Finds every notebook-code block (a `code` node followed by an `outputs`
//! node) and fills its outputs, from the execution cache when an entry for
//! the cell exists and from the session's executor otherwise. Execution
//! happens only when the build asks for it and the page has not opted out.
//!
//! Kernel failures and timeouts are reported on the document and leave the
//! cell's outputs untouched; they never stop the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use myst_ast::{Node, NodeKind, OutputsPayload};
use myst_error_reporting::{DiagnosticMessageBuilder, rules};
use myst_extensions::directives::NOTEBOOK_CODE;

use crate::cache::{CacheKey, ExecutionFingerprint};
use crate::document::Document;
use crate::error::PassError;
use crate::execute::{CellRequest, ExecutionError, outputs_node};
use crate::observer::EventLevel;
use crate::pipeline::DocumentPass;
use crate::session::Session;
use crate::trace_event;

const DEFAULT_KERNEL: &str = "python3";

pub struct CodeCellsPass;

#[async_trait]
impl DocumentPass for CodeCellsPass {
    fn name(&self) -> &str {
        "code-cells"
    }

    async fn run(&self, doc: &mut Document, session: &Session) -> Result<(), PassError> {
        let policy = doc.frontmatter.execution.clone();
        if !session.options.execute || !policy.enabled {
            return Ok(());
        }

        let kernelspec = doc.frontmatter.kernelspec.as_ref().map(|k| k.name.clone());
        let timeout = policy
            .timeout
            .map(Duration::from_secs)
            .unwrap_or_else(|| session.options.timeout());
        let fingerprint = ExecutionFingerprint {
            allow_errors: policy.allow_errors,
            timeout_secs: timeout.as_secs(),
        };
        // forced runs skip the lookup but still refresh the entry
        let read_cache = policy.cache && !session.options.force_execute;
        let write_cache = policy.cache;
        let path = doc.path.clone();

        let mut cells = Vec::new();
        collect_cells(&mut doc.root, &mut cells);
        if cells.is_empty() {
            return Ok(());
        }
        trace_event!(session, EventLevel::Debug, "Executing {} cells in {}", cells.len(), path);

        let mut reports = Vec::new();
        for cell in cells {
            if session.cancellation.is_cancelled() {
                return Err(PassError::Cancelled);
            }
            let Some((source, lang)) = cell_source(cell) else {
                continue;
            };
            let kernel = kernelspec
                .clone()
                .or(lang)
                .unwrap_or_else(|| DEFAULT_KERNEL.to_string());
            let key = CacheKey::for_cell(&source, &kernel, &fingerprint);
            let position = cell.position;

            if read_cache && let Some(cache) = &session.cache {
                match cache.get(&key) {
                    Ok(Some(outputs)) => {
                        tracing::debug!(file = %path, key = %key, "execution cache hit");
                        replace_outputs(cell, outputs);
                        continue;
                    }
                    Ok(None) => {}
                    Err(err) => reports.push(
                        DiagnosticMessageBuilder::warning("Unreadable execution cache entry")
                            .with_code(rules::EXECUTION_CACHE)
                            .with_optional_location(position)
                            .problem(format!("Entry `{key}` could not be read: {err}"))
                            .add_hint("The cell is executed again and the entry replaced")
                            .build(),
                    ),
                }
            }

            let Some(executor) = &session.executor else {
                tracing::debug!(file = %path, "no executor configured, outputs left as is");
                continue;
            };
            let request = CellRequest {
                source,
                kernel: kernel.clone(),
                document: path.clone(),
            };
            let result = match tokio::time::timeout(timeout, executor.execute(&request)).await {
                Ok(result) => result,
                Err(_) => Err(ExecutionError::Timeout(timeout)),
            };
            let payloads = match result {
                Ok(payloads) => payloads,
                Err(err) => {
                    reports.push(
                        DiagnosticMessageBuilder::warning("Code cell did not run")
                            .with_code(rules::EXECUTION_FAILED)
                            .with_optional_location(position)
                            .problem(err.to_string())
                            .build(),
                    );
                    continue;
                }
            };

            if !policy.allow_errors
                && let Some(evalue) = payloads.iter().find_map(|p| match p {
                    OutputsPayload::Error { ename, evalue, .. } => Some(format!("{ename}: {evalue}")),
                    _ => None,
                })
            {
                reports.push(
                    DiagnosticMessageBuilder::error("Code cell raised an error")
                        .with_code(rules::EXECUTION_FAILED)
                        .with_optional_location(position)
                        .problem(evalue)
                        .add_hint("Set `execution.allow_errors: true` to keep going")
                        .build(),
                );
            }

            let outputs = match outputs_node(&payloads) {
                Ok(outputs) => outputs,
                Err(err) => {
                    reports.push(
                        DiagnosticMessageBuilder::warning("Code cell outputs are not valid")
                            .with_code(rules::EXECUTION_FAILED)
                            .with_optional_location(position)
                            .problem(err.to_string())
                            .build(),
                    );
                    continue;
                }
            };
            if write_cache
                && let Some(cache) = &session.cache
                && let Err(err) = cache.set(&key, &outputs)
            {
                reports.push(
                    DiagnosticMessageBuilder::warning("Execution result not cached")
                        .with_code(rules::EXECUTION_CACHE)
                        .with_optional_location(position)
                        .problem(err.to_string())
                        .build(),
                );
            }
            replace_outputs(cell, outputs);
        }

        for report in reports {
            doc.report(report);
        }
        Ok(())
    }
}

fn is_cell(node: &Node) -> bool {
    matches!(&node.kind, NodeKind::Block { kind: Some(kind), .. } if kind == NOTEBOOK_CODE)
}

fn collect_cells<'a>(node: &'a mut Node, out: &mut Vec<&'a mut Node>) {
    if is_cell(node) {
        out.push(node);
        return;
    }
    for child in &mut node.children {
        collect_cells(child, out);
    }
}

fn cell_source(cell: &Node) -> Option<(String, Option<String>)> {
    cell.children.iter().find_map(|child| match &child.kind {
        NodeKind::Code {
            value,
            lang,
            executable: true,
            ..
        } => Some((value.clone(), lang.clone())),
        _ => None,
    })
}

/// Put `outputs` in place of the cell's `outputs` node, or after its code.
fn replace_outputs(cell: &mut Node, outputs: Node) {
    let outputs = Node {
        position: cell.position,
        ..outputs
    };
    match cell
        .children
        .iter()
        .position(|c| c.kind == NodeKind::Outputs)
    {
        Some(index) => cell.children[index] = outputs,
        None => cell.children.push(outputs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ExecutionCache;
    use crate::execute::ReplayExecutor;
    use crate::options::BuildOptions;
    use crate::session::MemoryLoader;
    use std::sync::Arc;

    fn cell(source: &str) -> Node {
        Node::with_children(
            NodeKind::Block {
                kind: Some(NOTEBOOK_CODE.into()),
                meta: None,
            },
            vec![
                Node::new(NodeKind::Code {
                    lang: Some("python".into()),
                    meta: None,
                    value: source.into(),
                    executable: true,
                    show_line_numbers: false,
                }),
                Node::new(NodeKind::Outputs),
            ],
        )
    }

    fn stream(text: &str) -> Vec<OutputsPayload> {
        vec![OutputsPayload::Stream {
            name: "stdout".into(),
            text: text.into(),
        }]
    }

    fn options(execute: bool) -> BuildOptions {
        BuildOptions {
            execute,
            ..BuildOptions::default()
        }
    }

    fn doc_with(cells: Vec<Node>) -> Document {
        let mut doc = Document::new(0, "nb.md", "");
        doc.root = Node::root(cells);
        doc
    }

    fn output_count(doc: &Document, cell: usize) -> usize {
        doc.root.children[cell].children[1].children.len()
    }

    #[tokio::test]
    async fn test_disabled_execution_leaves_outputs() {
        let session = Session::new(options(false), Arc::new(MemoryLoader::new()))
            .with_executor(Arc::new(ReplayExecutor::new().with("print(1)", stream("1\n"))));
        let mut doc = doc_with(vec![cell("print(1)")]);
        CodeCellsPass.run(&mut doc, &session).await.unwrap();
        assert_eq!(output_count(&doc, 0), 0);
    }

    #[tokio::test]
    async fn test_executes_and_fills_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ExecutionCache::open(dir.path()).unwrap());
        let session = Session::new(options(true), Arc::new(MemoryLoader::new()))
            .with_cache(cache.clone())
            .with_executor(Arc::new(ReplayExecutor::new().with("print(1)", stream("1\n"))));
        let mut doc = doc_with(vec![cell("print(1)")]);
        CodeCellsPass.run(&mut doc, &session).await.unwrap();
        assert_eq!(output_count(&doc, 0), 1);
        assert!(doc.diagnostics.is_empty());

        let fingerprint = ExecutionFingerprint {
            allow_errors: true,
            timeout_secs: 30,
        };
        assert!(cache.test(&CacheKey::for_cell("print(1)", "python", &fingerprint)));
    }

    #[tokio::test]
    async fn test_cache_hit_needs_no_executor() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ExecutionCache::open(dir.path()).unwrap());
        let fingerprint = ExecutionFingerprint {
            allow_errors: true,
            timeout_secs: 30,
        };
        let key = CacheKey::for_cell("print(2)", "python", &fingerprint);
        cache.set(&key, &outputs_node(&stream("2\n")).unwrap()).unwrap();

        let session =
            Session::new(options(true), Arc::new(MemoryLoader::new())).with_cache(cache);
        let mut doc = doc_with(vec![cell("print(2)")]);
        CodeCellsPass.run(&mut doc, &session).await.unwrap();
        assert_eq!(output_count(&doc, 0), 1);
    }

    #[tokio::test]
    async fn test_forced_execution_refreshes_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ExecutionCache::open(dir.path()).unwrap());
        let fingerprint = ExecutionFingerprint {
            allow_errors: true,
            timeout_secs: 30,
        };
        let key = CacheKey::for_cell("print(3)", "python", &fingerprint);
        cache.set(&key, &outputs_node(&stream("old\n")).unwrap()).unwrap();

        let forced = BuildOptions {
            force_execute: true,
            ..options(true)
        };
        let session = Session::new(forced, Arc::new(MemoryLoader::new()))
            .with_cache(cache.clone())
            .with_executor(Arc::new(ReplayExecutor::new().with("print(3)", stream("new\n"))));
        let mut doc = doc_with(vec![cell("print(3)")]);
        CodeCellsPass.run(&mut doc, &session).await.unwrap();

        let fresh = outputs_node(&stream("new\n")).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(fresh.clone()));

        // a plain rebuild replays the refreshed entry without an executor
        let session =
            Session::new(options(true), Arc::new(MemoryLoader::new())).with_cache(cache);
        let mut doc = doc_with(vec![cell("print(3)")]);
        CodeCellsPass.run(&mut doc, &session).await.unwrap();
        assert_eq!(doc.root.children[0].children[1].children, fresh.children);
    }

    #[tokio::test]
    async fn test_kernel_failure_is_a_warning() {
        let session = Session::new(options(true), Arc::new(MemoryLoader::new()))
            .with_executor(Arc::new(ReplayExecutor::new()));
        let mut doc = doc_with(vec![cell("unknown()"), cell("also()")]);
        CodeCellsPass.run(&mut doc, &session).await.unwrap();
        assert_eq!(doc.diagnostics.with_code(rules::EXECUTION_FAILED).count(), 2);
        assert!(!doc.diagnostics.has_errors());
    }

    #[tokio::test]
    async fn test_disallowed_error_output_is_reported() {
        let error = vec![OutputsPayload::Error {
            ename: "ValueError".into(),
            evalue: "bad".into(),
            traceback: Vec::new(),
        }];
        let session = Session::new(options(true), Arc::new(MemoryLoader::new()))
            .with_executor(Arc::new(ReplayExecutor::new().with("raise()", error)));
        let mut doc = doc_with(vec![cell("raise()")]);
        doc.frontmatter.execution.allow_errors = false;
        CodeCellsPass.run(&mut doc, &session).await.unwrap();
        assert!(doc.diagnostics.has_errors());
        assert_eq!(output_count(&doc, 0), 1);
    }

    #[tokio::test]
    async fn test_cancelled_between_cells() {
        let session = Session::new(options(true), Arc::new(MemoryLoader::new()))
            .with_executor(Arc::new(ReplayExecutor::new()));
        session.cancellation.cancel();
        let mut doc = doc_with(vec![cell("x")]);
        let err = CodeCellsPass.run(&mut doc, &session).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
