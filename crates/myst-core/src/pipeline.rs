/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Pass traits and the ordered pass list.
 */

//! Transform passes.
//!
//! A pass is either document-scoped ([`DocumentPass`]), running once per
//! file with no view of other files, or project-scoped ([`ProjectPass`]),
//! running once after every file has finished its document passes. The
//! [`PassPipeline`] keeps passes in declared order; the orchestrator runs
//! the document passes of a file in that order, and the project passes in
//! that order after the barrier.
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//! use myst_core::{Document, DocumentPass, PassError, Session};
//!
//! struct StripComments;
//!
//! #[async_trait]
//! impl DocumentPass for StripComments {
//!     fn name(&self) -> &str { "strip-comments" }
//!     async fn run(&self, doc: &mut Document, session: &Session) -> Result<(), PassError> {
//!         myst_ast::visit::splice(&mut doc.root, &mut |n| match n.kind {
//!             myst_ast::NodeKind::Comment { .. } => vec![],
//!             _ => vec![n],
//!         });
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::document::Document;
use crate::error::PassError;
use crate::passes;
use crate::project::Project;
use crate::session::Session;

/// When a pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassScope {
    Document,
    Project,
}

/// A pass over one document.
///
/// Passes are async so that passes waiting on external collaborators (cell
/// execution) share the worker pool with CPU-bound ones. Passes must be
/// `Send + Sync`; a single instance serves every worker.
#[async_trait]
pub trait DocumentPass: Send + Sync {
    fn name(&self) -> &str;

    /// Transform `doc` in place. Recoverable problems are reported on
    /// `doc.diagnostics`; an `Err` stops the remaining passes for this file.
    async fn run(&self, doc: &mut Document, session: &Session) -> Result<(), PassError>;
}

/// A pass over the whole project, run after the barrier.
pub trait ProjectPass: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, project: &mut Project, session: &Session) -> Result<(), PassError>;
}

#[derive(Clone)]
pub enum Pass {
    Document(Arc<dyn DocumentPass>),
    Project(Arc<dyn ProjectPass>),
}

impl Pass {
    pub fn name(&self) -> &str {
        match self {
            Pass::Document(pass) => pass.name(),
            Pass::Project(pass) => pass.name(),
        }
    }

    pub fn scope(&self) -> PassScope {
        match self {
            Pass::Document(_) => PassScope::Document,
            Pass::Project(_) => PassScope::Project,
        }
    }
}

/// An ordered list of named passes.
#[derive(Clone, Default)]
pub struct PassPipeline {
    passes: Vec<Pass>,
}

impl std::fmt::Debug for PassPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassPipeline")
            .field("passes", &self.names())
            .finish()
    }
}

impl PassPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default passes, in their default order.
    pub fn standard() -> Self {
        let mut pipeline = PassPipeline::new();
        pipeline.push_document(Arc::new(passes::FrontmatterPass));
        pipeline.push_document(Arc::new(passes::IncludePass));
        pipeline.push_document(Arc::new(passes::CodeCellsPass));
        pipeline.push_document(Arc::new(passes::TargetsPass));
        pipeline.push_document(Arc::new(passes::FootnotesPass));
        pipeline.push_document(Arc::new(passes::HtmlIdsPass));
        pipeline.push_document(Arc::new(passes::LiftExtensionsPass));
        pipeline.push_project(Arc::new(passes::EnumeratePass));
        pipeline.push_project(Arc::new(passes::ResolveReferencesPass));
        pipeline.push_project(Arc::new(passes::CitationsPass));
        pipeline
    }

    pub fn push_document(&mut self, pass: Arc<dyn DocumentPass>) {
        self.passes.push(Pass::Document(pass));
    }

    pub fn push_project(&mut self, pass: Arc<dyn ProjectPass>) {
        self.passes.push(Pass::Project(pass));
    }

    /// Insert a pass right after the pass named `after`, or at the end.
    pub fn insert_after(&mut self, after: &str, pass: Pass) {
        match self.passes.iter().position(|p| p.name() == after) {
            Some(index) => self.passes.insert(index + 1, pass),
            None => self.passes.push(pass),
        }
    }

    /// Remove every pass named `name`. Returns whether one was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.passes.len();
        self.passes.retain(|p| p.name() != name);
        self.passes.len() != before
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.passes.iter().map(Pass::name).collect()
    }

    pub fn document_passes(&self) -> impl Iterator<Item = &Arc<dyn DocumentPass>> {
        self.passes.iter().filter_map(|p| match p {
            Pass::Document(pass) => Some(pass),
            Pass::Project(_) => None,
        })
    }

    pub fn project_passes(&self) -> impl Iterator<Item = &Arc<dyn ProjectPass>> {
        self.passes.iter().filter_map(|p| match p {
            Pass::Project(pass) => Some(pass),
            Pass::Document(_) => None,
        })
    }

    /// Run every document pass on `doc`, in order.
    ///
    /// Cancellation is checked before each pass. The first error stops the
    /// remaining passes.
    pub async fn run_document(&self, doc: &mut Document, session: &Session) -> Result<(), PassError> {
        let passes: Vec<&Arc<dyn DocumentPass>> = self.document_passes().collect();
        let total = passes.len();
        let observer = session.observer();
        for (index, pass) in passes.into_iter().enumerate() {
            if session.cancellation.is_cancelled() {
                return Err(PassError::Cancelled);
            }
            let name = pass.name();
            observer.on_pass_start(Some(&doc.path), name, index, total);
            tracing::debug!(file = %doc.path, pass = name, "Running pass");
            match pass.run(doc, session).await {
                Ok(()) => observer.on_pass_complete(Some(&doc.path), name, index, total),
                Err(err) => {
                    observer.on_pass_error(Some(&doc.path), name, &err);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Run every project pass, in order.
    pub fn run_project(&self, project: &mut Project, session: &Session) -> Result<(), PassError> {
        let passes: Vec<&Arc<dyn ProjectPass>> = self.project_passes().collect();
        let total = passes.len();
        let observer = session.observer();
        for (index, pass) in passes.into_iter().enumerate() {
            if session.cancellation.is_cancelled() {
                return Err(PassError::Cancelled);
            }
            let name = pass.name();
            observer.on_pass_start(None, name, index, total);
            tracing::debug!(pass = name, "Running project pass");
            match pass.run(project, session) {
                Ok(()) => observer.on_pass_complete(None, name, index, total),
                Err(err) => {
                    observer.on_pass_error(None, name, &err);
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildOptions;
    use crate::session::MemoryLoader;
    use myst_ast::{Node, NodeKind};

    struct Push(&'static str);

    #[async_trait]
    impl DocumentPass for Push {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, doc: &mut Document, _session: &Session) -> Result<(), PassError> {
            doc.root.children.push(Node::text(self.0));
            Ok(())
        }
    }

    struct Fail;

    #[async_trait]
    impl DocumentPass for Fail {
        fn name(&self) -> &str {
            "fail"
        }

        async fn run(&self, _doc: &mut Document, _session: &Session) -> Result<(), PassError> {
            Err(PassError::failed("fail", "always"))
        }
    }

    struct Count;

    impl ProjectPass for Count {
        fn name(&self) -> &str {
            "count"
        }

        fn run(&self, project: &mut Project, _session: &Session) -> Result<(), PassError> {
            let n = project.documents.len();
            for doc in &mut project.documents {
                doc.root.children.push(Node::text(n.to_string()));
            }
            Ok(())
        }
    }

    fn session(pipeline: PassPipeline) -> Session {
        Session::new(BuildOptions::default(), Arc::new(MemoryLoader::new())).with_pipeline(pipeline)
    }

    fn texts(doc: &Document) -> Vec<String> {
        doc.root
            .children
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Text { value } => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_standard_order() {
        assert_eq!(
            PassPipeline::standard().names(),
            vec![
                "frontmatter",
                "include",
                "code-cells",
                "targets",
                "footnotes",
                "html-ids",
                "lift-extensions",
                "enumerate",
                "resolve-references",
                "citations"
            ]
        );
    }

    #[test]
    fn test_insert_and_remove() {
        let mut pipeline = PassPipeline::standard();
        pipeline.insert_after("targets", Pass::Document(Arc::new(Push("extra"))));
        let names = pipeline.names();
        let targets = names.iter().position(|n| *n == "targets").unwrap();
        assert_eq!(names[targets + 1], "extra");
        assert!(pipeline.remove("citations"));
        assert!(!pipeline.remove("citations"));
        assert_eq!(pipeline.project_passes().count(), 2);
    }

    #[tokio::test]
    async fn test_document_passes_run_in_order() {
        let mut pipeline = PassPipeline::new();
        pipeline.push_document(Arc::new(Push("one")));
        pipeline.push_project(Arc::new(Count));
        pipeline.push_document(Arc::new(Push("two")));
        let session = session(pipeline.clone());
        let mut doc = Document::new(0, "a.md", "");
        pipeline.run_document(&mut doc, &session).await.unwrap();
        assert_eq!(texts(&doc), vec!["one", "two"]);

        let mut project = Project::new(vec![doc]);
        pipeline.run_project(&mut project, &session).unwrap();
        assert_eq!(texts(&project.documents[0]), vec!["one", "two", "1"]);
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_passes() {
        let mut pipeline = PassPipeline::new();
        pipeline.push_document(Arc::new(Push("one")));
        pipeline.push_document(Arc::new(Fail));
        pipeline.push_document(Arc::new(Push("never")));
        let session = session(pipeline.clone());
        let mut doc = Document::new(0, "a.md", "");
        let err = pipeline.run_document(&mut doc, &session).await.unwrap_err();
        assert!(!err.is_cancelled());
        assert_eq!(texts(&doc), vec!["one"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_pass() {
        let mut pipeline = PassPipeline::new();
        pipeline.push_document(Arc::new(Push("one")));
        let session = session(pipeline.clone());
        session.cancellation.cancel();
        let mut doc = Document::new(0, "a.md", "");
        let err = pipeline.run_document(&mut doc, &session).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(doc.root.children.is_empty());
    }
}
