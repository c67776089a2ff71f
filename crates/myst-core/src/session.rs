/*
 * session.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Build session: everything shared by the workers of one build.
 */

//! The build session.
//!
//! A [`Session`] is constructed once per build invocation and handed to
//! every worker behind an `Arc`. It replaces ambient global state: the
//! extension registry, options, cache, executor, observer, cancellation
//! token, citation catalog and source loader all live here.

use std::collections::BTreeSet;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use myst_error_reporting::DiagnosticCollector;
use myst_extensions::ExtensionRegistry;
use serde_json::Value;

use crate::cache::{CacheError, ExecutionCache};
use crate::cancellation::Cancellation;
use crate::citations::CitationCatalog;
use crate::execute::CellExecutor;
use crate::observer::{NoopObserver, PipelineObserver};
use crate::options::BuildOptions;
use crate::pipeline::PassPipeline;

/// Reads source files by their project-relative path.
pub trait SourceLoader: Send + Sync {
    fn load(&self, path: &str) -> io::Result<String>;
}

/// Loads files from a directory on disk.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsLoader { root: root.into() }
    }
}

impl SourceLoader for FsLoader {
    fn load(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(self.root.join(path))
    }
}

/// Loads files from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: IndexMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: &str, content: &str) {
        self.files.insert(normalize_path(path), content.to_string());
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &str) -> io::Result<String> {
        self.files.get(&normalize_path(path)).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such file: {path}"))
        })
    }
}

/// Resolve `target` relative to the directory of `from`, both
/// project-relative with `/` separators.
pub fn resolve_relative(from: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize_path(absolute);
    }
    let dir = Path::new(from).parent().unwrap_or(Path::new(""));
    normalize_path(&dir.join(target).to_string_lossy())
}

/// Drop `.` segments and fold `..` segments.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(&path.replace('\\', "/")).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    parts.join("/")
}

/// Shared, read-only state of one build.
pub struct Session {
    pub registry: Arc<ExtensionRegistry>,
    pub options: BuildOptions,
    /// Project frontmatter every page inherits from
    pub project_frontmatter: Value,
    pub pipeline: Arc<PassPipeline>,
    pub cache: Option<Arc<ExecutionCache>>,
    pub executor: Option<Arc<dyn CellExecutor>>,
    pub observer: Arc<dyn PipelineObserver>,
    pub cancellation: Cancellation,
    pub citations: Arc<CitationCatalog>,
    pub loader: Arc<dyn SourceLoader>,
    suppressed: Arc<BTreeSet<String>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("options", &self.options)
            .field("passes", &self.pipeline.names())
            .field("cache", &self.cache.as_ref().map(|c| c.root().to_path_buf()))
            .field("executor", &self.executor.as_ref().map(|e| e.name().to_string()))
            .field("citations", &self.citations.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// A session with the built-in registry and default passes, reading
    /// sources through `loader`.
    pub fn new(options: BuildOptions, loader: Arc<dyn SourceLoader>) -> Self {
        let suppressed = options.suppressed();
        Session {
            registry: Arc::new(ExtensionRegistry::new()),
            options,
            project_frontmatter: Value::Object(Default::default()),
            pipeline: Arc::new(PassPipeline::standard()),
            cache: None,
            executor: None,
            observer: Arc::new(NoopObserver),
            cancellation: Cancellation::new(),
            citations: Arc::new(CitationCatalog::new()),
            loader,
            suppressed,
        }
    }

    /// Open the cache named in the options, if any.
    pub fn with_configured_cache(mut self) -> Result<Self, CacheError> {
        if let Some(dir) = &self.options.cache_dir {
            self.cache = Some(Arc::new(ExecutionCache::open(dir)?));
        }
        Ok(self)
    }

    pub fn with_registry(mut self, registry: ExtensionRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_pipeline(mut self, pipeline: PassPipeline) -> Self {
        self.pipeline = Arc::new(pipeline);
        self
    }

    pub fn with_project_frontmatter(mut self, frontmatter: Value) -> Self {
        self.project_frontmatter = frontmatter;
        self
    }

    pub fn with_cache(mut self, cache: Arc<ExecutionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn CellExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_citations(mut self, catalog: CitationCatalog) -> Self {
        self.citations = Arc::new(catalog);
        self
    }

    /// A diagnostics collector honouring the suppressed rules.
    pub fn collector(&self) -> DiagnosticCollector {
        DiagnosticCollector::with_suppressed(self.suppressed.clone())
    }

    pub fn observer(&self) -> &dyn PipelineObserver {
        self.observer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./a/b/../c.md"), "a/c.md");
        assert_eq!(normalize_path("../x.md"), "x.md");
        assert_eq!(normalize_path("a\\b.md"), "a/b.md");
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(resolve_relative("chapters/one.md", "parts/x.md"), "chapters/parts/x.md");
        assert_eq!(resolve_relative("chapters/one.md", "../shared.md"), "shared.md");
        assert_eq!(resolve_relative("one.md", "x.md"), "x.md");
        assert_eq!(resolve_relative("chapters/one.md", "/top.md"), "top.md");
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with_file("./a.md", "# A");
        assert_eq!(loader.load("a.md").unwrap(), "# A");
        let err = loader.load("b.md").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_fs_loader() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "text").unwrap();
        let loader = FsLoader::new(dir.path());
        assert_eq!(loader.load("a.md").unwrap(), "text");
        assert!(loader.load("missing.md").is_err());
    }

    #[test]
    fn test_session_builders() {
        let session = Session::new(BuildOptions::default(), Arc::new(MemoryLoader::new()))
            .with_project_frontmatter(serde_json::json!({"title": "Project"}));
        assert_eq!(session.project_frontmatter["title"], "Project");
        assert!(session.cache.is_none());
        assert!(session.registry.has_directive("figure"));
        let rendered = format!("{session:?}");
        assert!(rendered.contains("Session"));
    }
}
