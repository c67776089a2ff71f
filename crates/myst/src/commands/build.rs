/*
 * build.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Build command implementation
 */

//! `myst build`: build the given files as one project and write each
//! completed document in one output format.
//!
//! Diagnostics go to standard error with source snippets. A file that
//! fails is reported and skipped; the others are still written.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use myst_core::{
    BuildReport, FsLoader, Session, SubprocessExecutor, ToolCommand, TracingObserver, build,
};
use myst_source_map::SourceContext;
use myst_writers::BackendOptions;

use crate::config;

/// Arguments for the build command
#[derive(Debug)]
pub struct BuildArgs {
    pub files: Vec<String>,
    pub root: PathBuf,
    /// Backend name
    pub to: String,
    pub out: Option<PathBuf>,
    pub execute: bool,
    pub force_execute: bool,
    pub cache_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub suppressed_rules: Vec<String>,
    pub fragment: bool,
    pub compile: bool,
}

#[derive(Debug, Default)]
pub struct BuildSummary {
    pub inputs: usize,
    pub failed: usize,
    pub written: Vec<PathBuf>,
    pub has_errors: bool,
}

/// Execute the build command
pub fn execute(args: BuildArgs) -> Result<BuildSummary> {
    if myst_writers::backend(&args.to).is_none() {
        anyhow::bail!("Unknown output format: {}", args.to);
    }
    let compiler = if args.compile {
        let tool = match args.to.as_str() {
            "latex" => ToolCommand::latexmk(),
            "typst" => ToolCommand::typst(),
            other => anyhow::bail!("--compile is not supported for {other} output"),
        };
        if !tool.is_available() {
            anyhow::bail!("`{}` was not found on PATH", tool.program);
        }
        Some(tool)
    } else {
        None
    };

    let config = config::load(&args.root)?;
    let mut options = config.build;
    options.execute |= args.execute;
    options.force_execute |= args.force_execute;
    if let Some(dir) = args.cache_dir {
        options.cache_dir = Some(dir);
    }
    if let Some(dir) = options.cache_dir.take() {
        options.cache_dir = Some(if dir.is_relative() { args.root.join(dir) } else { dir });
    }
    if let Some(workers) = args.workers {
        options.workers = workers;
    }
    options.suppressed_rules.extend(args.suppressed_rules);
    let execute = options.execute;

    let mut session = Session::new(options, Arc::new(FsLoader::new(&args.root)))
        .with_project_frontmatter(config.frontmatter)
        .with_observer(Arc::new(TracingObserver::new()))
        .with_configured_cache()
        .context("Failed to open the execution cache")?;
    if execute {
        session = session.with_executor(Arc::new(SubprocessExecutor::with_defaults()));
    }
    let session = Arc::new(session);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    let cancellation = session.cancellation.clone();
    let files = args.files;
    let report = runtime.block_on(async move {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted; cancelling build");
                cancellation.cancel();
            }
        });
        build(session, files).await
    })?;

    print_diagnostics(&report);

    let mut summary = BuildSummary {
        inputs: report.files.len(),
        failed: report.failed(),
        written: Vec::new(),
        has_errors: report.has_errors(),
    };
    if report.cancelled {
        warn!("build was cancelled; no output written");
        return Ok(summary);
    }

    let out_dir = args
        .out
        .unwrap_or_else(|| args.root.join("_build").join(&args.to));
    let backend_options = BackendOptions {
        standalone: !args.fragment,
        ..BackendOptions::default()
    };
    for file in report.files.iter().filter(|f| f.is_completed()) {
        let Some(doc) = &file.document else {
            continue;
        };
        let artifact = myst_writers::render(&args.to, doc, &backend_options)
            .with_context(|| format!("Failed to write {} as {}", doc.path, args.to))?;
        let path = out_dir.join(format!("{}.{}", doc.slug(), artifact.extension));
        write_file(&path, &artifact.content)?;
        info!(path = %path.display(), "wrote");

        if let Some(tool) = &compiler {
            match tool.run(&path, &path.with_extension("log")) {
                Ok(outcome) => {
                    if let Some(diagnostic) = outcome.to_diagnostic(&tool.program) {
                        eprintln!("{}", diagnostic.to_text(None));
                        summary.has_errors = true;
                    } else {
                        info!(path = %tool.output_path(&path).display(), "compiled");
                    }
                }
                Err(err) => {
                    eprintln!("{err}");
                    summary.has_errors = true;
                }
            }
        }
        summary.written.push(path);
    }
    Ok(summary)
}

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Print every message with a snippet of the file it points into.
fn print_diagnostics(report: &BuildReport) {
    // file ids follow input order
    let mut ctx = SourceContext::new();
    for file in &report.files {
        let source = file.document.as_ref().map_or("", |d| d.source.as_str());
        ctx.add_file(file.path.clone(), source);
    }
    for diagnostic in report.diagnostics() {
        eprintln!("{}", diagnostic.to_text(Some(&ctx)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(root: &Path, files: &[&str], to: &str) -> BuildArgs {
        BuildArgs {
            files: files.iter().map(|f| f.to_string()).collect(),
            root: root.to_path_buf(),
            to: to.to_string(),
            out: None,
            execute: false,
            force_execute: false,
            cache_dir: None,
            workers: Some(2),
            suppressed_rules: Vec::new(),
            fragment: false,
            compile: false,
        }
    }

    #[test]
    fn test_writes_every_completed_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("myst.yml"), "project:\n  title: Book\n").unwrap();
        std::fs::write(dir.path().join("a.md"), "# One\n\nText.\n").unwrap();
        std::fs::create_dir(dir.path().join("ch")).unwrap();
        std::fs::write(dir.path().join("ch/b.md"), "Some *more*.\n").unwrap();

        let summary = execute(args(dir.path(), &["a.md", "ch/b.md"], "html")).unwrap();
        assert_eq!(summary.inputs, 2);
        assert_eq!(summary.failed, 0);
        assert!(!summary.has_errors);
        let out = dir.path().join("_build/html");
        assert_eq!(summary.written, vec![out.join("a.html"), out.join("ch/b.html")]);
        let b = std::fs::read_to_string(out.join("ch/b.html")).unwrap();
        assert!(b.contains("<em>more</em>"));
        assert!(b.contains("Book"));
    }

    #[test]
    fn test_missing_file_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "Text.\n").unwrap();

        let summary = execute(args(dir.path(), &["a.md", "gone.md"], "typst")).unwrap();
        assert_eq!(summary.failed, 1);
        assert!(summary.has_errors);
        assert_eq!(summary.written, vec![dir.path().join("_build/typst/a.typ")]);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute(args(dir.path(), &["a.md"], "pdf")).unwrap_err();
        assert!(err.to_string().contains("Unknown output format"));
    }

    #[test]
    fn test_compile_needs_a_compilable_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut build_args = args(dir.path(), &["a.md"], "html");
        build_args.compile = true;
        assert!(execute(build_args).is_err());
    }
}
