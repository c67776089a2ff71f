/*
 * build.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Build orchestration: document phase, barrier, project phase.
 */

//! Build orchestration.
//!
//! [`build`] runs one build of a set of files:
//!
//! 1. Every file gets a task. At most `workers` tasks hold a permit at
//!    once; a task holding one loads, parses and runs the document passes
//!    for its file.
//! 2. Every task arrives at the [`BuildBarrier`] exactly once, completed,
//!    failed or cancelled. A file that fails does not stop the others.
//! 3. When all files have arrived, the project passes run once over the
//!    completed documents, in input order.
//!
//! The report lists files in input order whatever order the workers
//! finished in, so two builds of the same inputs give the same trees.

use std::collections::HashSet;
use std::sync::Arc;

use myst_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, rules};
use tokio::sync::Semaphore;

use crate::barrier::{Arrival, BuildBarrier};
use crate::document::Document;
use crate::error::{BuildError, PassError};
use crate::observer::Phase;
use crate::project::{Project, SymbolTable};
use crate::session::{Session, normalize_path};

/// How a file's build ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Every pass ran; the document is final
    Completed,
    /// A fatal error stopped the file's passes
    Failed,
    /// The build was cancelled before the file was finished
    Cancelled,
}

/// Outcome for one input file.
#[derive(Debug)]
pub struct FileReport {
    pub path: String,
    pub status: FileStatus,
    /// The document, if it was loaded
    pub document: Option<Document>,
    pub diagnostics: Vec<DiagnosticMessage>,
}

impl FileReport {
    fn from_arrival(arrival: Arrival) -> Self {
        match arrival {
            Arrival::Completed(doc) => {
                let diagnostics = doc.diagnostics.diagnostics().to_vec();
                FileReport {
                    path: doc.path.clone(),
                    status: FileStatus::Completed,
                    document: Some(*doc),
                    diagnostics,
                }
            }
            Arrival::Failed {
                path,
                document,
                reason,
            } => {
                let diagnostics = match &document {
                    Some(doc) => doc.diagnostics.diagnostics().to_vec(),
                    None => vec![
                        DiagnosticMessageBuilder::error(format!("`{path}` was not built"))
                            .with_code(rules::PASS_FAILED)
                            .problem(reason)
                            .build(),
                    ],
                };
                FileReport {
                    path,
                    status: FileStatus::Failed,
                    document: document.map(|d| *d),
                    diagnostics,
                }
            }
            Arrival::Cancelled { path, document } => {
                let mut diagnostics = document
                    .as_ref()
                    .map(|d| d.diagnostics.diagnostics().to_vec())
                    .unwrap_or_default();
                diagnostics.push(cancelled_message(&path));
                FileReport {
                    path,
                    status: FileStatus::Cancelled,
                    document: document.map(|d| *d),
                    diagnostics,
                }
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == FileStatus::Completed
    }
}

/// Everything one build produced.
#[derive(Debug)]
pub struct BuildReport {
    /// One entry per input, in input order
    pub files: Vec<FileReport>,
    /// Messages from project passes not tied to one file
    pub project_diagnostics: Vec<DiagnosticMessage>,
    pub symbols: SymbolTable,
    pub cancelled: bool,
}

impl BuildReport {
    pub fn file(&self, path: &str) -> Option<&FileReport> {
        let path = normalize_path(path);
        self.files.iter().find(|f| f.path == path)
    }

    /// The final tree of a completed file.
    pub fn document(&self, path: &str) -> Option<&Document> {
        self.file(path)
            .filter(|f| f.is_completed())
            .and_then(|f| f.document.as_ref())
    }

    pub fn failed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Failed)
            .count()
    }

    /// Every message of the build, file by file, then project messages.
    pub fn diagnostics(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.files
            .iter()
            .flat_map(|f| f.diagnostics.iter())
            .chain(self.project_diagnostics.iter())
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics().any(DiagnosticMessage::is_error)
    }
}

fn cancelled_message(path: &str) -> DiagnosticMessage {
    DiagnosticMessageBuilder::info(format!("`{path}` was not finished"))
        .with_code(rules::BUILD_CANCELLED)
        .problem("The build was cancelled")
        .build()
}

/// Build `paths`, given relative to the session's source loader.
pub async fn build(session: Arc<Session>, paths: Vec<String>) -> Result<BuildReport, BuildError> {
    if paths.is_empty() {
        return Err(BuildError::NoInputs);
    }
    let paths: Vec<String> = paths.iter().map(|p| normalize_path(p)).collect();
    let mut seen = HashSet::new();
    for path in &paths {
        if !seen.insert(path.as_str()) {
            return Err(BuildError::DuplicateInput(path.clone()));
        }
    }

    let observer = session.observer.clone();
    let workers = session.options.worker_count();
    observer.on_build_start(paths.len());
    tracing::info!(files = paths.len(), workers, "Starting build");

    // Document phase
    let barrier = BuildBarrier::new(paths.clone());
    let permits = Arc::new(Semaphore::new(workers));
    observer.on_phase_start(Phase::Document, paths.len());
    let mut handles = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        let ticket = barrier.ticket(index);
        let session = session.clone();
        let permits = permits.clone();
        let path = path.clone();
        handles.push(tokio::spawn(async move {
            let arrival = match permits.acquire_owned().await {
                Ok(permit) => {
                    let arrival = process_file(index, path, &session).await;
                    drop(permit);
                    arrival
                }
                Err(err) => Arrival::Failed {
                    path,
                    document: None,
                    reason: err.to_string(),
                },
            };
            ticket.arrive(arrival);
        }));
    }
    let arrivals = barrier.wait().await;
    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Document worker stopped abnormally");
        }
    }
    observer.on_phase_complete(Phase::Document);

    // Project phase
    let mut cancelled = session.cancellation.is_cancelled();
    let mut reports: Vec<FileReport> = Vec::with_capacity(arrivals.len());
    let mut completed: Vec<Document> = Vec::new();
    for arrival in arrivals {
        match arrival {
            Arrival::Completed(doc) => completed.push(*doc),
            other => reports.push(FileReport::from_arrival(other)),
        }
    }

    let mut project = Project::new(completed);
    if cancelled {
        tracing::info!("Build cancelled before the project phase");
    } else {
        observer.on_phase_start(Phase::Project, project.documents.len());
        tracing::info!(documents = project.documents.len(), "Running project passes");
        // project passes are synchronous; keep them off the async workers
        let phase_session = session.clone();
        let (returned, result) = tokio::task::spawn_blocking(move || {
            let result = phase_session.pipeline.run_project(&mut project, &phase_session);
            (project, result)
        })
        .await
        .map_err(|err| BuildError::Worker(err.to_string()))?;
        project = returned;
        match result {
            Ok(()) => {}
            Err(PassError::Cancelled) => cancelled = true,
            Err(PassError::Fatal(diagnostic)) => project.diagnostics.add(*diagnostic),
        }
        observer.on_phase_complete(Phase::Project);
    }

    let Project {
        documents,
        symbols,
        diagnostics,
    } = project;
    for doc in documents {
        let arrival = if cancelled {
            let path = doc.path.clone();
            Arrival::Cancelled {
                path,
                document: Some(Box::new(doc)),
            }
        } else {
            Arrival::Completed(Box::new(doc))
        };
        reports.push(FileReport::from_arrival(arrival));
    }
    reports.sort_by(|a, b| index_of(&paths, &a.path).cmp(&index_of(&paths, &b.path)));

    let report = BuildReport {
        files: reports,
        project_diagnostics: diagnostics.into_diagnostics(),
        symbols,
        cancelled,
    };
    if cancelled {
        observer.on_build_cancelled();
    } else {
        observer.on_build_complete(report.failed());
    }
    tracing::info!(
        failed = report.failed(),
        cancelled,
        diagnostics = report.diagnostics().count(),
        "Build finished"
    );
    Ok(report)
}

fn index_of(paths: &[String], path: &str) -> usize {
    paths.iter().position(|p| p == path).unwrap_or(usize::MAX)
}

/// Load, parse and run the document passes for one file.
async fn process_file(index: usize, path: String, session: &Session) -> Arrival {
    if session.cancellation.is_cancelled() {
        return Arrival::Cancelled {
            path,
            document: None,
        };
    }

    let source = match session.loader.load(&path) {
        Ok(source) => source,
        Err(err) => {
            let mut doc = Document::new(index, path.clone(), "");
            doc.diagnostics = session.collector();
            let reason = format!("Could not read `{path}`: {err}");
            doc.report(
                DiagnosticMessageBuilder::error("Source file not readable")
                    .with_code(rules::PASS_FAILED)
                    .problem(reason.clone())
                    .build(),
            );
            return Arrival::Failed {
                path,
                document: Some(Box::new(doc)),
                reason,
            };
        }
    };

    let mut doc = Document::new(index, path.clone(), source);
    doc.diagnostics = session.collector();
    let parsed = myst_parser::parse_document(&doc.source, &session.registry, doc.file_id);
    doc.root = parsed.root;
    if let Some(frontmatter) = parsed.frontmatter {
        doc.page_frontmatter = frontmatter;
    }
    doc.diagnostics.extend(parsed.diagnostics);

    match session.pipeline.run_document(&mut doc, session).await {
        Ok(()) => Arrival::Completed(Box::new(doc)),
        Err(PassError::Cancelled) => Arrival::Cancelled {
            path,
            document: Some(Box::new(doc)),
        },
        Err(PassError::Fatal(diagnostic)) => {
            let reason = diagnostic.title.clone();
            tracing::warn!(file = %path, reason = %reason, "Document passes stopped");
            doc.report(*diagnostic);
            Arrival::Failed {
                path,
                document: Some(Box::new(doc)),
                reason,
            }
        }
    }
}
