/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Transform pipeline, resolver and execution cache for MyST documents.
 */

//! Core build infrastructure for the MyST engine.
//!
//! This crate turns parsed documents into final trees: it runs the
//! document-scoped passes for each file on a bounded worker pool, waits at
//! a barrier for every file, then runs the project-scoped passes that need
//! the whole project (numbering, cross-references, citations).
//!
//! # Architecture
//!
//! - [`Session`] - Shared, read-only state of one build (registry, options,
//!   cache, executor, observer, cancellation)
//! - [`Document`] - One file and everything derived from it
//! - [`PassPipeline`] - Ordered [`DocumentPass`] and [`ProjectPass`] list
//! - [`BuildBarrier`] - Joins the two phases
//! - [`ExecutionCache`] - Content-addressed cell outputs
//! - [`build`] - Runs a whole build and returns a [`BuildReport`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use myst_core::{BuildOptions, FsLoader, Session, build};
//!
//! let session = Session::new(BuildOptions::default(), Arc::new(FsLoader::new("book")));
//! let report = build(Arc::new(session), vec!["intro.md".into()]).await?;
//! for file in &report.files {
//!     println!("{}: {:?}", file.path, file.status);
//! }
//! ```

pub mod barrier;
pub mod build;
pub mod cache;
pub mod cancellation;
pub mod citations;
pub mod document;
pub mod error;
pub mod execute;
pub mod observer;
pub mod options;
pub mod passes;
pub mod pipeline;
pub mod project;
pub mod session;
pub mod tools;

pub use barrier::{Arrival, BarrierTicket, BuildBarrier};
pub use build::{BuildReport, FileReport, FileStatus, build};
pub use cache::{CacheError, CacheKey, ExecutionCache, ExecutionFingerprint};
pub use cancellation::Cancellation;
pub use citations::{CitationCatalog, CslItem};
pub use document::{Document, References};
pub use error::{BuildError, PassError};
pub use execute::{CellExecutor, CellRequest, ExecutionError, ReplayExecutor, SubprocessExecutor};
pub use observer::{EventLevel, NoopObserver, Phase, PipelineObserver, TracingObserver};
pub use options::BuildOptions;
pub use pipeline::{DocumentPass, Pass, PassPipeline, PassScope, ProjectPass};
pub use project::{Project, Symbol, SymbolTable};
pub use session::{FsLoader, MemoryLoader, Session, SourceLoader};
pub use tools::{ToolCommand, ToolError, ToolOutcome};
