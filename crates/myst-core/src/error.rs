/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for passes and builds.
 */

use myst_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, rules};
use thiserror::Error;

/// Why a pass stopped early.
///
/// Recoverable problems are reported as diagnostics on the document and
/// the pass returns `Ok`. Only the cases below end a file's pipeline.
#[derive(Debug, Error)]
pub enum PassError {
    /// The pass cannot proceed for this file; the message says why
    #[error("{}", .0.title)]
    Fatal(Box<DiagnosticMessage>),

    /// The build was cancelled while the pass ran
    #[error("cancelled")]
    Cancelled,
}

impl PassError {
    pub fn fatal(diagnostic: DiagnosticMessage) -> Self {
        PassError::Fatal(Box::new(diagnostic))
    }

    /// A fatal error with only a title and problem statement.
    pub fn failed(pass: &str, problem: impl Into<String>) -> Self {
        PassError::fatal(
            DiagnosticMessageBuilder::error(format!("Pass `{pass}` failed"))
                .with_code(rules::PASS_FAILED)
                .problem(problem.into())
                .build(),
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PassError::Cancelled)
    }
}

/// Errors that stop a whole build before any file is processed.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no input files")]
    NoInputs,

    #[error("duplicate input file: {0}")]
    DuplicateInput(String),

    #[error("worker pool failed: {0}")]
    Worker(String),
}
