/*
 * tools.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Invocation contract for external typesetting and conversion tools.
 */

//! External tools.
//!
//! A tool is run as `program args... input` with its standard output and
//! standard error written to a log file. Exit status 0 together with an
//! output file at the derived path is success; anything else is failure,
//! and the log is the only diagnostic the engine reads.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use myst_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, rules};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("`{0}` was not found on PATH")]
    NotFound(String),

    #[error("could not run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write tool log {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of a tool run that started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success { output: PathBuf },
    Failure { log: String, status: Option<i32> },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    /// A diagnostic for a failed run, carrying the log tail.
    pub fn to_diagnostic(&self, tool: &str) -> Option<DiagnosticMessage> {
        let ToolOutcome::Failure { log, status } = self else {
            return None;
        };
        let tail: Vec<&str> = log.lines().rev().take(20).collect();
        let mut builder = DiagnosticMessageBuilder::error(format!("`{tool}` failed"))
            .with_code(rules::EXPORT_TOOL_FAILED)
            .problem(match status {
                Some(code) => format!("The tool exited with status {code}"),
                None => "The tool did not produce its output file".to_string(),
            });
        for line in tail.into_iter().rev() {
            builder = builder.add_info(line.to_string());
        }
        Some(builder.build())
    }
}

/// Command line for one external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Extension of the file the tool writes next to its input
    pub output_extension: String,
}

impl ToolCommand {
    pub fn new(program: &str, output_extension: &str) -> Self {
        ToolCommand {
            program: program.to_string(),
            args: Vec::new(),
            output_extension: output_extension.to_string(),
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// `typst compile input.typ` producing `input.pdf`.
    pub fn typst() -> Self {
        ToolCommand::new("typst", "pdf").arg("compile")
    }

    /// `latexmk -pdf -interaction=nonstopmode input.tex` producing `input.pdf`.
    pub fn latexmk() -> Self {
        ToolCommand::new("latexmk", "pdf")
            .arg("-pdf")
            .arg("-interaction=nonstopmode")
    }

    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    /// The command as a display string.
    pub fn command_line(&self, input: &Path) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.push(input.display().to_string());
        parts.join(" ")
    }

    pub fn output_path(&self, input: &Path) -> PathBuf {
        input.with_extension(&self.output_extension)
    }

    /// Run the tool on `input`, logging to `log`.
    pub fn run(&self, input: &Path, log: &Path) -> Result<ToolOutcome, ToolError> {
        let program =
            which::which(&self.program).map_err(|_| ToolError::NotFound(self.program.clone()))?;
        let log_error = |source| ToolError::Log {
            path: log.to_path_buf(),
            source,
        };
        let log_file = File::create(log).map_err(log_error)?;
        let log_err = log_file.try_clone().map_err(log_error)?;

        tracing::info!(command = %self.command_line(input), "running external tool");
        let mut command = Command::new(program);
        command.args(&self.args);
        // tools run next to their input so relative resources resolve
        match (input.parent().filter(|d| !d.as_os_str().is_empty()), input.file_name()) {
            (Some(dir), Some(name)) => command.current_dir(dir).arg(name),
            _ => command.arg(input),
        };
        let status = command
            .stdin(Stdio::null())
            .stdout(log_file)
            .stderr(log_err)
            .status()
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = self.output_path(input);
        if status.success() && output.is_file() {
            return Ok(ToolOutcome::Success { output });
        }
        let log = fs::read_to_string(log).unwrap_or_default();
        Ok(ToolOutcome::Failure {
            log,
            status: status.code().filter(|c| *c != 0),
        })
    }
}
